use crate::workflows::roster::{RunPreset, DEFAULT_MAX_STUDENTS};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub roster: RosterConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let output_dir = env::var("ROSTER_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("output"));
        let preset = match env::var("ROSTER_PRESET") {
            Ok(raw) => raw
                .parse::<RunPreset>()
                .map_err(|_| ConfigError::InvalidPreset { value: raw })?,
            Err(_) => RunPreset::Standard,
        };
        let max_students = match env::var("ROSTER_MAX_STUDENTS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(limit) if limit > 0 => limit,
                _ => return Err(ConfigError::InvalidMaxStudents { value: raw }),
            },
            Err(_) => DEFAULT_MAX_STUDENTS,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            roster: RosterConfig {
                output_dir,
                preset,
                max_students,
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Defaults applied when a caller runs the roster pipeline without explicit settings.
#[derive(Debug, Clone)]
pub struct RosterConfig {
    /// Directory the CLI writes the three report files into.
    pub output_dir: PathBuf,
    pub preset: RunPreset,
    /// Most student rows a single run may expand to.
    pub max_students: u64,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidPreset { value: String },
    InvalidMaxStudents { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidPreset { value } => write!(
                f,
                "ROSTER_PRESET must be 'standard' or 'custom' (found '{}')",
                value
            ),
            ConfigError::InvalidMaxStudents { value } => write!(
                f,
                "ROSTER_MAX_STUDENTS must be a positive integer (found '{}')",
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPreset { .. } | ConfigError::InvalidMaxStudents { .. } => None,
        }
    }
}
