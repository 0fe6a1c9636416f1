use crate::cli::ServeArgs;
use crate::infra::{AppState, RosterState};
use crate::routes::with_roster_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use rollcall::config::AppConfig;
use rollcall::error::AppError;
use rollcall::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };
    let roster_state = RosterState::new(config.roster.preset, config.roster.max_students);

    let app = with_roster_routes(roster_state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        preset = config.roster.preset.label(),
        "roster roll-number service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
