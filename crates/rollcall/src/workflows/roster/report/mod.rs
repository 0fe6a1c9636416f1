mod projector;
pub mod views;
mod writer;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use projector::{project, RosterReports};
pub use views::{FullTable, MappedRow, RunSummary, TeacherCodeRow};
pub use writer::WrittenReport;

/// The three tables a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Full,
    Mapped,
    TeacherCodes,
}

impl ReportKind {
    pub const fn ordered() -> [Self; 3] {
        [Self::Full, Self::Mapped, Self::TeacherCodes]
    }

    /// URL/CLI slug.
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Mapped => "mapped",
            Self::TeacherCodes => "teacher-codes",
        }
    }

    pub const fn file_stem(self) -> &'static str {
        match self {
            Self::Full => "Student_Ids_Full",
            Self::Mapped => "Student_Ids_Mapped",
            Self::TeacherCodes => "Teacher_Codes",
        }
    }

    pub fn file_name(self, format: ReportFormat) -> String {
        format!("{}.{}", self.file_stem(), format.extension())
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "full" => Ok(Self::Full),
            "mapped" => Ok(Self::Mapped),
            "teacher-codes" | "teachers" => Ok(Self::TeacherCodes),
            other => Err(format!(
                "unknown report '{other}' (expected full, mapped, or teacher-codes)"
            )),
        }
    }
}

/// Encoding of a downloaded or written report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Csv,
    Xlsx,
}

impl ReportFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }

    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" | "excel" => Ok(Self::Xlsx),
            other => Err(format!("unknown report format '{other}' (expected csv or xlsx)")),
        }
    }
}
