//! Roster expansion: hierarchy codes, buffered quotas, per-student slots, and
//! roll numbers, projected into three downloadable reports.
//!
//! Every stage is a pure function of the previous stage's output. A run either
//! yields all three reports or an error; nothing partial escapes.

mod buffer;
pub mod cache;
mod codes;
pub mod domain;
mod expander;
mod identifier;
mod normalizer;
mod parser;
pub mod pipeline;
pub mod report;
mod workbook;

pub use buffer::buffered_quota;
pub use cache::{ReportCache, RunKey};
pub use codes::{CodeBook, HierarchyCodes, NA_SENTINEL};
pub use domain::{
    CellValue, HierarchyLevel, IdField, ParameterSet, RunParameterOverrides, RunParameters,
    RunPreset, WidthPolicy,
};
pub use expander::{StudentSlot, StudentSlots};
pub use identifier::{compose_identifier, FieldSource};
pub use parser::{parse_roster, RosterRow, RosterTable, REQUIRED_COLUMNS};
pub use pipeline::DEFAULT_MAX_STUDENTS;
pub use report::{
    FullTable, MappedRow, ReportFormat, ReportKind, RosterReports, RunSummary, TeacherCodeRow,
    WrittenReport,
};
pub use workbook::{parse_workbook, RosterFormat};

use serde::Serialize;
use std::io::{Read, Seek};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("required column '{column}' is missing from the roster")]
    MissingColumn { column: String },
    #[error("School_ID '{code}' appears on line {first_line} and again on line {line}")]
    DuplicateSchoolCode {
        code: String,
        first_line: u64,
        line: u64,
    },
    #[error("{level} index {value} needs {needed} digits but only {width} are configured")]
    CodeWidthOverflow {
        level: HierarchyLevel,
        value: u64,
        needed: usize,
        width: usize,
    },
    #[error("invalid parameter {parameter}: {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },
    #[error("line {line}: Total_Students value '{value}' is not a number")]
    InvalidCount { line: u64, value: String },
    #[error("roster processing failed: {0}")]
    ProcessingFailure(String),
    #[error("invalid roster CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid roster workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("report workbook could not be written: {0}")]
    WorkbookWrite(#[from] rust_xlsxwriter::XlsxError),
    #[error("roster io failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RosterErrorKind {
    MissingColumn,
    DuplicateSchoolCode,
    CodeWidthOverflow,
    InvalidParameter,
    ProcessingFailure,
}

impl RosterError {
    pub fn kind(&self) -> RosterErrorKind {
        match self {
            Self::MissingColumn { .. } => RosterErrorKind::MissingColumn,
            Self::DuplicateSchoolCode { .. } => RosterErrorKind::DuplicateSchoolCode,
            Self::CodeWidthOverflow { .. } => RosterErrorKind::CodeWidthOverflow,
            Self::InvalidParameter { .. } => RosterErrorKind::InvalidParameter,
            Self::InvalidCount { .. }
            | Self::ProcessingFailure(_)
            | Self::Csv(_)
            | Self::Workbook(_)
            | Self::WorkbookWrite(_)
            | Self::Io(_) => RosterErrorKind::ProcessingFailure,
        }
    }
}

/// Validated parameters bound to the stages that consume them.
#[derive(Debug, Clone)]
pub struct RosterPipeline {
    params: RunParameters,
    max_students: u64,
}

impl RosterPipeline {
    /// Rejects out-of-range parameters before any roster is read.
    pub fn new(params: RunParameters) -> Result<Self, RosterError> {
        params.validate()?;
        Ok(Self {
            params,
            max_students: DEFAULT_MAX_STUDENTS,
        })
    }

    /// Caps the number of student rows one run may produce.
    pub fn with_max_students(mut self, max_students: u64) -> Self {
        self.max_students = max_students;
        self
    }

    pub fn parameters(&self) -> &RunParameters {
        &self.params
    }

    pub fn max_students(&self) -> u64 {
        self.max_students
    }

    pub fn run_key(&self, input: &[u8]) -> RunKey {
        RunKey::new(input, &self.params)
    }

    /// Reads CSV or a workbook depending on the file extension.
    pub fn run_path<P: AsRef<Path>>(&self, path: P) -> Result<RosterReports, RosterError> {
        let path = path.as_ref();
        match RosterFormat::from_path(path) {
            RosterFormat::Csv => self.run_reader(std::fs::File::open(path)?),
            RosterFormat::Workbook => {
                let bytes = std::fs::read(path)?;
                self.run_workbook(std::io::Cursor::new(bytes))
            }
        }
    }

    pub fn run_workbook<RS>(&self, reader: RS) -> Result<RosterReports, RosterError>
    where
        RS: Read + Seek + Clone,
    {
        let table = parse_workbook(reader)?;
        self.run_table(&table)
    }

    pub fn run_reader<R: Read>(&self, reader: R) -> Result<RosterReports, RosterError> {
        let table = parse_roster(reader)?;
        self.run_table(&table)
    }

    pub fn run_table(&self, table: &RosterTable) -> Result<RosterReports, RosterError> {
        debug!(rows = table.len(), "roster parsed");
        table.ensure_unique_school_ids()?;

        let schools = pipeline::code_schools(table, &self.params, self.max_students)?;
        let expanded = pipeline::expand_students(schools, &self.params)?;
        let reports = report::project(table, &expanded, &self.params);

        info!(
            schools = reports.summary.schools,
            students = reports.summary.students,
            parameter_set = %self.params.selected_param,
            "roster reports generated"
        );
        Ok(reports)
    }
}
