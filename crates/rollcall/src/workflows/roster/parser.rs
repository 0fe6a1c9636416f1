use super::normalizer::{classify_number, normalize_cell};
use super::RosterError;
use std::collections::HashMap;
use std::io::Read;

pub const DISTRICT_COLUMN: &str = "District";
pub const BLOCK_COLUMN: &str = "Block";
pub const SCHOOL_NAME_COLUMN: &str = "School";
pub const SCHOOL_ID_COLUMN: &str = "School_ID";
pub const TOTAL_STUDENTS_COLUMN: &str = "Total_Students";

pub const REQUIRED_COLUMNS: [&str; 5] = [
    DISTRICT_COLUMN,
    BLOCK_COLUMN,
    SCHOOL_NAME_COLUMN,
    SCHOOL_ID_COLUMN,
    TOTAL_STUDENTS_COLUMN,
];

/// One school as listed in the uploaded roster.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterRow {
    /// Line of the source file the row was read from.
    pub line: u64,
    pub district: String,
    pub block: String,
    pub school_name: String,
    pub school_id: String,
    /// `None` when the cell was blank or a NaN marker.
    pub total_students: Option<f64>,
    /// Every cell in header order, including columns the pipeline does not read.
    pub cells: Vec<String>,
}

/// Parsed roster with its original header order.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterTable {
    headers: Vec<String>,
    rows: Vec<RosterRow>,
}

impl RosterTable {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[RosterRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn districts(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|row| row.district.as_str())
    }

    pub fn blocks(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|row| row.block.as_str())
    }

    pub fn school_ids(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|row| row.school_id.as_str())
    }

    /// School codes are asserted unique by whoever prepares the roster; a repeat
    /// would silently merge two schools onto one code.
    pub fn ensure_unique_school_ids(&self) -> Result<(), RosterError> {
        let mut seen: HashMap<&str, u64> = HashMap::with_capacity(self.rows.len());
        for row in &self.rows {
            if let Some(first_line) = seen.insert(row.school_id.as_str(), row.line) {
                return Err(RosterError::DuplicateSchoolCode {
                    code: row.school_id.clone(),
                    first_line,
                    line: row.line,
                });
            }
        }
        Ok(())
    }
}

struct ColumnIndex {
    district: usize,
    block: usize,
    school_name: usize,
    school_id: usize,
    total_students: usize,
}

impl ColumnIndex {
    fn locate(headers: &[String]) -> Result<Self, RosterError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|header| header == name)
                .ok_or_else(|| RosterError::MissingColumn {
                    column: name.to_string(),
                })
        };

        Ok(Self {
            district: find(DISTRICT_COLUMN)?,
            block: find(BLOCK_COLUMN)?,
            school_name: find(SCHOOL_NAME_COLUMN)?,
            school_id: find(SCHOOL_ID_COLUMN)?,
            total_students: find(TOTAL_STUDENTS_COLUMN)?,
        })
    }
}

/// Collects rows under an already located header, whatever file they came from.
pub(crate) struct TableBuilder {
    headers: Vec<String>,
    columns: ColumnIndex,
    rows: Vec<RosterRow>,
}

impl TableBuilder {
    pub(crate) fn new(headers: Vec<String>) -> Result<Self, RosterError> {
        let columns = ColumnIndex::locate(&headers)?;
        Ok(Self {
            headers,
            columns,
            rows: Vec::new(),
        })
    }

    /// `cells` must already be normalized and in header order.
    pub(crate) fn push(&mut self, line: u64, cells: Vec<String>) -> Result<(), RosterError> {
        let cell = |idx: usize| cells.get(idx).cloned().unwrap_or_default();

        let raw_count = cell(self.columns.total_students);
        let count = classify_number(&raw_count);
        let total_students = if count.is_missing() {
            None
        } else {
            match count.as_f64() {
                Some(value) if value.is_finite() => Some(value),
                _ => {
                    return Err(RosterError::InvalidCount {
                        line,
                        value: raw_count,
                    })
                }
            }
        };

        self.rows.push(RosterRow {
            line,
            district: cell(self.columns.district),
            block: cell(self.columns.block),
            school_name: cell(self.columns.school_name),
            school_id: cell(self.columns.school_id),
            total_students,
            cells,
        });
        Ok(())
    }

    pub(crate) fn finish(self) -> RosterTable {
        RosterTable {
            headers: self.headers,
            rows: self.rows,
        }
    }
}

pub fn parse_roster<R: Read>(reader: R) -> Result<RosterTable, RosterError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader.headers()?.iter().map(normalize_cell).collect();
    let mut builder = TableBuilder::new(headers)?;

    for (index, record) in csv_reader.records().enumerate() {
        let record = record?;
        let line = record
            .position()
            .map(|position| position.line())
            .unwrap_or(index as u64 + 2);
        builder.push(line, record.iter().map(normalize_cell).collect())?;
    }

    Ok(builder.finish())
}
