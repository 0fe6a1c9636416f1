use super::domain::CellValue;
use super::normalizer::normalize_cell;
use super::parser::{RosterTable, TableBuilder};
use super::RosterError;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::{Read, Seek};
use std::path::Path;

/// How an uploaded roster is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterFormat {
    Csv,
    /// `.xlsx`, `.xlsm`, `.xls` or `.ods`; the first worksheet is read.
    Workbook,
}

impl RosterFormat {
    /// Picks the reader from the file extension. Anything unrecognised is read as CSV.
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => Self::Workbook,
            _ => Self::Csv,
        }
    }
}

/// Reads the first worksheet; its first row is the header.
pub fn parse_workbook<RS>(reader: RS) -> Result<RosterTable, RosterError>
where
    RS: Read + Seek + Clone,
{
    let mut workbook = open_workbook_auto_from_rs(reader)?;
    let range = workbook.worksheet_range_at(0).ok_or_else(|| {
        RosterError::ProcessingFailure("workbook contains no worksheets".to_string())
    })??;

    // Sheet row (1-based) of the header; ranges skip leading empty rows.
    let header_line = range.start().map_or(1, |(row, _)| u64::from(row) + 1);
    let mut rows = range.rows();

    let headers = rows
        .next()
        .map(|header| header.iter().map(cell_text).collect())
        .unwrap_or_default();
    let mut builder = TableBuilder::new(headers)?;

    for (offset, row) in rows.enumerate() {
        if row.iter().all(|cell| matches!(cell, Data::Empty)) {
            continue;
        }
        let line = header_line + 1 + offset as u64;
        builder.push(line, row.iter().map(cell_text).collect())?;
    }

    Ok(builder.finish())
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(text) => normalize_cell(text),
        Data::Int(value) => value.to_string(),
        Data::Float(value) => CellValue::Float(*value).render().unwrap_or_default(),
        other => normalize_cell(&other.to_string()),
    }
}
