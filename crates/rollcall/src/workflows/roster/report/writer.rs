use super::projector::RosterReports;
use super::{ReportFormat, ReportKind};
use crate::workflows::roster::RosterError;
use rust_xlsxwriter::{Workbook, Worksheet};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// File produced by [`RosterReports::write_to_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenReport {
    pub kind: ReportKind,
    pub format: ReportFormat,
    pub path: PathBuf,
    pub rows: usize,
}

impl RosterReports {
    pub fn row_count(&self, kind: ReportKind) -> usize {
        match kind {
            ReportKind::Full => self.full.rows.len(),
            ReportKind::Mapped => self.mapped.len(),
            ReportKind::TeacherCodes => self.teacher_codes.len(),
        }
    }

    /// Writes one table as CSV with a header row, even when the table is empty.
    pub fn write_csv<W: Write>(&self, kind: ReportKind, writer: W) -> Result<(), RosterError> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);

        match kind {
            ReportKind::Full => {
                csv_writer.write_record(&self.full.headers)?;
                for row in &self.full.rows {
                    csv_writer.write_record(row)?;
                }
            }
            ReportKind::Mapped => {
                csv_writer.write_record(MAPPED_HEADERS)?;
                serialize_all(&mut csv_writer, &self.mapped)?;
            }
            ReportKind::TeacherCodes => {
                csv_writer.write_record(TEACHER_CODE_HEADERS)?;
                serialize_all(&mut csv_writer, &self.teacher_codes)?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    pub fn to_csv_bytes(&self, kind: ReportKind) -> Result<Vec<u8>, RosterError> {
        let mut buffer = Vec::new();
        self.write_csv(kind, &mut buffer)?;
        Ok(buffer)
    }

    /// One table as a single-sheet workbook. Codes and identifiers are written as
    /// text so their leading zeros survive.
    pub fn to_xlsx_bytes(&self, kind: ReportKind) -> Result<Vec<u8>, RosterError> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();

        match kind {
            ReportKind::Full => {
                write_text_row(sheet, 0, self.full.headers.iter().map(String::as_str))?;
                for (index, row) in self.full.rows.iter().enumerate() {
                    write_text_row(sheet, sheet_row(index)?, row.iter().map(String::as_str))?;
                }
            }
            ReportKind::Mapped => {
                write_text_row(sheet, 0, MAPPED_HEADERS)?;
                for (index, row) in self.mapped.iter().enumerate() {
                    let line = sheet_row(index)?;
                    sheet.write_string(line, 0, row.roll_number.as_str())?;
                    sheet.write_number(line, 1, row.grade as f64)?;
                    sheet.write_string(line, 2, row.school_name.as_str())?;
                    sheet.write_string(line, 3, row.school_code.as_str())?;
                    sheet.write_string(line, 4, row.district_name.as_str())?;
                    sheet.write_string(line, 5, row.block_name.as_str())?;
                }
            }
            ReportKind::TeacherCodes => {
                write_text_row(sheet, 0, TEACHER_CODE_HEADERS)?;
                for (index, row) in self.teacher_codes.iter().enumerate() {
                    let line = sheet_row(index)?;
                    sheet.write_string(line, 0, row.school_name.as_str())?;
                    sheet.write_string(line, 1, row.teacher_code.as_str())?;
                }
            }
        }

        Ok(workbook.save_to_buffer()?)
    }

    pub fn render(&self, kind: ReportKind, format: ReportFormat) -> Result<Vec<u8>, RosterError> {
        match format {
            ReportFormat::Csv => self.to_csv_bytes(kind),
            ReportFormat::Xlsx => self.to_xlsx_bytes(kind),
        }
    }

    /// Writes all three reports into `dir`, creating it if needed.
    pub fn write_to_dir(
        &self,
        dir: &Path,
        format: ReportFormat,
    ) -> Result<Vec<WrittenReport>, RosterError> {
        fs::create_dir_all(dir)?;

        ReportKind::ordered()
            .into_iter()
            .map(|kind| {
                let path = dir.join(kind.file_name(format));
                match format {
                    ReportFormat::Csv => {
                        let file = fs::File::create(&path)?;
                        self.write_csv(kind, std::io::BufWriter::new(file))?;
                    }
                    ReportFormat::Xlsx => fs::write(&path, self.to_xlsx_bytes(kind)?)?,
                }
                Ok(WrittenReport {
                    kind,
                    format,
                    path,
                    rows: self.row_count(kind),
                })
            })
            .collect()
    }
}

const MAPPED_HEADERS: [&str; 6] = [
    "Roll_Number",
    "Grade",
    "School Name",
    "School Code",
    "District Name",
    "Block Name",
];

const TEACHER_CODE_HEADERS: [&str; 2] = ["School Name", "Teacher Code"];

/// Data rows start below the header row.
fn sheet_row(index: usize) -> Result<u32, RosterError> {
    index
        .checked_add(1)
        .and_then(|row| u32::try_from(row).ok())
        .ok_or_else(|| {
            RosterError::ProcessingFailure(format!("row {index} does not fit in a worksheet"))
        })
}

fn write_text_row<'a>(
    sheet: &mut Worksheet,
    row: u32,
    cells: impl IntoIterator<Item = &'a str>,
) -> Result<(), RosterError> {
    for (col, cell) in cells.into_iter().enumerate() {
        let col = u16::try_from(col).map_err(|_| {
            RosterError::ProcessingFailure(format!("column {col} does not fit in a worksheet"))
        })?;
        sheet.write_string(row, col, cell)?;
    }
    Ok(())
}

fn serialize_all<W: Write, T: Serialize>(
    writer: &mut csv::Writer<W>,
    rows: &[T],
) -> Result<(), RosterError> {
    for row in rows {
        writer.serialize(row)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::views::{FullTable, MappedRow, RunSummary};
    use super::*;
    use crate::workflows::roster::ParameterSet;

    fn reports() -> RosterReports {
        RosterReports {
            full: FullTable {
                headers: vec!["School".to_string(), "Custom_ID".to_string()],
                rows: vec![vec!["Hill, Upper".to_string(), "100101001".to_string()]],
            },
            mapped: vec![MappedRow {
                roll_number: "100101001".to_string(),
                grade: 1,
                school_name: "Hill, Upper".to_string(),
                school_code: "001".to_string(),
                district_name: "North".to_string(),
                block_name: "B1".to_string(),
            }],
            teacher_codes: Vec::new(),
            summary: RunSummary {
                parameter_set: ParameterSet::A4,
                parameter_description: ParameterSet::A4.description(),
                schools: 1,
                empty_schools: 0,
                districts: 1,
                blocks: 1,
                students: 1,
            },
        }
    }

    #[test]
    fn mapped_csv_uses_caller_facing_headers_and_quotes_commas() {
        let bytes = reports()
            .to_csv_bytes(ReportKind::Mapped)
            .expect("csv renders");
        let text = String::from_utf8(bytes).expect("utf8");
        assert_eq!(
            text,
            "Roll_Number,Grade,School Name,School Code,District Name,Block Name\n\
             100101001,1,\"Hill, Upper\",001,North,B1\n"
        );
    }

    #[test]
    fn empty_tables_still_have_headers() {
        let bytes = reports()
            .to_csv_bytes(ReportKind::TeacherCodes)
            .expect("csv renders");
        assert_eq!(String::from_utf8(bytes).expect("utf8"), "School Name,Teacher Code\n");
    }

    #[test]
    fn writes_all_reports_to_directory() {
        let dir = tempfile::tempdir().expect("temp dir");
        let written = reports()
            .write_to_dir(&dir.path().join("out"), ReportFormat::Csv)
            .expect("reports written");

        assert_eq!(written.len(), 3);
        assert_eq!(written[0].kind, ReportKind::Full);
        assert!(written[2].path.ends_with("Teacher_Codes.csv"));
        let full = std::fs::read_to_string(&written[0].path).expect("full report readable");
        assert_eq!(full, "School,Custom_ID\n\"Hill, Upper\",100101001\n");
    }

    #[test]
    fn xlsx_reports_keep_leading_zeros_as_text() {
        use calamine::{Data, Reader, Xlsx};

        let bytes = reports()
            .to_xlsx_bytes(ReportKind::Mapped)
            .expect("workbook renders");
        let mut workbook: Xlsx<_> =
            calamine::open_workbook_from_rs(std::io::Cursor::new(bytes)).expect("xlsx opens");
        let range = workbook
            .worksheet_range_at(0)
            .expect("one sheet")
            .expect("sheet readable");

        assert_eq!(range.get_size(), (2, 6));
        assert_eq!(range.get((0, 0)), Some(&Data::String("Roll_Number".to_string())));
        assert_eq!(range.get((1, 0)), Some(&Data::String("100101001".to_string())));
        assert_eq!(range.get((1, 1)), Some(&Data::Float(1.0)));
        assert_eq!(range.get((1, 3)), Some(&Data::String("001".to_string())));
    }

    #[test]
    fn xlsx_files_are_written_with_workbook_extension() {
        let dir = tempfile::tempdir().expect("temp dir");
        let written = reports()
            .write_to_dir(dir.path(), ReportFormat::Xlsx)
            .expect("reports written");

        assert!(written[1].path.ends_with("Student_Ids_Mapped.xlsx"));
        assert_eq!(written[1].format, ReportFormat::Xlsx);
        let bytes = std::fs::read(&written[2].path).expect("teacher codes readable");
        assert!(bytes.starts_with(b"PK"), "xlsx is a zip archive");
    }
}
