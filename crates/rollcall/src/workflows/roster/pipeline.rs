use super::buffer::buffered_quota;
use super::codes::{CodeBook, HierarchyCodes};
use super::domain::{CellValue, IdField, RunParameters};
use super::expander::{StudentSlot, StudentSlots};
use super::identifier::{compose_identifier, FieldSource};
use super::parser::{RosterRow, RosterTable};
use super::RosterError;
use tracing::debug;

/// Upper bound on rows reserved ahead of expansion.
const MAX_PREALLOCATED_STUDENTS: usize = 1 << 20;

/// Largest number of student rows a single run may expand to unless the caller
/// configures another limit.
pub const DEFAULT_MAX_STUDENTS: u64 = 1_000_000;

/// Roster row with its hierarchy codes and buffered quota.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodedSchool {
    /// Position of the school in [`RosterTable::rows`].
    pub row: usize,
    pub district_code: String,
    pub block_code: String,
    pub school_code: String,
    pub quota: u64,
}

/// One expanded student row. Roster fields are reached through `school`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRecord {
    /// Position of the owning school in [`ExpandedRoster::schools`].
    pub school: usize,
    pub slot: StudentSlot,
    pub roll_number: String,
}

/// Output of the derivation stages, before projection into reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedRoster {
    pub schools: Vec<CodedSchool>,
    pub students: Vec<StudentRecord>,
    pub partner_code: String,
    pub grade_code: String,
}

impl ExpandedRoster {
    pub fn school_of(&self, student: &StudentRecord) -> &CodedSchool {
        &self.schools[student.school]
    }
}

/// Identifier fields of a student that has not been given a roll number yet.
struct StudentFields<'a> {
    partner: &'a str,
    grade: &'a str,
    school: &'a CodedSchool,
    slot: &'a StudentSlot,
}

impl FieldSource for StudentFields<'_> {
    fn field(&self, field: IdField) -> Option<CellValue> {
        let value: &str = match field {
            IdField::Partner => self.partner,
            IdField::District => &self.school.district_code,
            IdField::Block => &self.school.block_code,
            IdField::School => &self.school.school_code,
            IdField::Grade => self.grade,
            IdField::StudentNumber => &self.slot.student_no,
        };
        Some(CellValue::from(value))
    }
}

/// Stage 1 and 2: hierarchy codes and buffered quotas for every roster row.
///
/// Fails before any expansion when the quotas add up to more than `max_students`.
pub fn code_schools(
    table: &RosterTable,
    params: &RunParameters,
    max_students: u64,
) -> Result<Vec<CodedSchool>, RosterError> {
    let book = CodeBook::build(table, params)?;
    debug!(
        districts = book.district.values().len(),
        blocks = book.block.values().len(),
        schools = book.school.values().len(),
        "hierarchy codes assigned"
    );

    let schools = table
        .rows()
        .iter()
        .enumerate()
        .map(|(row, school)| {
            Ok(CodedSchool {
                row,
                district_code: lookup(&book.district, &school.district, school)?,
                block_code: lookup(&book.block, &school.block, school)?,
                school_code: lookup(&book.school, &school.school_id, school)?,
                quota: buffered_quota(school.total_students, params.buffer_percent),
            })
        })
        .collect::<Result<Vec<_>, RosterError>>()?;

    let total = schools
        .iter()
        .fold(0u64, |total, school| total.saturating_add(school.quota));
    if total > max_students {
        let largest = schools
            .iter()
            .max_by_key(|school| school.quota)
            .map(|school| &table.rows()[school.row]);
        let detail = largest
            .map(|row| {
                format!(
                    " (largest: School_ID '{}' on line {})",
                    row.school_id, row.line
                )
            })
            .unwrap_or_default();
        return Err(RosterError::ProcessingFailure(format!(
            "roster expands to {total} students, above the limit of {max_students}{detail}"
        )));
    }

    Ok(schools)
}

fn lookup(
    codes: &HierarchyCodes,
    value: &str,
    row: &RosterRow,
) -> Result<String, RosterError> {
    codes.code_for(value).ok_or_else(|| {
        RosterError::ProcessingFailure(format!(
            "line {}: {} '{}' missing from code table",
            row.line,
            codes.level(),
            value
        ))
    })
}

/// Stage 3 and 4: one record per student slot, each with its roll number.
pub fn expand_students(
    schools: Vec<CodedSchool>,
    params: &RunParameters,
) -> Result<ExpandedRoster, RosterError> {
    let partner_code = params.partner_code();
    let grade_code = params.grade_code();

    let capacity = schools
        .iter()
        .map(|school| usize::try_from(school.quota).unwrap_or(usize::MAX))
        .fold(0usize, usize::saturating_add);
    let mut students = Vec::with_capacity(capacity.min(MAX_PREALLOCATED_STUDENTS));

    for (index, school) in schools.iter().enumerate() {
        let slots = StudentSlots::new(
            &school.school_code,
            &grade_code,
            school.quota,
            params.student_digits,
            params.student_overflow,
        )?;

        for slot in slots {
            let roll_number = compose_identifier(
                &StudentFields {
                    partner: &partner_code,
                    grade: &grade_code,
                    school,
                    slot: &slot,
                },
                params.selected_param,
            );
            students.push(StudentRecord {
                school: index,
                slot,
                roll_number,
            });
        }
    }

    debug!(students = students.len(), "roster expanded");

    Ok(ExpandedRoster {
        schools,
        students,
        partner_code,
        grade_code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::roster::parser::parse_roster;
    use crate::workflows::roster::ParameterSet;
    use std::io::Cursor;

    fn table(csv: &str) -> RosterTable {
        parse_roster(Cursor::new(csv.to_string())).expect("roster parses")
    }

    #[test]
    fn codes_are_shared_by_repeated_names() {
        let table = table(
            "District,Block,School_ID,School,Total_Students\n\
             North,B1,11,S1,1\nSouth,B2,12,S2,1\nNorth,B1,13,S3,1\n",
        );
        let schools =
            code_schools(&table, &RunParameters::default(), DEFAULT_MAX_STUDENTS).expect("codes");
        assert_eq!(schools[0].district_code, schools[2].district_code);
        assert_eq!(schools[0].block_code, "01");
        assert_eq!(schools[1].district_code, "02");
        assert_eq!(schools[2].school_code, "003");
    }

    #[test]
    fn row_count_is_sum_of_quotas() {
        let table = table(
            "District,Block,School_ID,School,Total_Students\n\
             D,B,1,S1,10\nD,B,2,S2,\nD,B,3,S3,7\n",
        );
        for buffer_percent in [0.0, 12.5, 30.0, 100.0] {
            let params = RunParameters {
                buffer_percent,
                ..RunParameters::default()
            };
            let schools = code_schools(&table, &params, DEFAULT_MAX_STUDENTS).expect("codes");
            let expected: u64 = schools.iter().map(|school| school.quota).sum();
            let expanded = expand_students(schools, &params).expect("expand");
            assert_eq!(expanded.students.len() as u64, expected);
        }
    }

    #[test]
    fn roll_numbers_follow_selected_template() {
        let table = table(
            "District,Block,School_ID,School,Total_Students\n\
             D1,B1,900,S1,2\nD2,B2,901,S2,1\n",
        );
        let params = RunParameters {
            partner_id: 5,
            grade: 10,
            selected_param: ParameterSet::A8,
            ..RunParameters::default()
        };
        let schools = code_schools(&table, &params, DEFAULT_MAX_STUDENTS).expect("codes");
        let expanded = expand_students(schools, &params).expect("expand");

        let rolls: Vec<_> = expanded
            .students
            .iter()
            .map(|student| student.roll_number.as_str())
            .collect();
        assert_eq!(rolls, ["5010100110001", "5010100110002", "5020200210001"]);
        let last = &expanded.students[2];
        assert_eq!(expanded.school_of(last).school_code, "002");
    }

    #[test]
    fn oversized_quota_is_rejected_before_expansion() {
        let table = table(
            "District,Block,School_ID,School,Total_Students
             D,B,1,S1,10
D,B,2,S2,1e15
",
        );
        let err = code_schools(&table, &RunParameters::default(), DEFAULT_MAX_STUDENTS)
            .expect_err("1e15 students exceed the limit");
        match err {
            RosterError::ProcessingFailure(message) => {
                assert!(message.contains("1000000000000010"), "{message}");
                assert!(message.contains("School_ID '2' on line 3"), "{message}");
            }
            other => panic!("expected processing failure, got {other:?}"),
        }
    }

    #[test]
    fn limit_is_inclusive_and_counts_the_buffer() {
        let table = table(
            "District,Block,School_ID,School,Total_Students
             D,B,1,S1,10
D,B,2,S2,10
",
        );
        let buffered = RunParameters {
            buffer_percent: 50.0,
            ..RunParameters::default()
        };
        code_schools(&table, &buffered, 30).expect("exactly at the limit");
        code_schools(&table, &buffered, 29).expect_err("one past the limit");
    }
}
