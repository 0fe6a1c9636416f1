use super::super::codes::NA_SENTINEL;
use super::super::domain::{IdField, RunParameters};
use super::super::parser::RosterTable;
use super::super::pipeline::ExpandedRoster;
use super::views::{FullTable, MappedRow, RunSummary, TeacherCodeRow};
use std::collections::HashSet;

pub const BUFFERED_TOTAL_COLUMN: &str = "Total_Students_With_Buffer";
pub const STUDENT_ID_COLUMN: &str = "Student_ID";
pub const ROLL_NUMBER_COLUMN: &str = "Custom_ID";

const DERIVED_COLUMNS: [&str; 9] = [
    IdField::Partner.column(),
    IdField::Grade.column(),
    IdField::District.column(),
    IdField::Block.column(),
    IdField::School.column(),
    BUFFERED_TOTAL_COLUMN,
    STUDENT_ID_COLUMN,
    IdField::StudentNumber.column(),
    ROLL_NUMBER_COLUMN,
];

/// The three output views of one successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterReports {
    pub full: FullTable,
    pub mapped: Vec<MappedRow>,
    pub teacher_codes: Vec<TeacherCodeRow>,
    pub summary: RunSummary,
}

pub fn project(
    table: &RosterTable,
    expanded: &ExpandedRoster,
    params: &RunParameters,
) -> RosterReports {
    RosterReports {
        full: full_table(table, expanded, params),
        mapped: mapped_rows(table, expanded, params),
        teacher_codes: teacher_codes(table, expanded),
        summary: summary(table, expanded, params),
    }
}

/// A derived column whose name already appears in the roster overwrites that
/// column in place; the rest are appended after the roster columns.
fn full_table(table: &RosterTable, expanded: &ExpandedRoster, params: &RunParameters) -> FullTable {
    let mut headers = table.headers().to_vec();
    let targets: Vec<usize> = DERIVED_COLUMNS
        .iter()
        .map(|column| match headers.iter().position(|header| header == column) {
            Some(existing) => existing,
            None => {
                headers.push(column.to_string());
                headers.len() - 1
            }
        })
        .collect();

    let grade = params.grade.to_string();
    let rows = expanded
        .students
        .iter()
        .map(|student| {
            let school = expanded.school_of(student);
            let roster_row = &table.rows()[school.row];
            let derived = [
                expanded.partner_code.clone(),
                grade.clone(),
                school.district_code.clone(),
                school.block_code.clone(),
                school.school_code.clone(),
                school.quota.to_string(),
                student.slot.student_id.clone(),
                student.slot.student_no.clone(),
                student.roll_number.clone(),
            ];

            let mut row = roster_row.cells.clone();
            row.resize(headers.len(), String::new());
            for (target, value) in targets.iter().zip(derived) {
                row[*target] = value;
            }
            row
        })
        .collect();

    FullTable { headers, rows }
}

fn mapped_rows(
    table: &RosterTable,
    expanded: &ExpandedRoster,
    params: &RunParameters,
) -> Vec<MappedRow> {
    expanded
        .students
        .iter()
        .map(|student| {
            let school = expanded.school_of(student);
            let roster_row = &table.rows()[school.row];
            MappedRow {
                roll_number: student.roll_number.clone(),
                grade: params.grade,
                school_name: roster_row.school_name.clone(),
                school_code: school.school_code.clone(),
                district_name: roster_row.district.clone(),
                block_name: roster_row.block.clone(),
            }
        })
        .collect()
}

/// Built from the schools rather than the students, so a school with no
/// students still gets its code.
fn teacher_codes(table: &RosterTable, expanded: &ExpandedRoster) -> Vec<TeacherCodeRow> {
    let mut seen = HashSet::new();
    expanded
        .schools
        .iter()
        .filter_map(|school| {
            let roster_row = &table.rows()[school.row];
            let pair = (roster_row.school_name.as_str(), school.school_code.as_str());
            seen.insert(pair).then(|| TeacherCodeRow {
                school_name: roster_row.school_name.clone(),
                teacher_code: school.school_code.clone(),
            })
        })
        .collect()
}

fn summary(table: &RosterTable, expanded: &ExpandedRoster, params: &RunParameters) -> RunSummary {
    RunSummary {
        parameter_set: params.selected_param,
        parameter_description: params.selected_param.description(),
        schools: expanded.schools.len(),
        empty_schools: expanded
            .schools
            .iter()
            .filter(|school| school.quota == 0)
            .count(),
        districts: distinct_named(table.districts()),
        blocks: distinct_named(table.blocks()),
        students: expanded.students.len(),
    }
}

fn distinct_named<'a>(values: impl Iterator<Item = &'a str>) -> usize {
    values
        .filter(|value| *value != NA_SENTINEL)
        .collect::<HashSet<_>>()
        .len()
}
