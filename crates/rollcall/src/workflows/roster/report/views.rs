use super::super::domain::ParameterSet;
use serde::{Deserialize, Serialize};

/// Row of the roll-number sheet handed to schools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedRow {
    #[serde(rename = "Roll_Number")]
    pub roll_number: String,
    #[serde(rename = "Grade")]
    pub grade: i64,
    #[serde(rename = "School Name")]
    pub school_name: String,
    #[serde(rename = "School Code")]
    pub school_code: String,
    #[serde(rename = "District Name")]
    pub district_name: String,
    #[serde(rename = "Block Name")]
    pub block_name: String,
}

/// Row of the school/teacher-code sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherCodeRow {
    #[serde(rename = "School Name")]
    pub school_name: String,
    #[serde(rename = "Teacher Code")]
    pub teacher_code: String,
}

/// Full expanded dataset. Columns depend on the uploaded roster, so rows are
/// kept positional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub parameter_set: ParameterSet,
    pub parameter_description: String,
    pub schools: usize,
    /// Schools whose quota came out as zero.
    pub empty_schools: usize,
    pub districts: usize,
    pub blocks: usize,
    pub students: usize,
}
