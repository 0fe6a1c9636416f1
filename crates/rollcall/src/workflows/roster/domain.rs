use super::RosterError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Level of the school hierarchy a code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HierarchyLevel {
    District,
    Block,
    School,
    Student,
}

impl HierarchyLevel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::District => "district",
            Self::Block => "block",
            Self::School => "school",
            Self::Student => "student number",
        }
    }
}

impl fmt::Display for HierarchyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What happens when an index needs more digits than its configured width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidthPolicy {
    /// Reject the run with [`RosterError::CodeWidthOverflow`].
    Fail,
    /// Render the full number, ignoring the width.
    Widen,
}

impl WidthPolicy {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Fail => "fail",
            Self::Widen => "widen",
        }
    }
}

impl fmt::Display for WidthPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for WidthPolicy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "widen" => Ok(Self::Widen),
            other => Err(format!("unknown width policy '{other}' (expected fail or widen)")),
        }
    }
}

/// A field that can contribute to a composite identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdField {
    Partner,
    District,
    Block,
    School,
    Grade,
    StudentNumber,
}

impl IdField {
    /// Column name of the field in the full report.
    pub const fn column(self) -> &'static str {
        match self {
            Self::Partner => "Partner_ID",
            Self::District => "District_ID",
            Self::Block => "Block_ID",
            Self::School => "School_Code",
            Self::Grade => "Grade",
            Self::StudentNumber => "student_no",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Partner => "Partner",
            Self::District => "District",
            Self::Block => "Block",
            Self::School => "School",
            Self::Grade => "Grade",
            Self::StudentNumber => "Student",
        }
    }
}

/// Named template selecting the fields of a composite identifier, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterSet {
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
    A7,
    A8,
}

impl ParameterSet {
    pub const fn ordered() -> [Self; 8] {
        [
            Self::A1,
            Self::A2,
            Self::A3,
            Self::A4,
            Self::A5,
            Self::A6,
            Self::A7,
            Self::A8,
        ]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::A1 => "A1",
            Self::A2 => "A2",
            Self::A3 => "A3",
            Self::A4 => "A4",
            Self::A5 => "A5",
            Self::A6 => "A6",
            Self::A7 => "A7",
            Self::A8 => "A8",
        }
    }

    pub const fn fields(self) -> &'static [IdField] {
        use IdField::*;
        match self {
            Self::A1 => &[School, Grade, StudentNumber],
            Self::A2 => &[Block, School, Grade, StudentNumber],
            Self::A3 => &[District, School, Grade, StudentNumber],
            Self::A4 => &[Partner, School, Grade, StudentNumber],
            Self::A5 => &[District, Block, School, Grade, StudentNumber],
            Self::A6 => &[Partner, Block, School, Grade, StudentNumber],
            Self::A7 => &[Partner, District, School, Grade, StudentNumber],
            Self::A8 => &[Partner, District, Block, School, Grade, StudentNumber],
        }
    }

    /// Human description, e.g. `"Partner + School + Grade + Student"`.
    pub fn description(self) -> String {
        self.fields()
            .iter()
            .map(|field| field.label())
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ParameterSet {
    type Err = String;

    /// Accepts the key (`a4`, `A4`) or the description the selector shows.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        Self::ordered()
            .into_iter()
            .find(|set| {
                set.key().eq_ignore_ascii_case(trimmed)
                    || set.description().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| format!("unknown parameter set '{trimmed}' (expected A1..A8)"))
    }
}

/// Settings for a single pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunParameters {
    pub partner_id: i64,
    pub grade: i64,
    pub buffer_percent: f64,
    pub district_digits: usize,
    pub block_digits: usize,
    pub school_digits: usize,
    pub student_digits: usize,
    pub selected_param: ParameterSet,
    pub code_overflow: WidthPolicy,
    pub student_overflow: WidthPolicy,
}

impl Default for RunParameters {
    fn default() -> Self {
        RunPreset::Standard.parameters()
    }
}

impl RunParameters {
    /// Checks every documented constraint before any roster data is touched.
    pub fn validate(&self) -> Result<(), RosterError> {
        if self.partner_id < 0 {
            return Err(invalid("partner_id", format!("must be >= 0, found {}", self.partner_id)));
        }
        if self.grade < 1 {
            return Err(invalid("grade", format!("must be >= 1, found {}", self.grade)));
        }
        if !self.buffer_percent.is_finite() || !(0.0..=100.0).contains(&self.buffer_percent) {
            return Err(invalid(
                "buffer_percent",
                format!("must be between 0 and 100, found {}", self.buffer_percent),
            ));
        }

        for (name, digits) in [
            ("district_digits", self.district_digits),
            ("block_digits", self.block_digits),
            ("school_digits", self.school_digits),
            ("student_digits", self.student_digits),
        ] {
            if digits < 1 {
                return Err(invalid(name, "must be >= 1".to_string()));
            }
        }

        Ok(())
    }

    /// Partner code as it appears in identifiers: plain decimal, never padded.
    pub fn partner_code(&self) -> String {
        self.partner_id.to_string()
    }

    /// Two-digit grade used inside student identifiers.
    pub fn grade_code(&self) -> String {
        format!("{:02}", self.grade)
    }
}

impl Hash for RunParameters {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.partner_id.hash(state);
        self.grade.hash(state);
        self.buffer_percent.to_bits().hash(state);
        self.district_digits.hash(state);
        self.block_digits.hash(state);
        self.school_digits.hash(state);
        self.student_digits.hash(state);
        self.selected_param.hash(state);
        self.code_overflow.hash(state);
        self.student_overflow.hash(state);
    }
}

/// Caller-supplied settings layered over a preset. Unset fields keep the base value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunParameterOverrides {
    pub partner_id: Option<i64>,
    pub grade: Option<i64>,
    pub buffer_percent: Option<f64>,
    pub district_digits: Option<usize>,
    pub block_digits: Option<usize>,
    pub school_digits: Option<usize>,
    pub student_digits: Option<usize>,
    pub selected_param: Option<ParameterSet>,
    pub code_overflow: Option<WidthPolicy>,
    pub student_overflow: Option<WidthPolicy>,
}

impl RunParameterOverrides {
    pub fn apply(self, base: RunParameters) -> RunParameters {
        RunParameters {
            partner_id: self.partner_id.unwrap_or(base.partner_id),
            grade: self.grade.unwrap_or(base.grade),
            buffer_percent: self.buffer_percent.unwrap_or(base.buffer_percent),
            district_digits: self.district_digits.unwrap_or(base.district_digits),
            block_digits: self.block_digits.unwrap_or(base.block_digits),
            school_digits: self.school_digits.unwrap_or(base.school_digits),
            student_digits: self.student_digits.unwrap_or(base.student_digits),
            selected_param: self.selected_param.unwrap_or(base.selected_param),
            code_overflow: self.code_overflow.unwrap_or(base.code_overflow),
            student_overflow: self.student_overflow.unwrap_or(base.student_overflow),
        }
    }
}

fn invalid(parameter: &'static str, reason: String) -> RosterError {
    RosterError::InvalidParameter { parameter, reason }
}

/// Starting points offered to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPreset {
    /// Partner 1, no buffer, digits 2/2/3/3, template A4.
    Standard,
    /// Partner 1, 30% buffer, digits 2/2/3/4, template A1.
    Custom,
}

impl RunPreset {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Custom => "custom",
        }
    }

    pub fn parameters(self) -> RunParameters {
        match self {
            Self::Standard => RunParameters {
                partner_id: 1,
                grade: 1,
                buffer_percent: 0.0,
                district_digits: 2,
                block_digits: 2,
                school_digits: 3,
                student_digits: 3,
                selected_param: ParameterSet::A4,
                code_overflow: WidthPolicy::Fail,
                student_overflow: WidthPolicy::Widen,
            },
            Self::Custom => RunParameters {
                partner_id: 1,
                grade: 1,
                buffer_percent: 30.0,
                district_digits: 2,
                block_digits: 2,
                school_digits: 3,
                student_digits: 4,
                selected_param: ParameterSet::A1,
                code_overflow: WidthPolicy::Fail,
                student_overflow: WidthPolicy::Widen,
            },
        }
    }
}

impl FromStr for RunPreset {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "standard" | "default" => Ok(Self::Standard),
            "custom" => Ok(Self::Custom),
            other => Err(format!("unknown preset '{other}' (expected standard or custom)")),
        }
    }
}

/// A single tabular cell after normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Missing,
    Integer(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Missing => true,
            Self::Float(value) => value.is_nan(),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Float(value) if !value.is_nan() => Some(*value),
            _ => None,
        }
    }

    /// String form used in identifiers. Integral floats drop their fraction.
    pub fn render(&self) -> Option<String> {
        match self {
            Self::Missing => None,
            Self::Integer(value) => Some(value.to_string()),
            Self::Float(value) if value.is_nan() => None,
            Self::Float(value) if value.fract() == 0.0 && value.abs() < i64::MAX as f64 => {
                Some((*value as i64).to_string())
            }
            Self::Float(value) => Some(value.to_string()),
            Self::Text(value) => Some(value.clone()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}
