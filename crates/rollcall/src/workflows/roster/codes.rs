use super::domain::{HierarchyLevel, RunParameters, WidthPolicy};
use super::parser::RosterTable;
use super::RosterError;
use std::collections::HashMap;

/// Category that always receives the all-zero code.
pub const NA_SENTINEL: &str = "NA";

/// Number of decimal digits needed to print `value`.
pub(crate) fn digit_count(value: u64) -> usize {
    value.checked_ilog10().map_or(1, |log| log as usize + 1)
}

/// Zero-pads `value` to `width`, applying `policy` when it does not fit.
pub(crate) fn render_padded(
    value: u64,
    width: usize,
    policy: WidthPolicy,
    level: HierarchyLevel,
) -> Result<String, RosterError> {
    let needed = digit_count(value);
    if needed > width && policy == WidthPolicy::Fail {
        return Err(RosterError::CodeWidthOverflow {
            level,
            value,
            needed,
            width,
        });
    }
    Ok(format!("{value:0width$}"))
}

/// First-occurrence index of one categorical column.
///
/// Built once per run; lookups afterwards are pure.
#[derive(Debug, Clone)]
pub struct HierarchyCodes {
    level: HierarchyLevel,
    width: usize,
    index: HashMap<String, u64>,
    order: Vec<String>,
}

impl HierarchyCodes {
    pub fn build<'a, I>(
        level: HierarchyLevel,
        values: I,
        width: usize,
        policy: WidthPolicy,
    ) -> Result<Self, RosterError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut index = HashMap::new();
        let mut order = Vec::new();

        for value in values {
            if value == NA_SENTINEL || index.contains_key(value) {
                continue;
            }
            order.push(value.to_string());
            index.insert(value.to_string(), order.len() as u64);
        }

        // The largest index decides whether every code fits.
        render_padded(order.len() as u64, width, policy, level)?;

        Ok(Self {
            level,
            width,
            index,
            order,
        })
    }

    pub fn level(&self) -> HierarchyLevel {
        self.level
    }

    /// Distinct values in the order their codes were handed out.
    pub fn values(&self) -> &[String] {
        &self.order
    }

    /// 1-based sequence position, `Some(0)` for the NA sentinel.
    pub fn index_of(&self, value: &str) -> Option<u64> {
        if value == NA_SENTINEL {
            return Some(0);
        }
        self.index.get(value).copied()
    }

    /// Rendered code for `value`, or `None` if it was not part of the build input.
    pub fn code_for(&self, value: &str) -> Option<String> {
        let index = self.index_of(value)?;
        // Width was verified against the largest index at build time.
        Some(format!("{index:0width$}", width = self.width))
    }
}

/// Codes for every hierarchy level of one roster.
#[derive(Debug, Clone)]
pub struct CodeBook {
    pub district: HierarchyCodes,
    pub block: HierarchyCodes,
    pub school: HierarchyCodes,
}

impl CodeBook {
    pub fn build(table: &RosterTable, params: &RunParameters) -> Result<Self, RosterError> {
        let policy = params.code_overflow;
        Ok(Self {
            district: HierarchyCodes::build(
                HierarchyLevel::District,
                table.districts(),
                params.district_digits,
                policy,
            )?,
            block: HierarchyCodes::build(
                HierarchyLevel::Block,
                table.blocks(),
                params.block_digits,
                policy,
            )?,
            school: HierarchyCodes::build(
                HierarchyLevel::School,
                table.school_ids(),
                params.school_digits,
                policy,
            )?,
        })
    }
}
