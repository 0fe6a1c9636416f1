use super::domain::{CellValue, IdField, ParameterSet};
use std::collections::HashMap;

/// Anything that can supply identifier fields for one student.
///
/// `None` means the field is absent from the row; it is skipped, not padded.
pub trait FieldSource {
    fn field(&self, field: IdField) -> Option<CellValue>;
}

impl FieldSource for HashMap<IdField, CellValue> {
    fn field(&self, field: IdField) -> Option<CellValue> {
        self.get(&field).cloned()
    }
}

/// Concatenates the present, non-null fields of `set` in template order.
pub fn compose_identifier<S>(source: &S, set: ParameterSet) -> String
where
    S: FieldSource + ?Sized,
{
    set.fields()
        .iter()
        .filter_map(|field| source.field(*field))
        .filter_map(|value| value.render())
        .collect()
}
