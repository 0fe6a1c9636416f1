use super::domain::CellValue;

/// Spreadsheet exports spell an empty numeric cell in several ways.
const MISSING_MARKERS: [&str; 4] = ["nan", "null", "none", "#n/a"];

pub(crate) fn normalize_cell(value: &str) -> String {
    value.replace(['\u{feff}', '\u{200b}'], "").trim().to_string()
}

/// Classifies a count cell. Only blank cells and the markers above are missing;
/// anything else that is not numeric is returned as text for the caller to reject.
pub(crate) fn classify_number(value: &str) -> CellValue {
    let cleaned = normalize_cell(value);
    if cleaned.is_empty()
        || MISSING_MARKERS
            .iter()
            .any(|marker| cleaned.eq_ignore_ascii_case(marker))
    {
        return CellValue::Missing;
    }

    if let Ok(integer) = cleaned.parse::<i64>() {
        return CellValue::Integer(integer);
    }

    match cleaned.parse::<f64>() {
        Ok(float) if float.is_nan() => CellValue::Missing,
        Ok(float) => CellValue::Float(float),
        Err(_) => CellValue::Text(cleaned),
    }
}
