/// Student quota for one school: `floor(declared × (1 + buffer_percent / 100))`.
///
/// Missing or non-positive counts yield zero. The product is formed as
/// `declared × (100 + buffer) / 100` so that exact results such as 100 at 15%
/// land on 115 instead of 114.999….
pub fn buffered_quota(declared: Option<f64>, buffer_percent: f64) -> u64 {
    let declared = match declared {
        Some(count) if count.is_finite() && count > 0.0 => count,
        _ => return 0,
    };

    let quota = (declared * (100.0 + buffer_percent) / 100.0).floor();
    if quota >= u64::MAX as f64 {
        u64::MAX
    } else {
        quota as u64
    }
}
