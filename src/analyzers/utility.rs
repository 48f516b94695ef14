/// Average speed of a bucket, also used to average per-day percentiles across dates.
/// An empty slice averages to 0.0.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
