/// Normalize raw importances so they sum to 1.
///
/// When every importance is zero the weight is spread evenly instead, so a
/// request that rates nothing as important still ranks on all of the
/// attributes it mentions. Inputs are expected to be finite and
/// non-negative.
pub fn normalize_importances(raw: &[f64]) -> Vec<f64> {
    if raw.is_empty() {
        return Vec::new();
    }

    let total: f64 = raw.iter().sum();

    if total <= 0.0 {
        let even = 1.0 / raw.len() as f64;
        return vec![even; raw.len()];
    }

    raw.iter().map(|w| w / total).collect()
}
