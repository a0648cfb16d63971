//! Importance normalisation.

/// Rescale raw importances so they sum to 1.
///
/// An all-zero vector (no predictor explains anything) stays all-zero.
pub fn normalise_importances(raw: &[f64]) -> Vec<f64> {
    let sum: f64 = raw.iter().sum();
    if sum <= 0.0 {
        return vec![0.0; raw.len()];
    }
    raw.iter().map(|v| v / sum).collect()
}
