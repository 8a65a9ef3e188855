use ndarray::ArrayView1;

use super::types::FeatureError;

/// Rank features by `|input - reconstruction|` and keep the first `k`.
///
/// The sort is stable: equal errors keep their column order.
pub fn top_k(
    feature_names: &[String],
    input: ArrayView1<'_, f64>,
    reconstruction: ArrayView1<'_, f64>,
    k: usize,
) -> Vec<FeatureError> {
    let mut contributions: Vec<FeatureError> = feature_names
        .iter()
        .zip(input.iter().zip(reconstruction.iter()))
        .map(|(name, (x, r))| FeatureError::new(name.as_str(), (x - r).abs()))
        .collect();

    // Sort by error DESC
    contributions.sort_by(|a, b| b.abs_error.total_cmp(&a.abs_error));

    contributions.truncate(k);
    contributions
}
