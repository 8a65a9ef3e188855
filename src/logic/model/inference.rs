//! Inference seams - the traits every scorer implements
//!
//! Artifacts are loaded once per run and only ever read afterwards, so the
//! traits take `&self` and hold no interior state of their own.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use thiserror::Error;

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("model expects {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    MissingFeature(#[from] crate::logic::table::MissingFeature),

    #[error("model returned {actual} rows for {expected} inputs")]
    RowMismatch { expected: usize, actual: usize },

    #[error("inference backend failed: {0}")]
    Backend(String),
}

// ============================================================================
// SCORER TRAITS
// ============================================================================

/// Density/isolation family: one score per row, higher = more anomalous.
pub trait AnomalyScorer {
    fn name(&self) -> &str;

    /// Input columns by name, in model order. `None` = every numeric column.
    fn feature_names(&self) -> Option<&[String]>;

    /// Decision threshold shipped with the artifact, if any
    fn threshold(&self) -> Option<f64>;

    fn score(&self, inputs: ArrayView2<'_, f64>) -> Result<Vec<f64>, ScoringError>;
}

/// Reconstruction family: the model rebuilds each row, error is the signal.
pub trait Reconstructor {
    fn name(&self) -> &str;

    fn feature_names(&self) -> Option<&[String]>;

    fn threshold(&self) -> Option<f64>;

    fn reconstruct(&self, inputs: ArrayView2<'_, f64>) -> Result<Reconstruction, ScoringError>;
}

// ============================================================================
// RECONSTRUCTION OUTPUT
// ============================================================================

/// Model-space inputs next to their reconstruction (same shape).
///
/// `input` is what the network actually saw, i.e. after any scaling, so
/// per-feature errors are comparable with the training loss.
#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub input: Array2<f64>,
    pub output: Array2<f64>,
}

impl Reconstruction {
    pub fn new(input: Array2<f64>, output: Array2<f64>) -> Result<Self, ScoringError> {
        if input.nrows() != output.nrows() {
            return Err(ScoringError::RowMismatch {
                expected: input.nrows(),
                actual: output.nrows(),
            });
        }
        if input.ncols() != output.ncols() {
            return Err(ScoringError::DimensionMismatch {
                expected: input.ncols(),
                actual: output.ncols(),
            });
        }
        Ok(Self { input, output })
    }

    /// Mean squared error per row
    pub fn mse(&self) -> Vec<f64> {
        let diff = &self.input - &self.output;
        let squared = diff.mapv(|d| d * d);
        squared
            .mean_axis(Axis(1))
            .unwrap_or_else(|| Array1::zeros(self.input.nrows()))
            .to_vec()
    }
}

/// Shared input-width check for artifact-backed scorers
pub(crate) fn check_width(expected: usize, inputs: &ArrayView2<'_, f64>) -> Result<(), ScoringError> {
    if inputs.ncols() != expected {
        return Err(ScoringError::DimensionMismatch { expected, actual: inputs.ncols() });
    }
    Ok(())
}
