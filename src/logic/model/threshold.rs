//! Decision Threshold Resolution
//!
//! An artifact's own threshold is used unmodified. Without one we fall back
//! to a percentile of the current batch, which makes the decision relative
//! to whichever hosts happen to be in this run.

use serde::{Deserialize, Serialize};

/// Where a threshold came from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThresholdSource {
    /// Shipped with the trained artifact
    Artifact,
    /// Derived from this run's score vector
    BatchPercentile { percentile: f64 },
}

/// Resolved threshold, fixed for the whole run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub value: f64,
    pub source: ThresholdSource,
}

impl Threshold {
    pub fn from_artifact(value: f64) -> Self {
        Self { value, source: ThresholdSource::Artifact }
    }

    /// Inclusive: a score equal to the threshold is anomalous.
    pub fn is_anomaly(&self, score: f64) -> bool {
        score >= self.value
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.source, ThresholdSource::BatchPercentile { .. })
    }
}

/// Resolve the threshold for one scorer.
///
/// `scorer` only labels the log line emitted when the fallback kicks in.
pub fn resolve(scorer: &str, artifact: Option<f64>, scores: &[f64], percentile: f64) -> Threshold {
    if let Some(value) = artifact.filter(|v| v.is_finite()) {
        return Threshold::from_artifact(value);
    }

    let value = percentile_of(scores, percentile).unwrap_or(0.0);
    log::info!(
        "{} threshold not found; using {}th percentile of this batch -> {:.6} (sensitivity now depends on the host population)",
        scorer,
        percentile,
        value
    );

    Threshold {
        value,
        source: ThresholdSource::BatchPercentile { percentile },
    }
}

/// Percentile with linear interpolation between closest ranks.
///
/// `rank = p/100 * (n - 1)`; matches the training side so thresholds derived
/// there and here agree on the same data.
pub fn percentile_of(values: &[f64], percentile: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let p = percentile.clamp(0.0, 100.0) / 100.0;
    let rank = p * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;

    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}
