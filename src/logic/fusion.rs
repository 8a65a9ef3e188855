//! Decision Fusion - two independent detectors, one verdict per host
//!
//! Rule: `combined = isolation_flag OR reconstruction_flag`. A host needs
//! only one model to agree. Vectors are aligned by position with the
//! feature table and are never reordered or filtered here.

use serde::{Deserialize, Serialize};

use super::model::Threshold;

// ============================================================================
// INPUTS
// ============================================================================

/// One detector's scores for the whole batch plus its resolved threshold
#[derive(Debug, Clone)]
pub struct ScoredColumn {
    pub scores: Vec<f64>,
    pub threshold: Threshold,
}

impl ScoredColumn {
    pub fn flag(&self, row: usize) -> bool {
        self.threshold.is_anomaly(self.scores[row])
    }
}

/// Secondary detector slot: it may have failed to load or score
#[derive(Debug, Clone)]
pub enum ScorerColumn {
    Available(ScoredColumn),
    /// Contributes score 0 and flag `false` for every host
    Unavailable,
}

impl ScorerColumn {
    pub fn as_available(&self) -> Option<&ScoredColumn> {
        match self {
            ScorerColumn::Available(c) => Some(c),
            ScorerColumn::Unavailable => None,
        }
    }
}

// ============================================================================
// OUTPUT
// ============================================================================

/// Per-host flags. The combined flag is derived, never stored separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FusedFlags {
    pub isolation: bool,
    pub reconstruction: bool,
}

impl FusedFlags {
    pub fn combined(&self) -> bool {
        self.isolation || self.reconstruction
    }
}

/// Fuse both detectors row by row.
///
/// # Panics
/// If an available column's length differs from the primary column's. The
/// pipeline builds both from the same table, so that is a programming error.
pub fn fuse(isolation: &ScoredColumn, reconstruction: &ScorerColumn) -> Vec<FusedFlags> {
    if let Some(rec) = reconstruction.as_available() {
        assert_eq!(
            rec.scores.len(),
            isolation.scores.len(),
            "score vectors must be aligned with the feature table"
        );
    }

    (0..isolation.scores.len())
        .map(|row| FusedFlags {
            isolation: isolation.flag(row),
            reconstruction: reconstruction.as_available().map_or(false, |c| c.flag(row)),
        })
        .collect()
}
