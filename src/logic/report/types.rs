//! Report records - one closed type per host outcome

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logic::explain::FeatureError;
use crate::logic::model::Threshold;
use crate::logic::response::{ActionMode, ActionRecord};

// ============================================================================
// PER-HOST
// ============================================================================

/// One detector's output for one host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreDetail {
    pub value: f64,
    pub flag: bool,
}

/// Fused decision. Which variant applies is fixed by the flags and by
/// whether the reconstruction scorer ran, never by optional keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verdict {
    Clear,
    /// Flagged while the reconstruction scorer was available
    Flagged { explanation: Vec<FeatureError> },
    /// Flagged with no reconstruction scorer to explain it
    FlaggedUnexplained,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostRecord {
    pub host_id: String,
    pub isolation: ScoreDetail,
    /// `None` when the reconstruction scorer was unavailable for this run
    pub reconstruction: Option<ScoreDetail>,
    pub combined_flag: bool,
    pub verdict: Verdict,
    pub action: ActionRecord,
}

impl HostRecord {
    pub fn explanation(&self) -> Option<&[FeatureError]> {
        match &self.verdict {
            Verdict::Flagged { explanation } => Some(explanation),
            Verdict::Clear | Verdict::FlaggedUnexplained => None,
        }
    }
}

// ============================================================================
// RUN LEVEL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub analyzer_host: Option<String>,
    pub total_hosts: usize,
    pub flagged_hosts: usize,
    pub isolation_threshold: Threshold,
    /// `None` when the reconstruction scorer was unavailable
    pub reconstruction_threshold: Option<Threshold>,
    pub action_mode: ActionMode,
    pub top_k: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceReport {
    pub summary: RunSummary,
    pub results: Vec<HostRecord>,
}

impl InferenceReport {
    pub fn find_host(&self, host_id: &str) -> Option<&HostRecord> {
        self.results.iter().find(|r| r.host_id == host_id)
    }

    pub fn alerts(&self) -> impl Iterator<Item = &HostRecord> {
        self.results.iter().filter(|r| r.combined_flag)
    }
}
