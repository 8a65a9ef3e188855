//! Inference Pipeline - one linear pass over a static feature table
//!
//! ```text
//! FeatureTable ─► isolation scores ─┐
//!              └► reconstruction ───┼─► thresholds ─► fuse ─► explain ─► gate ─► InferenceReport
//! ```
//!
//! Row order of the table is the row order of the report.

use ndarray::Array2;
use thiserror::Error;

use super::explain;
use super::fusion::{self, ScoredColumn, ScorerColumn};
use super::model::{threshold, AnomalyScorer, Reconstruction, Reconstructor, ScoringError};
use super::report::{HostRecord, InferenceReport, RunSummary, ScoreDetail, Verdict};
use super::response::ActionGate;
use super::table::FeatureTable;
use crate::constants::{DEFAULT_FALLBACK_PERCENTILE, DEFAULT_TOP_K};


// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("primary scorer '{scorer}' failed: {source}")]
    PrimaryScoring {
        scorer: String,
        #[source]
        source: ScoringError,
    },

    #[error("primary scorer '{scorer}' returned {actual} scores for {expected} hosts")]
    ScoreCount {
        scorer: String,
        expected: usize,
        actual: usize,
    },
}

// ============================================================================
// INPUTS
// ============================================================================

/// Loaded scorers for one run. The reconstruction slot is `None` when its
/// artifact could not be loaded.
#[derive(Clone, Copy)]
pub struct Detectors<'a> {
    pub isolation: &'a dyn AnomalyScorer,
    pub reconstruction: Option<&'a dyn Reconstructor>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceOptions {
    pub top_k: usize,
    pub fallback_percentile: f64,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            fallback_percentile: DEFAULT_FALLBACK_PERCENTILE,
        }
    }
}

/// Reconstruction scorer output kept around for the explain step
struct ReconstructionPass {
    column: ScoredColumn,
    feature_names: Vec<String>,
    reconstruction: Reconstruction,
}

// ============================================================================
// RUN
// ============================================================================

/// Score, fuse, explain and gate every host in `table`.
pub fn run(
    table: &FeatureTable,
    detectors: Detectors<'_>,
    options: &InferenceOptions,
    gate: &ActionGate,
) -> Result<InferenceReport, PipelineError> {
    log::info!(
        "Scoring {} hosts x {} features (action mode: {})",
        table.len(),
        table.feature_names().len(),
        gate.mode().as_str()
    );

    let isolation = score_isolation(table, detectors.isolation, options)?;

    let reconstruction = detectors
        .reconstruction
        .and_then(|model| score_reconstruction(table, model, options));
    if reconstruction.is_none() {
        log::warn!("Reconstruction scorer unavailable; flags rely on the isolation forest alone");
    }

    let secondary = match &reconstruction {
        Some(pass) => ScorerColumn::Available(pass.column.clone()),
        None => ScorerColumn::Unavailable,
    };
    let flags = fusion::fuse(&isolation, &secondary);

    let mut results = Vec::with_capacity(table.len());
    for (row, (host_id, fused)) in table.host_ids().iter().zip(&flags).enumerate() {
        let combined = fused.combined();

        let verdict = match (combined, &reconstruction) {
            (false, _) => Verdict::Clear,
            (true, Some(pass)) => Verdict::Flagged {
                explanation: explain::top_k(
                    &pass.feature_names,
                    pass.reconstruction.input.row(row),
                    pass.reconstruction.output.row(row),
                    options.top_k,
                ),
            },
            (true, None) => Verdict::FlaggedUnexplained,
        };

        if combined {
            log::debug!(
                "Host {} flagged (isolation={}, reconstruction={})",
                host_id,
                fused.isolation,
                fused.reconstruction
            );
        }

        results.push(HostRecord {
            host_id: host_id.clone(),
            isolation: ScoreDetail { value: isolation.scores[row], flag: fused.isolation },
            reconstruction: reconstruction.as_ref().map(|pass| ScoreDetail {
                value: pass.column.scores[row],
                flag: fused.reconstruction,
            }),
            combined_flag: combined,
            verdict,
            action: gate.decide(host_id, combined),
        });
    }

    let flagged_hosts = results.iter().filter(|r| r.combined_flag).count();
    log::info!("Inference complete: {}/{} hosts flagged", flagged_hosts, results.len());

    Ok(InferenceReport {
        summary: RunSummary {
            run_id: uuid::Uuid::new_v4(),
            generated_at: chrono::Utc::now(),
            analyzer_host: analyzer_host(),
            total_hosts: results.len(),
            flagged_hosts,
            isolation_threshold: isolation.threshold,
            reconstruction_threshold: reconstruction.as_ref().map(|pass| pass.column.threshold),
            action_mode: gate.mode(),
            top_k: options.top_k,
        },
        results,
    })
}

fn score_isolation(
    table: &FeatureTable,
    model: &dyn AnomalyScorer,
    options: &InferenceOptions,
) -> Result<ScoredColumn, PipelineError> {
    let primary_err = |source: ScoringError| PipelineError::PrimaryScoring {
        scorer: model.name().to_string(),
        source,
    };

    let (_, inputs) = table
        .select(model.feature_names())
        .map_err(|e| primary_err(e.into()))?;
    let scores = model.score(inputs.view()).map_err(primary_err)?;

    if scores.len() != table.len() {
        return Err(PipelineError::ScoreCount {
            scorer: model.name().to_string(),
            expected: table.len(),
            actual: scores.len(),
        });
    }

    let threshold = threshold::resolve(
        model.name(),
        model.threshold(),
        &scores,
        options.fallback_percentile,
    );
    Ok(ScoredColumn { scores, threshold })
}

/// Any failure here degrades the run instead of aborting it.
fn score_reconstruction(
    table: &FeatureTable,
    model: &dyn Reconstructor,
    options: &InferenceOptions,
) -> Option<ReconstructionPass> {
    let attempt = || -> Result<(Vec<String>, Reconstruction), ScoringError> {
        let (feature_names, inputs): (Vec<String>, Array2<f64>) = table.select(model.feature_names())?;
        let reconstruction = model.reconstruct(inputs.view())?;
        if reconstruction.input.nrows() != table.len() {
            return Err(ScoringError::RowMismatch {
                expected: table.len(),
                actual: reconstruction.input.nrows(),
            });
        }
        if reconstruction.input.ncols() != feature_names.len() {
            return Err(ScoringError::DimensionMismatch {
                expected: feature_names.len(),
                actual: reconstruction.input.ncols(),
            });
        }
        Ok((feature_names, reconstruction))
    };

    let (feature_names, reconstruction) = match attempt() {
        Ok(out) => out,
        Err(e) => {
            log::warn!("Reconstruction scorer '{}' failed: {}", model.name(), e);
            return None;
        }
    };

    let scores = reconstruction.mse();
    let threshold = threshold::resolve(
        model.name(),
        model.threshold(),
        &scores,
        options.fallback_percentile,
    );

    Some(ReconstructionPass {
        column: ScoredColumn { scores, threshold },
        feature_names,
        reconstruction,
    })
}

fn analyzer_host() -> Option<String> {
    hostname::get().ok().and_then(|h| h.into_string().ok())
}
