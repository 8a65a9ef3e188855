//! Model Module - anomaly scorers and their artifacts
//!
//! Scoring is kept apart from data loading: the pipeline only sees the
//! `AnomalyScorer` / `Reconstructor` traits, so tests can hand it fakes.

pub mod artifact;
pub mod autoencoder;
pub mod isolation_forest;
pub mod inference;
pub mod scaler;
pub mod threshold;

#[cfg(feature = "onnx")]
pub mod onnx;

// Re-export common types
pub use artifact::{load_isolation_forest, load_reconstructor, ArtifactError};
pub use inference::{AnomalyScorer, Reconstruction, Reconstructor, ScoringError};
pub use threshold::{Threshold, ThresholdSource};
