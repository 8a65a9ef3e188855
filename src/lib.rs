//! HostGuard - dual-model network anomaly inference core
//!
//! Scores a per-host feature table with an isolation forest and an
//! autoencoder, fuses their flags, explains flagged hosts, and hands each
//! verdict to a safety-gated block action.

pub mod api;
pub mod config;
pub mod constants;
pub mod logic;
