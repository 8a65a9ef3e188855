//! Logic Module - inference core
//!
//! - `table/` - feature table loading
//! - `model/` - scorer traits, artifacts, thresholds
//! - `fusion.rs` - OR fusion of both detectors
//! - `explain/` - top-K reconstruction error attribution
//! - `response/` - gated block action
//! - `report/` - JSON / CSV reports
//! - `pipeline/` - one run, end to end

pub mod explain;
pub mod fusion;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod response;
pub mod table;
