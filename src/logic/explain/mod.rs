//! Explain Module - which features drove the reconstruction error
//!
//! Only ever fed by the reconstruction scorer. Whether a host gets an
//! explanation at all is decided by the caller, not in here.

pub mod engine;
pub mod types;

pub use engine::top_k;
pub use types::FeatureError;
