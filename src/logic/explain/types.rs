use serde::{Deserialize, Serialize};

/// One feature's share of a host's reconstruction error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureError {
    pub feature: String,
    pub abs_error: f64,
}

impl FeatureError {
    pub fn new(feature: impl Into<String>, abs_error: f64) -> Self {
        Self { feature: feature.into(), abs_error }
    }
}
