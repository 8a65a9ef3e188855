//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Config files, environment and CLI flags only ever override these.

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "HostGuard";

// ============================================
// Inference defaults
// ============================================

/// Feature table produced by the aggregation step
pub const DEFAULT_FEATURES_PATH: &str = "data/processed/features.csv";

/// Isolation forest artifact (primary scorer)
pub const DEFAULT_ISOLATION_MODEL: &str = "models/isof.json";

/// Autoencoder artifact or directory (secondary scorer)
pub const DEFAULT_RECONSTRUCTION_MODEL: &str = "models/auto_model";

/// Detailed JSON report
pub const DEFAULT_REPORT_JSON: &str = "reports/infer.json";

/// Flat CSV report
pub const DEFAULT_REPORT_CSV: &str = "reports/infer.csv";

/// Number of features listed per explanation
pub const DEFAULT_TOP_K: usize = 3;

/// Batch percentile used when an artifact carries no threshold
pub const DEFAULT_FALLBACK_PERCENTILE: f64 = 95.0;

/// Upper bound for one mitigation command
pub const DEFAULT_ACTION_TIMEOUT_SECS: u64 = 10;

/// Host identifier column, and the legacy alias accepted in its place
pub const HOST_COLUMN: &str = "src_ip";
pub const HOST_COLUMN_ALIAS: &str = "src";

// ============================================
// Report API defaults
// ============================================

pub const DEFAULT_API_PORT: u16 = 8000;

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Report served by the API
pub fn get_report_path() -> String {
    std::env::var("HOSTGUARD_REPORT")
        .unwrap_or_else(|_| DEFAULT_REPORT_JSON.to_string())
}

/// API listen port
pub fn get_api_port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_API_PORT)
}
