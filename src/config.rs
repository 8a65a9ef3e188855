//! Configuration module
//!
//! Layers, lowest first: built-in defaults (`constants.rs`), JSON config file,
//! `HOSTGUARD_*` environment (a `.env` file is loaded by the binary), CLI flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_ACTION_TIMEOUT_SECS, DEFAULT_FALLBACK_PERCENTILE, DEFAULT_FEATURES_PATH,
    DEFAULT_ISOLATION_MODEL, DEFAULT_RECONSTRUCTION_MODEL, DEFAULT_REPORT_CSV, DEFAULT_REPORT_JSON,
    DEFAULT_TOP_K,
};
use crate::logic::pipeline::InferenceOptions;
use crate::logic::response::{ActionMode, ExecOptions};

/// Config file looked up under the platform config directory
pub const CONFIG_DIR_NAME: &str = "hostguard";
pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value '{value}' for {key}")]
    InvalidEnv { key: String, value: String },

    #[error("{0}")]
    Invalid(String),

    #[error("live mode requires --confirm-live")]
    LiveNotConfirmed,
}

/// Settings for one `infer` run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InferConfig {
    pub features: PathBuf,
    pub isolation_model: PathBuf,
    pub reconstruction_model: PathBuf,
    pub out_json: PathBuf,
    pub out_csv: PathBuf,
    pub top_k: usize,
    pub fallback_percentile: f64,
    pub action: ActionMode,
    pub use_sudo: bool,
    pub action_timeout_secs: u64,
}

impl Default for InferConfig {
    fn default() -> Self {
        Self {
            features: PathBuf::from(DEFAULT_FEATURES_PATH),
            isolation_model: PathBuf::from(DEFAULT_ISOLATION_MODEL),
            reconstruction_model: PathBuf::from(DEFAULT_RECONSTRUCTION_MODEL),
            out_json: PathBuf::from(DEFAULT_REPORT_JSON),
            out_csv: PathBuf::from(DEFAULT_REPORT_CSV),
            top_k: DEFAULT_TOP_K,
            fallback_percentile: DEFAULT_FALLBACK_PERCENTILE,
            action: ActionMode::default(),
            use_sudo: true,
            action_timeout_secs: DEFAULT_ACTION_TIMEOUT_SECS,
        }
    }
}

impl InferConfig {
    /// Defaults, then the config file, then the process environment.
    ///
    /// An explicit `config_path` must exist; the per-user file is optional.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Override fields from `HOSTGUARD_*` variables returned by `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path_vars: [(&str, &mut PathBuf); 5] = [
            ("HOSTGUARD_FEATURES", &mut self.features),
            ("HOSTGUARD_ISOLATION_MODEL", &mut self.isolation_model),
            ("HOSTGUARD_RECONSTRUCTION_MODEL", &mut self.reconstruction_model),
            ("HOSTGUARD_OUT_JSON", &mut self.out_json),
            ("HOSTGUARD_OUT_CSV", &mut self.out_csv),
        ];
        for (key, slot) in path_vars {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *slot = PathBuf::from(value);
            }
        }

        if let Some(v) = parse_env(&lookup, "HOSTGUARD_TOP_K")? {
            self.top_k = v;
        }
        if let Some(v) = parse_env(&lookup, "HOSTGUARD_PERCENTILE")? {
            self.fallback_percentile = v;
        }
        if let Some(v) = parse_env(&lookup, "HOSTGUARD_ACTION")? {
            self.action = v;
        }
        if let Some(v) = parse_env(&lookup, "HOSTGUARD_USE_SUDO")? {
            self.use_sudo = v;
        }
        if let Some(v) = parse_env(&lookup, "HOSTGUARD_ACTION_TIMEOUT_SECS")? {
            self.action_timeout_secs = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=100.0).contains(&self.fallback_percentile) {
            return Err(ConfigError::Invalid(format!(
                "fallback percentile must be within 0..=100, got {}",
                self.fallback_percentile
            )));
        }
        if self.action_timeout_secs == 0 {
            return Err(ConfigError::Invalid("action timeout must be at least 1 second".to_string()));
        }
        Ok(())
    }

    pub fn inference_options(&self) -> InferenceOptions {
        InferenceOptions {
            top_k: self.top_k,
            fallback_percentile: self.fallback_percentile,
        }
    }

    pub fn exec_options(&self) -> ExecOptions {
        ExecOptions {
            timeout: Duration::from_secs(self.action_timeout_secs),
            use_sudo: self.use_sudo,
        }
    }
}

/// `live` only counts when it was confirmed separately.
pub fn resolve_action_mode(requested: ActionMode, confirm_live: bool) -> Result<ActionMode, ConfigError> {
    match requested {
        ActionMode::Live if !confirm_live => Err(ConfigError::LiveNotConfirmed),
        mode => Ok(mode),
    }
}

/// `<config dir>/hostguard/config.json`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

fn parse_env<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { key: key.to_string(), value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_constants() {
        let c = InferConfig::default();
        assert_eq!(c.top_k, 3);
        assert_eq!(c.fallback_percentile, 95.0);
        assert_eq!(c.action, ActionMode::Simulate);
        assert!(c.use_sudo);
        assert_eq!(c.exec_options().timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"top_k": 5, "action": "none", "features": "/data/f.csv"}"#).unwrap();

        let c = InferConfig::from_file(&path).unwrap();
        assert_eq!(c.top_k, 5);
        assert_eq!(c.action, ActionMode::NoAction);
        assert_eq!(c.features, PathBuf::from("/data/f.csv"));
        assert_eq!(c.fallback_percentile, 95.0);
    }

    #[test]
    fn test_unknown_file_key_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"dry_run": true}"#).unwrap();

        assert!(matches!(InferConfig::from_file(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempdir().unwrap();
        let err = InferConfig::load(Some(&dir.path().join("nope.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut c = InferConfig { top_k: 5, ..Default::default() };
        c.apply_env(env(&[
            ("HOSTGUARD_TOP_K", "2"),
            ("HOSTGUARD_ACTION", "live"),
            ("HOSTGUARD_OUT_CSV", "/tmp/out.csv"),
            ("HOSTGUARD_USE_SUDO", "false"),
        ]))
        .unwrap();

        assert_eq!(c.top_k, 2);
        assert_eq!(c.action, ActionMode::Live);
        assert_eq!(c.out_csv, PathBuf::from("/tmp/out.csv"));
        assert!(!c.use_sudo);
    }

    #[test]
    fn test_bad_env_value_rejected() {
        let mut c = InferConfig::default();
        let err = c.apply_env(env(&[("HOSTGUARD_PERCENTILE", "high")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { ref key, .. } if key == "HOSTGUARD_PERCENTILE"));
    }

    #[test]
    fn test_validate_ranges() {
        assert!(InferConfig::default().validate().is_ok());
        assert!(InferConfig { fallback_percentile: 101.0, ..Default::default() }.validate().is_err());
        assert!(InferConfig { fallback_percentile: f64::NAN, ..Default::default() }.validate().is_err());
        assert!(InferConfig { action_timeout_secs: 0, ..Default::default() }.validate().is_err());
    }

    #[test]
    fn test_live_needs_confirmation() {
        assert!(matches!(
            resolve_action_mode(ActionMode::Live, false),
            Err(ConfigError::LiveNotConfirmed)
        ));
        assert_eq!(resolve_action_mode(ActionMode::Live, true).unwrap(), ActionMode::Live);
        assert_eq!(resolve_action_mode(ActionMode::Simulate, false).unwrap(), ActionMode::Simulate);
        assert_eq!(resolve_action_mode(ActionMode::NoAction, true).unwrap(), ActionMode::NoAction);
    }
}
