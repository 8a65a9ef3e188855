//! Artifact Loading - files on disk to scorer instances
//!
//! Both scorers are loaded once per run. A `<file>.sha256` sidecar, when
//! present, must match the artifact before anything is parsed.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::autoencoder::{AutoencoderArtifact, DenseAutoencoder};
use super::inference::{AnomalyScorer, Reconstructor};
use super::isolation_forest::{IsolationForest, IsolationForestArtifact};

/// Model file looked up inside an artifact directory
pub const MODEL_FILE_JSON: &str = "model.json";
#[cfg(feature = "onnx")]
pub const MODEL_FILE_ONNX: &str = "model.onnx";

/// Training report written next to the model
pub const REPORT_FILE: &str = "report.json";

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse artifact {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid artifact {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },

    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("unsupported artifact format: {0}")]
    UnsupportedFormat(PathBuf),
}

// ============================================================================
// PUBLIC LOADERS
// ============================================================================

/// Load the primary (isolation forest) scorer.
pub fn load_isolation_forest(path: &Path) -> Result<IsolationForest, ArtifactError> {
    let file = resolve_model_file(path)?;
    let mut artifact: IsolationForestArtifact = read_json(&file)?;

    if artifact.threshold.is_none() && path.is_dir() {
        artifact.threshold = read_report_threshold(&file)?;
    }

    let forest = IsolationForest::new(display_name(path), artifact)
        .map_err(|reason| ArtifactError::Invalid { path: file.clone(), reason })?;

    log::info!(
        "IsolationForest loaded from {} ({} trees, threshold={:?})",
        file.display(),
        forest.n_trees(),
        forest.threshold()
    );
    Ok(forest)
}

/// Load the secondary (reconstruction) scorer.
pub fn load_reconstructor(path: &Path) -> Result<Box<dyn Reconstructor>, ArtifactError> {
    let file = resolve_model_file(path)?;
    let report_threshold = if path.is_dir() { read_report_threshold(&file)? } else { None };

    #[cfg(feature = "onnx")]
    {
        if file.extension().map_or(false, |e| e == "onnx") {
            verify_checksum(&file)?;
            let mut model = super::onnx::OnnxAutoencoder::load(display_name(path), &file)
                .map_err(|e| ArtifactError::Invalid { path: file.clone(), reason: e.to_string() })?;
            model.set_threshold_if_missing(report_threshold);
            log::info!("ONNX autoencoder loaded from {} (threshold={:?})", file.display(), model.threshold());
            return Ok(Box::new(model));
        }
    }

    if !file.extension().map_or(false, |e| e == "json") {
        return Err(ArtifactError::UnsupportedFormat(file));
    }

    let artifact: AutoencoderArtifact = read_json(&file)?;
    let mut model = DenseAutoencoder::new(display_name(path), artifact)
        .map_err(|reason| ArtifactError::Invalid { path: file.clone(), reason })?;
    model.set_threshold_if_missing(report_threshold);

    log::info!(
        "Autoencoder loaded from {} ({} inputs, threshold={:?})",
        file.display(),
        model.input_dim(),
        model.threshold()
    );
    Ok(Box::new(model))
}

// ============================================================================
// HELPERS
// ============================================================================

/// A file is used as-is; a directory must contain a known model file.
fn resolve_model_file(path: &Path) -> Result<PathBuf, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::NotFound(path.to_path_buf()));
    }
    if path.is_file() {
        return Ok(path.to_path_buf());
    }

    #[cfg(feature = "onnx")]
    {
        let onnx = path.join(MODEL_FILE_ONNX);
        if onnx.is_file() {
            return Ok(onnx);
        }
    }

    let json = path.join(MODEL_FILE_JSON);
    if json.is_file() {
        return Ok(json);
    }

    Err(ArtifactError::NotFound(json))
}

fn display_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn read_json<T: serde::de::DeserializeOwned>(file: &Path) -> Result<T, ArtifactError> {
    verify_checksum(file)?;
    let bytes = fs::read(file).map_err(|source| ArtifactError::Io { path: file.to_path_buf(), source })?;
    serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Parse { path: file.to_path_buf(), source })
}

#[derive(Deserialize)]
struct TrainingReport {
    #[serde(default)]
    threshold: Option<f64>,
}

/// `report.json` beside the model file inside an artifact directory
fn read_report_threshold(model_file: &Path) -> Result<Option<f64>, ArtifactError> {
    let Some(dir) = model_file.parent() else {
        return Ok(None);
    };
    let report = dir.join(REPORT_FILE);
    if !report.is_file() || report == model_file {
        return Ok(None);
    }

    let bytes = fs::read(&report).map_err(|source| ArtifactError::Io { path: report.clone(), source })?;
    let parsed: TrainingReport =
        serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Parse { path: report.clone(), source })?;

    if let Some(t) = parsed.threshold {
        log::debug!("Threshold {} read from {}", t, report.display());
    }
    Ok(parsed.threshold)
}

/// Check `<file>.sha256` when it exists. First whitespace token is the digest.
pub fn verify_checksum(file: &Path) -> Result<(), ArtifactError> {
    let mut sidecar = file.as_os_str().to_owned();
    sidecar.push(".sha256");
    let sidecar = PathBuf::from(sidecar);

    if !sidecar.is_file() {
        return Ok(());
    }

    let expected = fs::read_to_string(&sidecar)
        .map_err(|source| ArtifactError::Io { path: sidecar.clone(), source })?
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase();

    let actual = calculate_file_hash(file)?;
    if expected != actual {
        return Err(ArtifactError::ChecksumMismatch { path: file.to_path_buf(), expected, actual });
    }

    log::debug!("Checksum verified for {}", file.display());
    Ok(())
}

fn calculate_file_hash(path: &Path) -> Result<String, ArtifactError> {
    let io_err = |source| ArtifactError::Io { path: path.to_path_buf(), source };

    let mut file = fs::File::open(path).map_err(io_err)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer).map_err(io_err)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn forest_json(threshold: Option<f64>) -> serde_json::Value {
        json!({
            "n_features": 1,
            "max_samples": 4,
            "threshold": threshold,
            "trees": [{
                "children_left": [1, -1, -1],
                "children_right": [2, -1, -1],
                "feature": [0, -2, -2],
                "threshold": [0.5, -2.0, -2.0],
                "n_node_samples": [4, 3, 1]
            }]
        })
    }

    fn autoencoder_json(threshold: Option<f64>) -> serde_json::Value {
        json!({
            "threshold": threshold,
            "layers": [{ "weights": [[1.0]], "bias": [0.0], "activation": "linear" }]
        })
    }

    #[test]
    fn test_load_forest_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("isof.json");
        fs::write(&path, forest_json(Some(0.7)).to_string()).unwrap();

        let forest = load_isolation_forest(&path).unwrap();
        assert_eq!(forest.threshold(), Some(0.7));
    }

    #[test]
    fn test_missing_artifact() {
        let dir = tempdir().unwrap();
        let err = load_isolation_forest(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound(_)));
    }

    #[test]
    fn test_directory_with_report_threshold() {
        let dir = tempdir().unwrap();
        let model_dir = dir.path().join("auto_model");
        fs::create_dir_all(&model_dir).unwrap();
        fs::write(model_dir.join(MODEL_FILE_JSON), autoencoder_json(None).to_string()).unwrap();
        fs::write(model_dir.join(REPORT_FILE), json!({ "threshold": 0.25 }).to_string()).unwrap();

        let model = load_reconstructor(&model_dir).unwrap();
        assert_eq!(model.threshold(), Some(0.25));
    }

    #[test]
    fn test_checksum_mismatch_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("isof.json");
        fs::write(&path, forest_json(None).to_string()).unwrap();
        fs::write(dir.path().join("isof.json.sha256"), "deadbeef  isof.json\n").unwrap();

        let err = load_isolation_forest(&path).unwrap_err();
        assert!(matches!(err, ArtifactError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_checksum_match_accepted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("isof.json");
        let body = forest_json(None).to_string();
        fs::write(&path, &body).unwrap();

        let digest = hex::encode(Sha256::digest(body.as_bytes()));
        fs::write(dir.path().join("isof.json.sha256"), format!("{}  isof.json\n", digest)).unwrap();

        assert!(load_isolation_forest(&path).is_ok());
    }

    #[test]
    fn test_malformed_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("isof.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_isolation_forest(&path), Err(ArtifactError::Parse { .. })));
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("auto.h5");
        fs::write(&path, b"HDF").unwrap();
        assert!(matches!(load_reconstructor(&path), Err(ArtifactError::UnsupportedFormat(_))));
    }
}
