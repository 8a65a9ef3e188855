//! Report Module - per-run detailed JSON and flat CSV
//!
//! Both files derive from the same in-memory `InferenceReport`. Each run
//! writes a fresh pair; nothing is ever updated in place.

pub mod types;
pub mod writer;

use std::path::PathBuf;

use thiserror::Error;

pub use types::{HostRecord, InferenceReport, RunSummary, ScoreDetail, Verdict};
pub use writer::{read_json, write_csv, write_json};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report not found: {0}")]
    NotFound(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error on {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::explain::FeatureError;
    use crate::logic::model::Threshold;
    use crate::logic::response::{ActionMode, ActionRecord};
    use std::fs;
    use tempfile::tempdir;

    fn sample_report() -> InferenceReport {
        let flagged = HostRecord {
            host_id: "10.0.0.2".to_string(),
            isolation: ScoreDetail { value: 0.9, flag: true },
            reconstruction: Some(ScoreDetail { value: 12.0, flag: false }),
            combined_flag: true,
            verdict: Verdict::Flagged {
                explanation: vec![FeatureError::new("pkt_bytes", 4.0)],
            },
            action: ActionRecord::simulated("iptables -A INPUT -s 10.0.0.2 -j DROP".to_string()),
        };
        let clear = HostRecord {
            host_id: "10.0.0.1".to_string(),
            isolation: ScoreDetail { value: 0.2, flag: false },
            reconstruction: Some(ScoreDetail { value: 1.0, flag: false }),
            combined_flag: false,
            verdict: Verdict::Clear,
            action: ActionRecord::no_action("no action"),
        };

        InferenceReport {
            summary: RunSummary {
                run_id: uuid::Uuid::new_v4(),
                generated_at: chrono::Utc::now(),
                analyzer_host: Some("lab".to_string()),
                total_hosts: 2,
                flagged_hosts: 1,
                isolation_threshold: Threshold::from_artifact(0.8),
                reconstruction_threshold: Some(Threshold::from_artifact(100.0)),
                action_mode: ActionMode::Simulate,
                top_k: 3,
            },
            results: vec![clear, flagged],
        }
    }

    #[test]
    fn test_json_round_trip_keeps_verdicts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reports").join("infer.json");
        let report = sample_report();

        write_json(&report, &path).unwrap();
        let loaded = read_json(&path).unwrap();

        assert_eq!(loaded, report);
        assert!(!dir.path().join("reports").join("infer.json.tmp").exists());
    }

    #[test]
    fn test_json_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("infer.json");
        write_json(&sample_report(), &path).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["summary"]["flagged_hosts"], 1);
        assert_eq!(value["results"][0]["verdict"]["kind"], "clear");
        assert!(value["results"][0]["verdict"].get("explanation").is_none());
        assert_eq!(value["results"][1]["verdict"]["explanation"][0]["feature"], "pkt_bytes");
        assert_eq!(value["results"][1]["action"]["status"], "SIMULATED");
    }

    #[test]
    fn test_csv_is_flat() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("infer.csv");
        write_csv(&sample_report(), &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "host_id,isolation_score,isolation_flag,reconstruction_error,reconstruction_flag,\
             combined_flag,action_status,action_command,action_executed,action_note"
        );
        assert_eq!(lines.next().unwrap(), "10.0.0.1,0.2,0,1.0,0,0,NO_ACTION,,false,no action");
        assert_eq!(
            lines.next().unwrap(),
            "10.0.0.2,0.9,1,12.0,0,1,SIMULATED,iptables -A INPUT -s 10.0.0.2 -j DROP,false,dry-run"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_read_missing_report() {
        let dir = tempdir().unwrap();
        let err = read_json(&dir.path().join("none.json")).unwrap_err();
        assert!(matches!(err, ReportError::NotFound(_)));
    }
}
