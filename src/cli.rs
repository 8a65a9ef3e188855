use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use hostguard::api::{self, AppState};
use hostguard::config::{self, InferConfig};
use hostguard::constants;
use hostguard::logic::model::{self, Reconstructor};
use hostguard::logic::pipeline::{self, Detectors};
use hostguard::logic::report::{self, InferenceReport};
use hostguard::logic::response::{ActionGate, ActionMode};
use hostguard::logic::table;

#[derive(Parser)]
#[command(name = "hostguard")]
#[command(author, version, about = "Dual-model network anomaly inference with a gated block action")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score a feature table and write JSON/CSV reports
    Infer(InferArgs),

    /// Serve the latest report over HTTP
    Serve {
        /// Report to serve (default: $HOSTGUARD_REPORT or reports/infer.json)
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Listen port (default: $PORT or 8000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Args, Debug, Default)]
pub struct InferArgs {
    /// Per-host feature table (CSV)
    #[arg(long)]
    pub features: Option<PathBuf>,

    /// Isolation forest artifact
    #[arg(long)]
    pub isolation_model: Option<PathBuf>,

    /// Autoencoder artifact or directory
    #[arg(long)]
    pub reconstruction_model: Option<PathBuf>,

    /// Detailed JSON report
    #[arg(long)]
    pub out_json: Option<PathBuf>,

    /// Flat CSV report
    #[arg(long)]
    pub out_csv: Option<PathBuf>,

    /// What to do with flagged hosts: none, simulate or live
    #[arg(long)]
    pub action: Option<ActionMode>,

    /// Required together with `--action live`
    #[arg(long)]
    pub confirm_live: bool,

    /// Features listed per explanation
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Batch percentile used when an artifact has no threshold
    #[arg(long)]
    pub percentile: Option<f64>,

    /// Run block commands without `sudo -n`
    #[arg(long)]
    pub no_sudo: bool,

    /// Seconds before a block command is killed
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl InferArgs {
    /// CLI flags are the top configuration layer
    pub fn apply(&self, config: &mut InferConfig) {
        if let Some(p) = &self.features {
            config.features = p.clone();
        }
        if let Some(p) = &self.isolation_model {
            config.isolation_model = p.clone();
        }
        if let Some(p) = &self.reconstruction_model {
            config.reconstruction_model = p.clone();
        }
        if let Some(p) = &self.out_json {
            config.out_json = p.clone();
        }
        if let Some(p) = &self.out_csv {
            config.out_csv = p.clone();
        }
        if let Some(mode) = self.action {
            config.action = mode;
        }
        if let Some(k) = self.top_k {
            config.top_k = k;
        }
        if let Some(p) = self.percentile {
            config.fallback_percentile = p;
        }
        if self.no_sudo {
            config.use_sudo = false;
        }
        if let Some(secs) = self.timeout {
            config.action_timeout_secs = secs;
        }
    }
}

pub fn run_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Infer(args) => cmd_infer(cli.config, args),
        Commands::Serve { report, port } => cmd_serve(report, port),
    }
}

fn cmd_infer(config_path: Option<PathBuf>, args: InferArgs) -> Result<()> {
    let mut config = InferConfig::load(config_path.as_deref()).context("Failed to load configuration")?;
    args.apply(&mut config);

    let report = infer(&config, args.confirm_live)?;
    print_summary(&report);
    Ok(())
}

/// One full `infer` run. Reports are written only when every fatal step
/// succeeded.
pub fn infer(config: &InferConfig, confirm_live: bool) -> Result<InferenceReport> {
    config.validate()?;

    // Refuse an unconfirmed live run before any model is touched
    let mode = config::resolve_action_mode(config.action, confirm_live)?;
    if mode == ActionMode::Live {
        log::warn!("LIVE mode: flagged hosts will be blocked with iptables on this machine");
    }

    let table = table::load(&config.features)
        .with_context(|| format!("Failed to load feature table {}", config.features.display()))?;

    let isolation = model::load_isolation_forest(&config.isolation_model).with_context(|| {
        format!("Failed to load isolation forest {}", config.isolation_model.display())
    })?;

    let reconstruction: Option<Box<dyn Reconstructor>> =
        match model::load_reconstructor(&config.reconstruction_model) {
            Ok(m) => Some(m),
            Err(e) => {
                log::warn!("Autoencoder unavailable, continuing with the isolation forest only: {}", e);
                None
            }
        };

    let gate = ActionGate::new(mode, config.exec_options()).context("Failed to start command runner")?;
    let detectors = Detectors {
        isolation: &isolation,
        reconstruction: reconstruction.as_deref(),
    };
    let report = pipeline::run(&table, detectors, &config.inference_options(), &gate)?;

    report::write_json(&report, &config.out_json)?;
    report::write_csv(&report, &config.out_csv)?;
    log::info!(
        "Reports written: {} and {}",
        config.out_json.display(),
        config.out_csv.display()
    );

    Ok(report)
}

fn cmd_serve(report: Option<PathBuf>, port: Option<u16>) -> Result<()> {
    let report_path = report.unwrap_or_else(|| PathBuf::from(constants::get_report_path()));
    let port = port.unwrap_or_else(constants::get_api_port);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    runtime
        .block_on(api::serve(AppState::new(report_path), port))
        .context("Report API stopped")
}

fn print_summary(report: &InferenceReport) {
    let s = &report.summary;
    println!("Hosts scored:        {}", s.total_hosts);
    println!("Hosts flagged:       {}", s.flagged_hosts);
    println!(
        "Isolation threshold: {:.6}{}",
        s.isolation_threshold.value,
        if s.isolation_threshold.is_fallback() { " (batch percentile)" } else { "" }
    );
    match &s.reconstruction_threshold {
        Some(t) => println!(
            "Reconstruction threshold: {:.6}{}",
            t.value,
            if t.is_fallback() { " (batch percentile)" } else { "" }
        ),
        None => println!("Reconstruction threshold: n/a (autoencoder unavailable)"),
    }
    println!("Action mode:         {}", s.action_mode.as_str());

    if s.flagged_hosts > 0 {
        println!();
        println!("WARNING: {} host(s) flagged as anomalous:", s.flagged_hosts);
        for record in report.alerts() {
            println!("  {:<40} {}", record.host_id, record.action.status.as_str());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostguard::config::ConfigError;
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    /// Feature table plus both artifacts; returns a config pointing at them
    fn workspace(dir: &Path) -> InferConfig {
        let features = dir.join("features.csv");
        fs::write(
            &features,
            "src_ip,pkt_count\n10.0.0.1,0\n10.0.0.2,0\n10.0.0.3,0\n10.0.0.4,1\n",
        )
        .unwrap();

        let isolation_model = dir.join("isof.json");
        let forest = json!({
            "n_features": 1,
            "max_samples": 4,
            "threshold": 0.5,
            "trees": [{
                "children_left": [1, -1, -1],
                "children_right": [2, -1, -1],
                "feature": [0, -2, -2],
                "threshold": [0.5, -2.0, -2.0],
                "n_node_samples": [4, 3, 1]
            }]
        });
        fs::write(&isolation_model, forest.to_string()).unwrap();

        let reconstruction_model = dir.join("auto.json");
        let autoencoder = json!({
            "threshold": 1.0,
            "layers": [{ "weights": [[1.0]], "bias": [0.0], "activation": "linear" }]
        });
        fs::write(&reconstruction_model, autoencoder.to_string()).unwrap();

        InferConfig {
            features,
            isolation_model,
            reconstruction_model,
            out_json: dir.join("reports").join("infer.json"),
            out_csv: dir.join("reports").join("infer.csv"),
            ..Default::default()
        }
    }

    fn no_reports(config: &InferConfig) -> bool {
        !config.out_json.exists() && !config.out_csv.exists()
    }

    #[test]
    fn test_infer_writes_both_reports() {
        let dir = tempdir().unwrap();
        let config = workspace(dir.path());

        let report = infer(&config, false).unwrap();
        assert_eq!(report.summary.total_hosts, 4);
        assert!(report.summary.reconstruction_threshold.is_some());
        assert!(config.out_json.exists());
        assert!(config.out_csv.exists());
    }

    #[test]
    fn test_broken_isolation_model_is_fatal() {
        let dir = tempdir().unwrap();
        let config = InferConfig {
            isolation_model: dir.path().join("missing.json"),
            ..workspace(dir.path())
        };

        assert!(infer(&config, false).is_err());
        assert!(no_reports(&config));

        fs::write(dir.path().join("corrupt.json"), "{ not json").unwrap();
        let config = InferConfig { isolation_model: dir.path().join("corrupt.json"), ..config };
        assert!(infer(&config, false).is_err());
        assert!(no_reports(&config));
    }

    #[test]
    fn test_broken_reconstruction_model_degrades() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("corrupt_auto.json"), "{ not json").unwrap();
        let config = InferConfig {
            reconstruction_model: dir.path().join("corrupt_auto.json"),
            ..workspace(dir.path())
        };

        let report = infer(&config, false).unwrap();
        assert!(report.summary.reconstruction_threshold.is_none());
        assert!(report.results.iter().all(|r| r.reconstruction.is_none()));

        let csv = fs::read_to_string(&config.out_csv).unwrap();
        for line in csv.lines().skip(1) {
            let cells: Vec<&str> = line.split(',').collect();
            assert_eq!(cells[3], "");
            assert_eq!(cells[4], "");
        }
    }

    #[test]
    fn test_unconfirmed_live_refused_before_models_load() {
        let dir = tempdir().unwrap();
        let config = InferConfig {
            action: ActionMode::Live,
            isolation_model: dir.path().join("missing.json"),
            ..workspace(dir.path())
        };

        let err = infer(&config, false).unwrap_err();
        assert!(matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::LiveNotConfirmed)));
        assert!(no_reports(&config));
    }
}
