use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::types::{HostRecord, InferenceReport};
use super::ReportError;

/// Flat CSV view: scalars only, action reduced to a few marker columns
#[derive(Debug, Serialize)]
struct FlatRow<'a> {
    host_id: &'a str,
    isolation_score: f64,
    isolation_flag: u8,
    reconstruction_error: Option<f64>,
    reconstruction_flag: Option<u8>,
    combined_flag: u8,
    action_status: &'static str,
    action_command: Option<&'a str>,
    action_executed: bool,
    action_note: &'a str,
}

impl<'a> From<&'a HostRecord> for FlatRow<'a> {
    fn from(r: &'a HostRecord) -> Self {
        Self {
            host_id: &r.host_id,
            isolation_score: r.isolation.value,
            isolation_flag: r.isolation.flag as u8,
            reconstruction_error: r.reconstruction.map(|d| d.value),
            reconstruction_flag: r.reconstruction.map(|d| d.flag as u8),
            combined_flag: r.combined_flag as u8,
            action_status: r.action.status.as_str(),
            action_command: r.action.command.as_deref(),
            action_executed: r.action.executed,
            action_note: &r.action.note,
        }
    }
}

/// Pretty JSON `{summary, results}`
pub fn write_json(report: &InferenceReport, path: &Path) -> Result<(), ReportError> {
    write_atomically(path, |w| {
        serde_json::to_writer_pretty(&mut *w, report).map_err(|source| ReportError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        w.write_all(b"\n").map_err(|source| ReportError::Io { path: path.to_path_buf(), source })
    })
}

/// One row per host, same order as the results
pub fn write_csv(report: &InferenceReport, path: &Path) -> Result<(), ReportError> {
    write_atomically(path, |w| {
        let csv_err = |source| ReportError::Csv { path: path.to_path_buf(), source };

        let mut writer = csv::Writer::from_writer(w);
        for record in &report.results {
            writer.serialize(FlatRow::from(record)).map_err(csv_err)?;
        }
        writer.flush().map_err(|source| ReportError::Io { path: path.to_path_buf(), source })
    })
}

/// Load a detailed report written by `write_json`
pub fn read_json(path: &Path) -> Result<InferenceReport, ReportError> {
    if !path.exists() {
        return Err(ReportError::NotFound(path.to_path_buf()));
    }
    let bytes = fs::read(path).map_err(|source| ReportError::Io { path: path.to_path_buf(), source })?;
    serde_json::from_slice(&bytes).map_err(|source| ReportError::Json { path: path.to_path_buf(), source })
}

/// Write to `<path>.tmp`, then rename over `path`.
fn write_atomically<F>(path: &Path, write: F) -> Result<(), ReportError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), ReportError>,
{
    let io_err = |source: io::Error| ReportError::Io { path: path.to_path_buf(), source };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let tmp = tmp_path(path);
    let file = File::create(&tmp).map_err(io_err)?;
    let mut writer = BufWriter::new(file);

    let result = write(&mut writer).and_then(|_| writer.flush().map_err(io_err));
    drop(writer);

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    fs::rename(&tmp, path).map_err(io_err)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
