//! CSV loader for the per-host feature table

use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use ndarray::Array2;

use super::{FeatureTable, TableError};
use crate::constants::{HOST_COLUMN, HOST_COLUMN_ALIAS};

/// Load the feature table from `path`.
pub fn load(path: &Path) -> Result<FeatureTable, TableError> {
    if !path.exists() {
        return Err(TableError::NotFound(path.to_path_buf()));
    }

    let read_err = |source| TableError::Read { path: path.to_path_buf(), source };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(read_err)?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(read_err)?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let records: Vec<StringRecord> = reader
        .records()
        .collect::<Result<_, _>>()
        .map_err(read_err)?;

    let table = from_records(&headers, &records)?;
    log::info!(
        "Loaded feature table {}: {} hosts x {} features",
        path.display(),
        table.len(),
        table.feature_names().len()
    );
    Ok(table)
}

/// Build a table from a header row and raw records.
pub(crate) fn from_records(
    headers: &[String],
    records: &[StringRecord],
) -> Result<FeatureTable, TableError> {
    let host_idx = headers
        .iter()
        .position(|h| h == HOST_COLUMN)
        .or_else(|| headers.iter().position(|h| h == HOST_COLUMN_ALIAS))
        .ok_or_else(|| TableError::MissingHostColumn { columns: headers.to_vec() })?;

    let numeric: Vec<usize> = (0..headers.len())
        .filter(|&col| col != host_idx)
        .filter(|&col| {
            let ok = records.iter().all(|r| parse_cell(r.get(col)).is_some());
            if !ok {
                log::warn!("Skipping non-numeric column '{}'", headers[col]);
            }
            ok
        })
        .collect();

    if numeric.is_empty() {
        return Err(TableError::NoNumericFeatures);
    }
    if records.is_empty() {
        return Err(TableError::Empty);
    }

    let feature_names = numeric.iter().map(|&c| headers[c].clone()).collect();
    let host_ids = records
        .iter()
        .map(|r| r.get(host_idx).unwrap_or_default().to_string())
        .collect();

    let values = Array2::from_shape_fn((records.len(), numeric.len()), |(row, j)| {
        parse_cell(records[row].get(numeric[j])).unwrap_or(0.0)
    });

    FeatureTable::new(host_ids, feature_names, values)
}

/// Markers read as a missing value, in addition to an empty cell
const MISSING_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Empty and missing cells count as numeric zero; NaN/inf are zeroed later.
fn parse_cell(cell: Option<&str>) -> Option<f64> {
    match cell {
        None | Some("") => Some(0.0),
        Some(s) if MISSING_MARKERS.contains(&s) => Some(0.0),
        Some(s) => s.parse::<f64>().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_csv(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("features.csv");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_numeric_columns_only() {
        let (_dir, path) = write_csv(
            "src_ip,pkt_count,proto_name,pkt_bytes\n\
             10.0.0.1,10,tcp,1500\n\
             10.0.0.2,,udp,NaN\n",
        );

        let table = load(&path).unwrap();
        assert_eq!(table.host_ids(), &["10.0.0.1".to_string(), "10.0.0.2".to_string()]);
        assert_eq!(table.feature_names(), &["pkt_count".to_string(), "pkt_bytes".to_string()]);
        assert_eq!(table.row(0).to_vec(), vec![10.0, 1500.0]);
        assert_eq!(table.row(1).to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_missing_markers_keep_column() {
        let (_dir, path) = write_csv(
            "src_ip,pkt_count,pkt_bytes\n\
             10.0.0.1,10,1500\n\
             10.0.0.2,NA,900\n\
             10.0.0.3,null,700\n\
             10.0.0.4,#N/A,None\n",
        );

        let table = load(&path).unwrap();
        assert_eq!(table.feature_names(), &["pkt_count".to_string(), "pkt_bytes".to_string()]);
        assert_eq!(table.row(1).to_vec(), vec![0.0, 900.0]);
        assert_eq!(table.row(2).to_vec(), vec![0.0, 700.0]);
        assert_eq!(table.row(3).to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_src_alias_accepted() {
        let (_dir, path) = write_csv("src,open_ports_count\n192.168.1.9,4\n");
        let table = load(&path).unwrap();
        assert_eq!(table.host_ids()[0], "192.168.1.9");
    }

    #[test]
    fn test_missing_host_column() {
        let (_dir, path) = write_csv("host,pkt_count\nh1,1\n");
        assert!(matches!(load(&path), Err(TableError::MissingHostColumn { .. })));
    }

    #[test]
    fn test_no_numeric_features() {
        let (_dir, path) = write_csv("src_ip,label\n10.0.0.1,normal\n");
        assert!(matches!(load(&path), Err(TableError::NoNumericFeatures)));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope.csv");
        assert!(matches!(load(&path), Err(TableError::NotFound(_))));
    }

    #[test]
    fn test_header_only_is_empty() {
        let (_dir, path) = write_csv("src_ip,pkt_count\n");
        assert!(matches!(load(&path), Err(TableError::Empty)));
    }
}
