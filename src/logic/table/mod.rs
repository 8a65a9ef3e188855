//! Feature Table - one row per host, numeric feature columns
//!
//! The aggregation step that produces the CSV lives outside this crate.
//! Here we only load it, validate it and hand out model-ready matrices.

pub mod loader;

use std::path::PathBuf;

use ndarray::{Array2, ArrayView1, ArrayView2};
use thiserror::Error;

pub use loader::load;

// ============================================================================
// ERRORS
// ============================================================================

/// All of these abort the run before any report is written.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("feature table not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read feature table {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("feature table must contain a 'src_ip' (or 'src') column, found: {columns:?}")]
    MissingHostColumn { columns: Vec<String> },

    #[error("no numeric feature columns found in feature table")]
    NoNumericFeatures,

    #[error("feature table has no rows")]
    Empty,

    #[error("duplicate host '{host_id}' at row {row} (first seen at row {first_row})")]
    DuplicateHost {
        host_id: String,
        first_row: usize,
        row: usize,
    },

    #[error("feature table shape mismatch: {0}")]
    Shape(String),
}

/// Missing input column when projecting onto an artifact's feature list
#[derive(Debug, Error)]
#[error("feature '{0}' is not present in the feature table")]
pub struct MissingFeature(pub String);

// ============================================================================
// FEATURE TABLE
// ============================================================================

/// Static, immutable host x feature matrix.
///
/// Row `i` of `values` belongs to `host_ids[i]`; every downstream vector is
/// aligned by position, never by key.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    host_ids: Vec<String>,
    feature_names: Vec<String>,
    values: Array2<f64>,
}

impl FeatureTable {
    /// Build a table from already-cleaned parts.
    ///
    /// Non-finite cells are zeroed, duplicate host ids are rejected.
    pub fn new(
        host_ids: Vec<String>,
        feature_names: Vec<String>,
        mut values: Array2<f64>,
    ) -> Result<Self, TableError> {
        if feature_names.is_empty() {
            return Err(TableError::NoNumericFeatures);
        }
        if host_ids.is_empty() {
            return Err(TableError::Empty);
        }
        if values.dim() != (host_ids.len(), feature_names.len()) {
            return Err(TableError::Shape(format!(
                "{} hosts x {} features but values are {:?}",
                host_ids.len(),
                feature_names.len(),
                values.dim()
            )));
        }

        let mut seen = std::collections::HashMap::with_capacity(host_ids.len());
        for (row, host_id) in host_ids.iter().enumerate() {
            if let Some(first_row) = seen.insert(host_id.as_str(), row) {
                return Err(TableError::DuplicateHost {
                    host_id: host_id.clone(),
                    first_row,
                    row,
                });
            }
        }

        values.mapv_inplace(|v| if v.is_finite() { v } else { 0.0 });

        Ok(Self { host_ids, feature_names, values })
    }

    pub fn len(&self) -> usize {
        self.host_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.host_ids.is_empty()
    }

    pub fn host_ids(&self) -> &[String] {
        &self.host_ids
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.values.row(index)
    }

    /// Project onto `names` in the given order. `None` keeps every column.
    pub fn select(
        &self,
        names: Option<&[String]>,
    ) -> Result<(Vec<String>, Array2<f64>), MissingFeature> {
        let Some(names) = names else {
            return Ok((self.feature_names.clone(), self.values.clone()));
        };

        let mut indices = Vec::with_capacity(names.len());
        for name in names {
            let idx = self
                .feature_names
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| MissingFeature(name.clone()))?;
            indices.push(idx);
        }

        let projected = self.values.select(ndarray::Axis(1), &indices);
        Ok((names.to_vec(), projected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn hosts(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_non_finite_cells_become_zero() {
        let table = FeatureTable::new(
            hosts(&["10.0.0.1", "10.0.0.2"]),
            hosts(&["a", "b"]),
            array![[f64::NAN, 1.0], [f64::INFINITY, 2.0]],
        )
        .unwrap();

        assert_eq!(table.row(0).to_vec(), vec![0.0, 1.0]);
        assert_eq!(table.row(1).to_vec(), vec![0.0, 2.0]);
    }

    #[test]
    fn test_duplicate_host_rejected() {
        let err = FeatureTable::new(
            hosts(&["10.0.0.1", "10.0.0.2", "10.0.0.1"]),
            hosts(&["a"]),
            array![[1.0], [2.0], [3.0]],
        )
        .unwrap_err();

        match err {
            TableError::DuplicateHost { host_id, first_row, row } => {
                assert_eq!(host_id, "10.0.0.1");
                assert_eq!(first_row, 0);
                assert_eq!(row, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_select_reorders_columns() {
        let table = FeatureTable::new(
            hosts(&["h1"]),
            hosts(&["a", "b", "c"]),
            array![[1.0, 2.0, 3.0]],
        )
        .unwrap();

        let (names, values) = table.select(Some(&hosts(&["c", "a"]))).unwrap();
        assert_eq!(names, hosts(&["c", "a"]));
        assert_eq!(values, array![[3.0, 1.0]]);

        let missing = table.select(Some(&hosts(&["zzz"]))).unwrap_err();
        assert_eq!(missing.0, "zzz");
    }
}
