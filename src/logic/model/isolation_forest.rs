//! Isolation Forest scorer
//!
//! Evaluates a forest exported from training as the flat per-tree node
//! arrays (`children_left`, `children_right`, `feature`, `threshold`,
//! `n_node_samples`). A leaf is any node whose left child is `-1`.
//!
//! Score = `2^(-E[h(x)] / c(max_samples))`, where `h` is the path length to
//! the leaf plus `c(n_leaf)`. That is the negated `score_samples` of the
//! usual definition, so larger already means more anomalous.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use super::inference::{check_width, AnomalyScorer, ScoringError};
use super::scaler::{self, StandardScaler};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

// ============================================================================
// ARTIFACT FORMAT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNodes {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub n_node_samples: Vec<u64>,

    /// Column subset this tree was grown on; `None` = all columns
    #[serde(default)]
    pub features: Option<Vec<usize>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForestArtifact {
    pub n_features: usize,
    pub max_samples: u64,
    pub trees: Vec<TreeNodes>,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
}

// ============================================================================
// MODEL
// ============================================================================

#[derive(Debug, Clone)]
pub struct IsolationForest {
    name: String,
    artifact: IsolationForestArtifact,
}

impl IsolationForest {
    /// Validate node arrays once so scoring can index without checks failing.
    pub fn new(name: impl Into<String>, artifact: IsolationForestArtifact) -> Result<Self, String> {
        if artifact.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        if let Some(names) = &artifact.feature_names {
            if names.len() != artifact.n_features {
                return Err(format!(
                    "feature_names has {} entries, n_features is {}",
                    names.len(),
                    artifact.n_features
                ));
            }
        }
        if let Some(s) = &artifact.scaler {
            if !s.is_consistent() || s.width() != artifact.n_features {
                return Err("scaler does not match n_features".to_string());
            }
        }

        for (t, tree) in artifact.trees.iter().enumerate() {
            let n = tree.children_left.len();
            if n == 0
                || tree.children_right.len() != n
                || tree.feature.len() != n
                || tree.threshold.len() != n
                || tree.n_node_samples.len() != n
            {
                return Err(format!("tree {} has inconsistent node arrays", t));
            }
            let width = tree.features.as_ref().map_or(artifact.n_features, |f| f.len());
            if let Some(cols) = &tree.features {
                if cols.iter().any(|&c| c >= artifact.n_features) {
                    return Err(format!("tree {} references a column out of range", t));
                }
            }
            for i in 0..n {
                let (l, r) = (tree.children_left[i], tree.children_right[i]);
                if l < 0 {
                    continue;
                }
                let in_range = |c: i64| c > i as i64 && (c as usize) < n;
                if !in_range(l) || !in_range(r) {
                    return Err(format!("tree {} node {} has invalid children", t, i));
                }
                if tree.feature[i] < 0 || tree.feature[i] as usize >= width {
                    return Err(format!("tree {} node {} splits on an unknown feature", t, i));
                }
            }
        }

        Ok(Self { name: name.into(), artifact })
    }

    pub fn n_trees(&self) -> usize {
        self.artifact.trees.len()
    }

    fn path_length(tree: &TreeNodes, row: &[f64]) -> f64 {
        let mut node = 0usize;
        let mut depth = 0.0;

        while tree.children_left[node] >= 0 {
            let col = tree.feature[node] as usize;
            let col = tree.features.as_ref().map_or(col, |f| f[col]);
            node = if row[col] <= tree.threshold[node] {
                tree.children_left[node] as usize
            } else {
                tree.children_right[node] as usize
            };
            depth += 1.0;
        }

        depth + average_path_length(tree.n_node_samples[node])
    }
}

impl AnomalyScorer for IsolationForest {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.artifact.feature_names.as_deref()
    }

    fn threshold(&self) -> Option<f64> {
        self.artifact.threshold
    }

    fn score(&self, inputs: ArrayView2<'_, f64>) -> Result<Vec<f64>, ScoringError> {
        check_width(self.artifact.n_features, &inputs)?;
        let x = scaler::prepare(self.artifact.scaler.as_ref(), inputs);

        let norm = average_path_length(self.artifact.max_samples);
        let n_trees = self.artifact.trees.len() as f64;

        let scores = x
            .rows()
            .into_iter()
            .map(|row| {
                let row = row.to_vec();
                let total: f64 = self
                    .artifact
                    .trees
                    .iter()
                    .map(|t| Self::path_length(t, &row))
                    .sum();
                let mean_depth = total / n_trees;
                if norm > 0.0 {
                    2f64.powf(-mean_depth / norm)
                } else {
                    // max_samples <= 1: every path has length zero
                    1.0
                }
            })
            .collect();

        Ok(scores)
    }
}

/// `c(n)`: average path length of an unsuccessful BST search over `n` points
pub fn average_path_length(n: u64) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}
