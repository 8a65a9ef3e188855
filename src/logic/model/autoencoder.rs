//! Dense Autoencoder scorer
//!
//! Plain feed-forward evaluation of exported dense layers. Kernels are stored
//! `[input][output]`, the same orientation the training framework saves.

use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use super::inference::{check_width, Reconstruction, Reconstructor, ScoringError};
use super::scaler::{self, StandardScaler};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Linear,
    Relu,
    Sigmoid,
    Tanh,
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Tanh => x.tanh(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    pub activation: Activation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoencoderArtifact {
    pub layers: Vec<DenseLayer>,
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
struct Layer {
    weights: Array2<f64>,
    bias: Array1<f64>,
    activation: Activation,
}

#[derive(Debug, Clone)]
pub struct DenseAutoencoder {
    name: String,
    layers: Vec<Layer>,
    input_dim: usize,
    threshold: Option<f64>,
    feature_names: Option<Vec<String>>,
    scaler: Option<StandardScaler>,
}

impl DenseAutoencoder {
    pub fn new(name: impl Into<String>, artifact: AutoencoderArtifact) -> Result<Self, String> {
        let input_dim = artifact
            .layers
            .first()
            .map(|l| l.weights.len())
            .ok_or_else(|| "autoencoder has no layers".to_string())?;

        let mut layers = Vec::with_capacity(artifact.layers.len());
        let mut width = input_dim;
        for (i, layer) in artifact.layers.into_iter().enumerate() {
            if layer.weights.len() != width {
                return Err(format!("layer {} expects {} inputs, previous width is {}", i, layer.weights.len(), width));
            }
            let out = layer.bias.len();
            if out == 0 || layer.weights.iter().any(|row| row.len() != out) {
                return Err(format!("layer {} kernel does not match its bias", i));
            }
            let flat: Vec<f64> = layer.weights.into_iter().flatten().collect();
            let weights = Array2::from_shape_vec((width, out), flat)
                .map_err(|e| format!("layer {}: {}", i, e))?;
            layers.push(Layer { weights, bias: Array1::from(layer.bias), activation: layer.activation });
            width = out;
        }

        if width != input_dim {
            return Err(format!("output width {} does not match input width {}", width, input_dim));
        }
        if let Some(names) = &artifact.feature_names {
            if names.len() != input_dim {
                return Err(format!("feature_names has {} entries, model takes {}", names.len(), input_dim));
            }
        }
        if let Some(s) = &artifact.scaler {
            if !s.is_consistent() || s.width() != input_dim {
                return Err("scaler does not match model input".to_string());
            }
        }

        Ok(Self {
            name: name.into(),
            layers,
            input_dim,
            threshold: artifact.threshold,
            feature_names: artifact.feature_names,
            scaler: artifact.scaler,
        })
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Fill in a threshold supplied out of band (e.g. a training report)
    pub fn set_threshold_if_missing(&mut self, threshold: Option<f64>) {
        if self.threshold.is_none() {
            self.threshold = threshold;
        }
    }

    fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        self.layers.iter().fold(x.clone(), |acc, layer| {
            let z = acc.dot(&layer.weights) + &layer.bias;
            z.mapv(|v| layer.activation.apply(v))
        })
    }
}

impl Reconstructor for DenseAutoencoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    fn reconstruct(&self, inputs: ArrayView2<'_, f64>) -> Result<Reconstruction, ScoringError> {
        check_width(self.input_dim, &inputs)?;
        let x = scaler::prepare(self.scaler.as_ref(), inputs);
        let output = self.forward(&x);
        Reconstruction::new(x, output)
    }
}
