//! ONNX Autoencoder - ONNX Runtime Integration
//!
//! Autoencoders exported to ONNX take a `[rows, features]` f32 tensor and
//! return a tensor of the same shape.

use std::path::Path;

use ndarray::{Array2, ArrayView2};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;

use super::inference::{Reconstruction, Reconstructor, ScoringError};

pub struct OnnxAutoencoder {
    name: String,
    // `Session::run` needs `&mut`, scoring only has `&self`
    session: Mutex<Session>,
    output_name: String,
    threshold: Option<f64>,
}

impl OnnxAutoencoder {
    pub fn load(name: impl Into<String>, model_path: &Path) -> Result<Self, ScoringError> {
        let session = Session::builder()
            .map_err(|e| ScoringError::Backend(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ScoringError::Backend(format!("Failed to set optimization: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| ScoringError::Backend(format!("Failed to load model: {}", e)))?;

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| ScoringError::Backend("No output defined".to_string()))?;

        Ok(Self {
            name: name.into(),
            session: Mutex::new(session),
            output_name,
            threshold: None,
        })
    }

    pub fn set_threshold_if_missing(&mut self, threshold: Option<f64>) {
        if self.threshold.is_none() {
            self.threshold = threshold;
        }
    }
}

impl Reconstructor for OnnxAutoencoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    fn reconstruct(&self, inputs: ArrayView2<'_, f64>) -> Result<Reconstruction, ScoringError> {
        let (rows, cols) = inputs.dim();
        let input_array = inputs.mapv(|v| v as f32);

        let input_tensor = Value::from_array(input_array)
            .map_err(|e| ScoringError::Backend(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| ScoringError::Backend(format!("Inference failed: {}", e)))?;

        let output = outputs
            .get(&self.output_name)
            .ok_or_else(|| ScoringError::Backend("No output".to_string()))?;

        let output_tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| ScoringError::Backend(format!("Extract error: {}", e)))?;

        let data = output_tensor.1;
        if data.len() != rows * cols {
            return Err(ScoringError::Backend(format!(
                "expected {} output values, got {}",
                rows * cols,
                data.len()
            )));
        }

        let output = Array2::from_shape_vec((rows, cols), data.iter().map(|&v| v as f64).collect())
            .map_err(|e| ScoringError::Backend(format!("Array error: {}", e)))?;

        Reconstruction::new(inputs.to_owned(), output)
    }
}
