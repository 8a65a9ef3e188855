//! Standard scaler parameters exported alongside a model

use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// `(x - mean) / scale`, per feature, as fitted during training
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn width(&self) -> usize {
        self.mean.len()
    }

    pub fn is_consistent(&self) -> bool {
        self.mean.len() == self.scale.len()
    }

    /// Zero scale (constant feature during training) divides by 1 instead.
    pub fn transform(&self, inputs: ArrayView2<'_, f64>) -> Array2<f64> {
        let mean = Array1::from(self.mean.clone());
        let scale = Array1::from(
            self.scale
                .iter()
                .map(|&s| if s == 0.0 { 1.0 } else { s })
                .collect::<Vec<_>>(),
        );
        (&inputs - &mean) / &scale
    }
}

/// Apply an optional scaler, copying the inputs either way
pub(crate) fn prepare(scaler: Option<&StandardScaler>, inputs: ArrayView2<'_, f64>) -> Array2<f64> {
    match scaler {
        Some(s) => s.transform(inputs),
        None => inputs.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_transform() {
        let scaler = StandardScaler { mean: vec![1.0, 10.0], scale: vec![2.0, 0.0] };
        let out = scaler.transform(array![[3.0, 12.0], [1.0, 10.0]].view());
        assert_eq!(out, array![[1.0, 2.0], [0.0, 0.0]]);
    }
}
