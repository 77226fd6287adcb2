//! ONNX Runtime inference for the static classifier. Input: [rows, n_features] f32,
//! output: probability tensor, either [rows, 2] (positive class in column 1) or [rows].

use super::Classifier;
use crate::error::ComponentError;
use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::Path;

/// Output names emitted by common gradient-boosting ONNX converters.
const PROBABILITY_OUTPUTS: [&str; 2] = ["probabilities", "output_probability"];

pub struct OnnxClassifier {
    session: Mutex<Session>,
    output_name: String,
}

impl OnnxClassifier {
    pub fn load(path: &Path) -> Result<Self, ComponentError> {
        if !path.exists() {
            return Err(ComponentError::ModelUnavailable(format!(
                "static model not found at {}",
                path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e| ComponentError::ModelUnavailable(format!("session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ComponentError::ModelUnavailable(format!("optimization: {e}")))?
            .commit_from_file(path)
            .map_err(|e| ComponentError::ModelUnavailable(format!("load model: {e}")))?;

        let output_name = session
            .outputs
            .iter()
            .find(|o| PROBABILITY_OUTPUTS.contains(&o.name.as_str()))
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .ok_or_else(|| ComponentError::ModelUnavailable("model has no outputs".to_string()))?;

        tracing::info!(path = %path.display(), output = %output_name, "static ONNX model loaded");
        Ok(Self {
            session: Mutex::new(session),
            output_name,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn predict_proba(&self, rows: &Array2<f32>) -> Result<Vec<f64>, ComponentError> {
        let n_rows = rows.nrows();
        let input = Tensor::from_array(rows.clone())
            .map_err(|e| ComponentError::Inference(format!("tensor: {e}")))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| ComponentError::Inference(e.to_string()))?;
        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| ComponentError::Inference(format!("missing output {}", self.output_name)))?;
        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| ComponentError::Inference(format!("extract: {e}")))?;

        let dims: Vec<i64> = shape.iter().copied().collect();
        let probs: Vec<f64> = match dims.as_slice() {
            [n, 2] if *n as usize == n_rows => data.chunks(2).map(|c| f64::from(c[1])).collect(),
            [n] | [n, 1] if *n as usize == n_rows => data.iter().map(|&p| f64::from(p)).collect(),
            other => {
                return Err(ComponentError::InvalidOutput(format!(
                    "unexpected output shape {other:?} for {n_rows} rows"
                )))
            }
        };
        Ok(probs)
    }
}
