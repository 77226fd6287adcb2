//! Scorers: rule-based behavioural scorer and the pretrained static classifier.

mod behavioral;
pub mod explain;
mod onnx;
mod static_model;

pub use behavioral::{
    BehavioralScorer, REASON_FILE_ACTIVITY, REASON_NETWORK_ACTIVITY, REASON_NORMAL,
    REASON_NO_EVIDENCE, REASON_PROCESS_ACTIVITY,
};
pub use onnx::OnnxClassifier;
pub use static_model::{StaticArtifact, StaticScorer};

use crate::error::ComponentError;
use ndarray::Array2;

/// Probability of the positive (malicious) class for each input row.
pub trait Classifier: Send + Sync {
    fn predict_proba(&self, rows: &Array2<f32>) -> Result<Vec<f64>, ComponentError>;
}
