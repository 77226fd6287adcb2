//! Output contract shared by the static and behavioural scorers.

use crate::error::ComponentError;
use serde::{Deserialize, Serialize};

/// Per-row probabilities, their thresholded predictions and an ordered
/// explanation list (most relevant first).
///
/// Deserialising goes through [`ScoreResult::from_probabilities`]: supplied
/// predictions are ignored and recomputed from the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawScoreResult")]
pub struct ScoreResult {
    probabilities: Vec<f64>,
    predictions: Vec<u8>,
    threshold: f64,
    reasons: Vec<String>,
}

#[derive(Deserialize)]
struct RawScoreResult {
    probabilities: Vec<f64>,
    threshold: f64,
    #[serde(default)]
    reasons: Vec<String>,
}

impl TryFrom<RawScoreResult> for ScoreResult {
    type Error = ComponentError;

    fn try_from(raw: RawScoreResult) -> Result<Self, Self::Error> {
        Self::from_probabilities(raw.probabilities, raw.threshold, raw.reasons)
    }
}

/// What a scorer produced for one scan: a result, or why it has none.
pub type ComponentOutcome = Result<ScoreResult, ComponentError>;

impl ScoreResult {
    /// Build a result, deriving `predictions[i] = probabilities[i] >= threshold`.
    ///
    /// Rejects empty input and probabilities that are non-finite or outside
    /// `[0, 1]`, so a fused mean is always defined for a successful scorer.
    pub fn from_probabilities(
        probabilities: Vec<f64>,
        threshold: f64,
        reasons: Vec<String>,
    ) -> Result<Self, ComponentError> {
        if probabilities.is_empty() {
            return Err(ComponentError::InvalidOutput(
                "scorer returned no probabilities".to_string(),
            ));
        }
        if let Some((i, p)) = probabilities
            .iter()
            .enumerate()
            .find(|(_, p)| !p.is_finite() || **p < 0.0 || **p > 1.0)
        {
            return Err(ComponentError::InvalidOutput(format!(
                "probability {p} at row {i} is outside [0, 1]"
            )));
        }
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(ComponentError::InvalidOutput(format!(
                "threshold {threshold} is outside [0, 1]"
            )));
        }
        Ok(Self::from_clamped(probabilities, threshold, reasons))
    }

    /// For scorers whose outputs are clamped to `[0, 1]` by construction.
    pub(crate) fn from_clamped(probabilities: Vec<f64>, threshold: f64, reasons: Vec<String>) -> Self {
        let predictions = probabilities
            .iter()
            .map(|&p| u8::from(p >= threshold))
            .collect();
        Self {
            probabilities,
            predictions,
            threshold,
            reasons,
        }
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    pub fn predictions(&self) -> &[u8] {
        &self.predictions
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    /// Row-wise mean; the per-scan probability this scorer contributes to fusion.
    pub fn mean_probability(&self) -> f64 {
        self.probabilities.iter().sum::<f64>() / self.probabilities.len() as f64
    }
}
