//! Static (PE header) scorer: a pretrained classifier artifact loaded at most
//! once per process, plus importance-driven explanations.

use super::explain::{friendly_explanations, top_features};
use super::onnx::OnnxClassifier;
use super::Classifier;
use crate::config::StaticModelConfig;
use crate::error::ComponentError;
use crate::features::FeatureTable;
use crate::risk::ScoreResult;
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// Everything the static scorer needs, read-only once built.
pub struct StaticArtifact {
    classifier: Box<dyn Classifier>,
    feature_names: Vec<String>,
    importances: Vec<f64>,
    threshold: f64,
}

#[derive(Deserialize)]
struct FeatureMetadata {
    feature_names: Vec<String>,
    #[serde(default)]
    feature_importances: Vec<f64>,
}

#[derive(Deserialize)]
struct ThresholdFile {
    best_threshold: Option<f64>,
    threshold: Option<f64>,
}

impl StaticArtifact {
    pub fn new(
        classifier: Box<dyn Classifier>,
        feature_names: Vec<String>,
        importances: Vec<f64>,
        threshold: f64,
    ) -> Self {
        Self {
            classifier,
            feature_names,
            importances,
            threshold,
        }
    }

    /// Load model, feature metadata and tuned threshold from disk.
    pub fn load(config: &StaticModelConfig) -> Result<Self, ComponentError> {
        let meta = read_feature_metadata(&config.features_path)?;
        let threshold = read_threshold(&config.threshold_path).unwrap_or(config.default_threshold);
        let classifier = OnnxClassifier::load(&config.model_path)?;
        Ok(Self::new(
            Box::new(classifier),
            meta.feature_names,
            meta.feature_importances,
            threshold,
        ))
    }
}

fn read_feature_metadata(path: &Path) -> Result<FeatureMetadata, ComponentError> {
    let data = std::fs::read_to_string(path).map_err(|e| {
        ComponentError::ModelUnavailable(format!("feature list {}: {e}", path.display()))
    })?;
    let meta: FeatureMetadata = serde_json::from_str(&data).map_err(|e| {
        ComponentError::ModelUnavailable(format!("feature list {}: {e}", path.display()))
    })?;
    if meta.feature_names.is_empty() {
        return Err(ComponentError::ModelUnavailable(
            "feature list is empty".to_string(),
        ));
    }
    Ok(meta)
}

fn read_threshold(path: &Path) -> Option<f64> {
    let data = std::fs::read_to_string(path).ok()?;
    let t: ThresholdFile = serde_json::from_str(&data).ok()?;
    t.best_threshold
        .or(t.threshold)
        .filter(|v| v.is_finite() && (0.0..=1.0).contains(v))
}

/// Shared handle over the static artifact. Cheap to share behind `Arc`;
/// the first successful load is kept, a failed load is retried on next use.
pub struct StaticScorer {
    config: StaticModelConfig,
    artifact: OnceCell<Arc<StaticArtifact>>,
}

impl StaticScorer {
    pub fn new(config: StaticModelConfig) -> Self {
        Self {
            config,
            artifact: OnceCell::new(),
        }
    }

    /// Scorer with an already-built artifact (no disk access).
    pub fn with_artifact(config: StaticModelConfig, artifact: StaticArtifact) -> Self {
        Self {
            config,
            artifact: OnceCell::with_value(Arc::new(artifact)),
        }
    }

    /// Load the artifact now instead of on first scan.
    pub fn preload(&self) -> Result<Arc<StaticArtifact>, ComponentError> {
        self.artifact
            .get_or_try_init(|| StaticArtifact::load(&self.config).map(Arc::new))
            .cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.artifact.get().is_some()
    }

    pub fn score(&self, table: &FeatureTable) -> Result<ScoreResult, ComponentError> {
        let artifact = self.preload()?;
        if table.is_empty() {
            return Err(ComponentError::InvalidOutput(
                "no rows to score".to_string(),
            ));
        }

        let x = table.project(&artifact.feature_names)?;
        let probabilities = artifact.classifier.predict_proba(&x)?;
        if probabilities.len() != table.len() {
            return Err(ComponentError::InvalidOutput(format!(
                "classifier returned {} probabilities for {} rows",
                probabilities.len(),
                table.len()
            )));
        }

        let top = top_features(
            &artifact.feature_names,
            &artifact.importances,
            self.config.top_features,
        );
        let explained = &top[..top.len().min(self.config.explained_features)];
        let reasons = friendly_explanations(explained);

        tracing::debug!(
            rows = table.len(),
            threshold = artifact.threshold,
            "static scoring complete"
        );
        ScoreResult::from_probabilities(probabilities, artifact.threshold, reasons)
    }
}
