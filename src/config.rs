//! Detector configuration. Every scoring constant lives here so deployments can
//! retune weights and cut-points without a rebuild.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Fusion weights, verdict threshold and band cut-points
    pub fusion: FusionConfig,
    /// Rule table for the behavioural scorer
    pub behavioral: BehavioralConfig,
    /// Static classifier artifact
    pub static_model: StaticModelConfig,
    /// Scan history
    pub storage: StorageConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub static_weight: f64,
    pub behavioral_weight: f64,
    /// Fused probability at or above this is `Malicious`
    pub verdict_threshold: f64,
    /// Fused probability below this is banded `Safe`
    pub safe_max: f64,
    /// Fused probability above this is banded `High Risk`
    pub caution_max: f64,
    /// Upper bound on merged reasons
    pub max_reasons: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehavioralConfig {
    /// Per-row score at or above this is predicted malicious
    pub threshold: f64,
    pub file_activity: RuleConfig,
    pub network_activity: RuleConfig,
    pub process_activity: RuleConfig,
}

/// A rule fires when the raw count exceeds `count_trigger` or the ratio
/// exceeds `ratio_trigger`; it then adds `weight` to the row score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RuleConfig {
    pub count_trigger: u64,
    pub ratio_trigger: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticModelConfig {
    /// ONNX export of the tuned gradient-boosted classifier
    pub model_path: PathBuf,
    /// JSON with `feature_names` and `feature_importances`
    pub features_path: PathBuf,
    /// JSON with `best_threshold` (or `threshold`)
    pub threshold_path: PathBuf,
    /// Used when the threshold file is absent or unreadable
    pub default_threshold: f64,
    /// Features ranked by importance before explanation
    pub top_features: usize,
    /// Of the ranked features, how many are turned into reasons
    pub explained_features: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub enabled: bool,
    /// Data directory (scan history database)
    pub data_dir: PathBuf,
    /// Environment variable holding the store secret
    pub secret_env: String,
    /// Rows returned by `history` when no limit is given
    pub history_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            fusion: FusionConfig::default(),
            behavioral: BehavioralConfig::default(),
            static_model: StaticModelConfig::default(),
            storage: StorageConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            static_weight: 0.6,
            behavioral_weight: 0.4,
            verdict_threshold: 0.50,
            safe_max: 0.30,
            caution_max: 0.70,
            max_reasons: 3,
        }
    }
}

impl Default for BehavioralConfig {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            file_activity: RuleConfig {
                count_trigger: 1000,
                ratio_trigger: 0.5,
                weight: 0.6,
            },
            network_activity: RuleConfig {
                count_trigger: 5,
                ratio_trigger: 0.02,
                weight: 0.2,
            },
            process_activity: RuleConfig {
                count_trigger: 10,
                ratio_trigger: 0.02,
                weight: 0.2,
            },
        }
    }
}

impl Default for StaticModelConfig {
    fn default() -> Self {
        let dir = PathBuf::from("models").join("optimized");
        Self {
            model_path: dir.join("static_model.onnx"),
            features_path: dir.join("static_features.json"),
            threshold_path: dir.join("static_threshold.json"),
            default_threshold: 0.5,
            top_features: 5,
            explained_features: 3,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .map(|d| d.join("ransom-fusion"))
            .unwrap_or_else(|| PathBuf::from(".ransom-fusion"));
        Self {
            enabled: true,
            data_dir,
            secret_env: "RANSOM_FUSION_STORE_SECRET".to_string(),
            history_limit: 20,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl DetectorConfig {
    /// Load from JSON file if present; otherwise return default
    pub fn load(path: &std::path::Path) -> Self {
        if path.exists() {
            if let Ok(data) = std::fs::read_to_string(path) {
                if let Ok(c) = serde_json::from_str::<DetectorConfig>(&data) {
                    return c;
                }
            }
        }
        Self::default()
    }
}
