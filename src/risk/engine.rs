//! Fuses the static and behavioural scores into one verdict, risk band and
//! bounded reason list.

use super::score::{ComponentOutcome, ScoreResult};
use crate::config::FusionConfig;
use crate::error::FusionError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Malicious,
    Safe,
}

impl Verdict {
    pub fn from_probability(p: f64, config: &FusionConfig) -> Self {
        if p >= config.verdict_threshold {
            Verdict::Malicious
        } else {
            Verdict::Safe
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Malicious => "Malicious",
            Verdict::Safe => "Safe",
        }
    }
}

/// Three-level communication label. Cut-points are independent of the verdict
/// threshold, so a `Malicious` verdict may still be banded `Caution`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskBand {
    Safe,
    Caution,
    #[serde(rename = "High Risk")]
    HighRisk,
}

impl RiskBand {
    pub fn from_probability(p: f64, config: &FusionConfig) -> Self {
        if p < config.safe_max {
            RiskBand::Safe
        } else if p <= config.caution_max {
            RiskBand::Caution
        } else {
            RiskBand::HighRisk
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskBand::Safe => "Safe",
            RiskBand::Caution => "Caution",
            RiskBand::HighRisk => "High Risk",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Static,
    Behavioral,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Static => "static",
            Component::Behavioral => "behavioral",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComponentScore {
    Scored { mean_probability: f64, threshold: f64 },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionResult {
    pub final_probability: f64,
    pub verdict: Verdict,
    pub risk_band: RiskBand,
    pub reasons: Vec<String>,
    pub component_scores: BTreeMap<Component, ComponentScore>,
}

pub struct FusionEngine {
    config: FusionConfig,
}

impl FusionEngine {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    /// Combine both scorer outcomes. Fails only when neither scorer produced
    /// a result; a single surviving scorer is used as-is.
    pub fn fuse(
        &self,
        static_outcome: &ComponentOutcome,
        behavioral_outcome: &ComponentOutcome,
    ) -> Result<FusionResult, FusionError> {
        let static_mean = static_outcome.as_ref().ok().map(ScoreResult::mean_probability);
        let behav_mean = behavioral_outcome
            .as_ref()
            .ok()
            .map(ScoreResult::mean_probability);

        let final_probability = match (static_mean, behav_mean) {
            (Some(s), Some(b)) => {
                self.config.static_weight * s + self.config.behavioral_weight * b
            }
            (Some(s), None) => s,
            (None, Some(b)) => b,
            (None, None) => {
                return Err(FusionError::BothComponentsUnavailable {
                    static_error: error_string(static_outcome),
                    behavioral_error: error_string(behavioral_outcome),
                })
            }
        };
        let final_probability = final_probability.clamp(0.0, 1.0);

        let mut component_scores = BTreeMap::new();
        component_scores.insert(Component::Static, component_score(static_outcome));
        component_scores.insert(Component::Behavioral, component_score(behavioral_outcome));

        Ok(FusionResult {
            final_probability,
            verdict: Verdict::from_probability(final_probability, &self.config),
            risk_band: RiskBand::from_probability(final_probability, &self.config),
            reasons: self.merge_reasons(static_outcome, behavioral_outcome),
            component_scores,
        })
    }

    /// Behavioural reasons first, then static; exact duplicates dropped,
    /// first occurrence kept, capped at `max_reasons`.
    fn merge_reasons(
        &self,
        static_outcome: &ComponentOutcome,
        behavioral_outcome: &ComponentOutcome,
    ) -> Vec<String> {
        let behavioral = behavioral_outcome.iter().flat_map(|r| r.reasons());
        let static_ = static_outcome.iter().flat_map(|r| r.reasons());

        let mut seen = HashSet::new();
        behavioral
            .chain(static_)
            .filter(|r| seen.insert(*r))
            .take(self.config.max_reasons)
            .cloned()
            .collect()
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }
}

fn component_score(outcome: &ComponentOutcome) -> ComponentScore {
    match outcome {
        Ok(r) => ComponentScore::Scored {
            mean_probability: r.mean_probability(),
            threshold: r.threshold(),
        },
        Err(e) => ComponentScore::Failed {
            error: e.to_string(),
        },
    }
}

fn error_string(outcome: &ComponentOutcome) -> String {
    match outcome {
        Ok(_) => String::new(),
        Err(e) => e.to_string(),
    }
}
