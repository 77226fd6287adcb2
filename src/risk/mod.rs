//! Score contracts and the fusion engine.

mod engine;
mod score;

pub use engine::{Component, ComponentScore, FusionEngine, FusionResult, RiskBand, Verdict};
pub use score::{ComponentOutcome, ScoreResult};
