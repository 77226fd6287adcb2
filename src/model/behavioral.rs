//! Rule-based behavioural scorer over aggregated Sysmon counts.

use crate::config::{BehavioralConfig, RuleConfig};
use crate::features::{BehavioralRow, ResolvedRow};
use crate::risk::ScoreResult;

pub const REASON_NO_EVIDENCE: &str = "No behavioural events available for analysis.";
pub const REASON_FILE_ACTIVITY: &str = "Unusually high proportion of file-creation events, \
     consistent with mass file modification or encryption behaviour.";
pub const REASON_NETWORK_ACTIVITY: &str = "Network connection events detected, suggesting \
     potential propagation or command-and-control communication.";
pub const REASON_PROCESS_ACTIVITY: &str = "Multiple process creation events observed, which may \
     indicate process spawning or code injection behaviour.";
pub const REASON_NORMAL: &str =
    "Behavioural activity appears within normal ranges typically observed in benign software.";

pub struct BehavioralScorer {
    config: BehavioralConfig,
}

impl BehavioralScorer {
    pub fn new(config: BehavioralConfig) -> Self {
        Self { config }
    }

    /// Score every row. Predictions cover all rows; reasons describe row 0 only,
    /// keeping one short explanation list per scan.
    pub fn score(&self, rows: &[BehavioralRow]) -> ScoreResult {
        let threshold = self.config.threshold;
        if rows.is_empty() {
            return self.result(vec![0.0], vec![REASON_NO_EVIDENCE.to_string()]);
        }

        let mut probabilities = Vec::with_capacity(rows.len());
        let mut first_reasons = Vec::new();
        for (i, row) in rows.iter().enumerate() {
            let (score, reasons) = self.score_row(&row.resolve());
            probabilities.push(score);
            if i == 0 {
                first_reasons = reasons;
            }
        }
        tracing::debug!(rows = rows.len(), threshold, "behavioural scoring complete");
        self.result(probabilities, first_reasons)
    }

    /// Additive rule checks, clamped to `[0, 1]`.
    pub fn score_row(&self, row: &ResolvedRow) -> (f64, Vec<String>) {
        let c = &self.config;
        let checks: [(&RuleConfig, u64, f64, &str); 3] = [
            (&c.file_activity, row.n_file_create, row.ratio_file_create, REASON_FILE_ACTIVITY),
            (&c.network_activity, row.n_net_conn, row.ratio_net_conn, REASON_NETWORK_ACTIVITY),
            (&c.process_activity, row.n_proc_create, row.ratio_proc_create, REASON_PROCESS_ACTIVITY),
        ];

        let mut score = 0.0;
        let mut reasons = Vec::new();
        for (rule, count, ratio, reason) in checks {
            if count > rule.count_trigger || ratio > rule.ratio_trigger {
                score += rule.weight;
                reasons.push(reason.to_string());
            }
        }
        if reasons.is_empty() {
            reasons.push(REASON_NORMAL.to_string());
        }
        (score.clamp(0.0, 1.0), reasons)
    }

    fn result(&self, probabilities: Vec<f64>, reasons: Vec<String>) -> ScoreResult {
        ScoreResult::from_clamped(probabilities, self.config.threshold.clamp(0.0, 1.0), reasons)
    }
}

impl Default for BehavioralScorer {
    fn default() -> Self {
        Self::new(BehavioralConfig::default())
    }
}
