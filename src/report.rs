//! Scan report handed to consumers (CLI output, history, rendered summaries).

use crate::config::FusionConfig;
use crate::risk::{Component, ComponentScore, FusionResult, RiskBand, Verdict};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Combined,
    ExeStatic,
    BehaviouralCsv,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Combined => "combined",
            SourceType::ExeStatic => "exe_static",
            SourceType::BehaviouralCsv => "behavioural_csv",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionThresholds {
    pub safe_max: f64,
    pub caution_max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub id: String,
    pub status: String,
    pub filename: String,
    pub verdict: Verdict,
    pub final_prob: f64,
    pub decision_thresholds: DecisionThresholds,
    pub risk_band: RiskBand,
    pub timestamp: String,
    pub components: BTreeMap<Component, ComponentScore>,
    pub reasons: Vec<String>,
    pub source_type: SourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    pub summary: String,
    pub recommended_actions: Vec<String>,
}

impl ScanReport {
    pub fn new(
        filename: impl Into<String>,
        source_type: SourceType,
        fusion: FusionResult,
        config: &FusionConfig,
        sha256: Option<String>,
    ) -> Self {
        let summary = risk_summary(fusion.verdict, fusion.risk_band).to_string();
        let recommended_actions = recommended_actions(fusion.verdict, fusion.risk_band)
            .iter()
            .map(|a| a.to_string())
            .collect();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            status: "ok".to_string(),
            filename: filename.into(),
            verdict: fusion.verdict,
            final_prob: fusion.final_probability,
            decision_thresholds: DecisionThresholds {
                safe_max: config.safe_max,
                caution_max: config.caution_max,
            },
            risk_band: fusion.risk_band,
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            components: fusion.component_scores,
            reasons: fusion.reasons,
            source_type,
            sha256,
            summary,
            recommended_actions,
        }
    }

    /// Plain-text report; non-ASCII characters are replaced with `?`.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Ransomware Detection Report");
        let _ = writeln!(out, "Scan timestamp: {}", self.timestamp);
        let _ = writeln!(out, "File name: {}", self.filename);
        if let Some(ref h) = self.sha256 {
            let _ = writeln!(out, "SHA-256: {h}");
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Scan Summary");
        let _ = writeln!(out, "  Final verdict: {}", self.verdict.as_str());
        let _ = writeln!(out, "  Final probability (malicious): {:.3}", self.final_prob);
        let _ = writeln!(out, "  Risk band: {}", self.risk_band.as_str());
        let t = &self.decision_thresholds;
        let _ = writeln!(
            out,
            "  Decision thresholds: Safe < {:.2}, Caution <= {:.2}, High Risk > {:.2}",
            t.safe_max, t.caution_max, t.caution_max
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "Score Breakdown");
        for (component, score) in &self.components {
            let line = match score {
                ComponentScore::Scored {
                    mean_probability,
                    threshold,
                } => format!("{mean_probability:.3}  (threshold: {threshold:.3})"),
                ComponentScore::Failed { error } => format!("unavailable ({error})"),
            };
            let _ = writeln!(out, "  {} risk score: {line}", component.as_str());
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Risk Assessment Summary");
        let _ = writeln!(out, "  {}", self.summary);
        if !self.reasons.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Key Contributing Factors");
            for r in &self.reasons {
                let _ = writeln!(out, "  - {r}");
            }
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Recommended Actions");
        for a in &self.recommended_actions {
            let _ = writeln!(out, "  - {a}");
        }
        ascii_safe(&out)
    }
}

pub fn risk_summary(verdict: Verdict, band: RiskBand) -> &'static str {
    match (verdict, band) {
        (Verdict::Malicious, _) => {
            "The file shows strong indicators of ransomware-like behaviour based on its observed characteristics and risk scores."
        }
        (Verdict::Safe, RiskBand::Caution) => {
            "Some characteristics appear unusual and may require closer inspection before trusting the file fully."
        }
        (Verdict::Safe, RiskBand::Safe | RiskBand::HighRisk) => {
            "No significant indicators of ransomware were detected in this scan."
        }
    }
}

pub fn recommended_actions(verdict: Verdict, band: RiskBand) -> &'static [&'static str] {
    match (verdict, band) {
        (Verdict::Malicious, _) => &[
            "Immediately isolate the host from the network.",
            "Do not execute or open the file again.",
            "Run additional security scans and inspect logs.",
            "Preserve file and system state for investigation.",
        ],
        (Verdict::Safe, RiskBand::Caution) => &[
            "Avoid executing this file on critical systems.",
            "Scan the file using additional tools.",
            "Monitor the device for unusual behaviour.",
        ],
        (Verdict::Safe, RiskBand::Safe | RiskBand::HighRisk) => &[
            "No malicious indicators detected.",
            "Keep backups and maintain system updates.",
            "Re-scan if the file is modified or moved.",
        ],
    }
}

pub fn ascii_safe(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii() { c } else { '?' })
        .collect()
}
