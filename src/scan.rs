//! Scan orchestration: run each scorer independently, fuse, report, persist.

use crate::config::DetectorConfig;
use crate::error::{ComponentError, ScanError};
use crate::features::{BehavioralRow, FeatureTable};
use crate::model::{BehavioralScorer, StaticScorer};
use crate::report::{ScanReport, SourceType};
use crate::risk::{ComponentOutcome, FusionEngine, FusionResult};
use crate::storage::{ScanRecord, ScanStore};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, warn};

pub const STATIC_ONLY_NOTE: &str = "No behavioural data for EXE scan (static-only).";
pub const BEHAVIORAL_ONLY_NOTE: &str = "No static features supplied (behavioural-only).";

/// Uploaded input as received: display name plus raw bytes.
pub struct ScanInput<'a> {
    pub filename: &'a str,
    pub bytes: &'a [u8],
}

pub struct Scanner {
    static_scorer: Arc<StaticScorer>,
    behavioral: BehavioralScorer,
    fusion: FusionEngine,
    store: Option<Arc<ScanStore>>,
}

impl Scanner {
    pub fn new(config: &DetectorConfig, static_scorer: Arc<StaticScorer>) -> Self {
        Self {
            static_scorer,
            behavioral: BehavioralScorer::new(config.behavioral.clone()),
            fusion: FusionEngine::new(config.fusion.clone()),
            store: None,
        }
    }

    pub fn with_store(mut self, store: Arc<ScanStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Both scorers over the same uploaded table.
    pub fn scan_combined(&self, input: &ScanInput<'_>) -> Result<ScanReport, ScanError> {
        let table = parse_table(input)?;
        let behavioral_outcome: ComponentOutcome = Ok(self.behavioral.score(&table.behavioral_rows()));
        let static_outcome = self.static_scorer.score(&table);
        self.finish(input, SourceType::Combined, &static_outcome, &behavioral_outcome)
    }

    /// Static features only (e.g. extracted from a PE executable).
    pub fn scan_static(&self, input: &ScanInput<'_>) -> Result<ScanReport, ScanError> {
        let table = parse_table(input)?;
        let static_outcome = self.static_scorer.score(&table);
        let behavioral_outcome: ComponentOutcome =
            Err(ComponentError::NotSupplied(STATIC_ONLY_NOTE.to_string()));
        self.finish(input, SourceType::ExeStatic, &static_outcome, &behavioral_outcome)
    }

    /// Aggregated behavioural table only.
    pub fn scan_behavioral(&self, input: &ScanInput<'_>) -> Result<ScanReport, ScanError> {
        let table = parse_table(input)?;
        self.scan_behavioral_rows(input, &table.behavioral_rows())
    }

    pub fn scan_behavioral_rows(
        &self,
        input: &ScanInput<'_>,
        rows: &[BehavioralRow],
    ) -> Result<ScanReport, ScanError> {
        let behavioral_outcome: ComponentOutcome = Ok(self.behavioral.score(rows));
        let static_outcome: ComponentOutcome =
            Err(ComponentError::NotSupplied(BEHAVIORAL_ONLY_NOTE.to_string()));
        self.finish(input, SourceType::BehaviouralCsv, &static_outcome, &behavioral_outcome)
    }

    fn finish(
        &self,
        input: &ScanInput<'_>,
        source: SourceType,
        static_outcome: &ComponentOutcome,
        behavioral_outcome: &ComponentOutcome,
    ) -> Result<ScanReport, ScanError> {
        for (name, outcome) in [("static", static_outcome), ("behavioral", behavioral_outcome)] {
            match outcome {
                Err(ComponentError::NotSupplied(_)) | Ok(_) => {}
                Err(e) => warn!(component = name, error = %e, filename = input.filename, "scorer unavailable"),
            }
        }

        let fused: FusionResult = self.fusion.fuse(static_outcome, behavioral_outcome)?;
        let report = ScanReport::new(
            input.filename,
            source,
            fused,
            self.fusion.config(),
            Some(sha256_hex(input.bytes)),
        );
        info!(
            scan_id = %report.id,
            filename = %report.filename,
            source = source.as_str(),
            probability = report.final_prob,
            verdict = report.verdict.as_str(),
            risk_band = report.risk_band.as_str(),
            "scan complete"
        );
        self.persist(&report);
        Ok(report)
    }

    /// History is best-effort; a failed write never fails the scan.
    fn persist(&self, report: &ScanReport) {
        let Some(ref store) = self.store else {
            return;
        };
        let record = ScanRecord {
            id: report.id.clone(),
            ts: chrono::Utc::now().timestamp_millis(),
            filename: report.filename.clone(),
            verdict: report.verdict.as_str().to_string(),
            probability: report.final_prob,
            risk_band: report.risk_band.as_str().to_string(),
            source_type: report.source_type.as_str().to_string(),
            detail: serde_json::json!({
                "reasons": report.reasons,
                "components": report.components,
                "sha256": report.sha256,
            }),
        };
        if let Err(e) = store.insert_scan(&record) {
            warn!(scan_id = %report.id, error = %e, "scan history insert failed");
        }
    }
}

fn parse_table(input: &ScanInput<'_>) -> Result<FeatureTable, ScanError> {
    if input.bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(ScanError::EmptyInput(format!(
            "{} is empty; upload a CSV with extracted features",
            input.filename
        )));
    }
    FeatureTable::from_reader(input.bytes)
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
