//! Ransomware detection by fusing a static (PE header) classifier score with a
//! rule-based behavioural (Sysmon) score.
//!
//! Modular structure:
//! - [`features`]: Uploaded tables, typed behavioural rows, Sysmon aggregation
//! - [`model`]: Behavioural rule scorer and static ONNX classifier
//! - [`risk`]: Score contract and fusion engine (verdict, risk band, reasons)
//! - [`scan`]: Scan orchestration over both scorers
//! - [`report`]: Scan report and text rendering
//! - [`storage`]: Encrypted scan history
//! - [`logging`]: Structured JSON logging

pub mod config;
pub mod error;
pub mod features;
pub mod logging;
pub mod model;
pub mod report;
pub mod risk;
pub mod scan;
pub mod storage;

pub use config::DetectorConfig;
pub use error::{ComponentError, FusionError, ScanError, StoreError};
pub use features::{BehavioralRow, FeatureTable};
pub use logging::StructuredLogger;
pub use model::{BehavioralScorer, Classifier, StaticArtifact, StaticScorer};
pub use report::ScanReport;
pub use risk::{FusionEngine, FusionResult, RiskBand, ScoreResult, Verdict};
pub use scan::Scanner;
pub use storage::ScanStore;
