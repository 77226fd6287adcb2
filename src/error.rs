//! Error types for scoring, fusion, persistence and scan orchestration.

use thiserror::Error;

/// One scorer could not produce a result. Recovered by the fusion engine,
/// which falls back to the surviving scorer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ComponentError {
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("invalid value {value:?} in column `{column}` (row {row})")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("invalid scorer output: {0}")]
    InvalidOutput(String),
    #[error("{0}")]
    NotSupplied(String),
}

/// Fatal for a single fusion request.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FusionError {
    #[error("both models unavailable (static: {static_error}; behavioral: {behavioral_error})")]
    BothComponentsUnavailable {
        static_error: String,
        behavioral_error: String,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("encryption error")]
    Crypto,
    #[error("payload decode error: {0}")]
    Decode(String),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Fusion(#[from] FusionError),
    #[error("input is empty: {0}")]
    EmptyInput(String),
    #[error("invalid CSV input: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
