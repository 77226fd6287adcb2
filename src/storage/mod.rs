//! Encrypted local scan history.

mod encrypted;

pub use encrypted::{ScanRecord, ScanStore};
