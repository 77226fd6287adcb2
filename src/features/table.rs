//! Uploaded feature table: a header row plus raw cells, loaded from CSV.
//!
//! Cells stay as text until a scorer reads them. The behavioural scorer
//! coerces leniently; the static scorer projects onto the model's feature
//! order and rejects values it cannot read.

use super::behavioral::BehavioralRow;
use crate::error::{ComponentError, ScanError};
use ndarray::Array2;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl FeatureTable {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ScanError> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(|s| s.trim().to_string()).collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(ScanError::EmptyInput("no header row".to_string()));
        }
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(|s| s.to_string()).collect());
        }
        Ok(Self { headers, rows })
    }

    pub fn from_path(path: &Path) -> Result<Self, ScanError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn behavioral_rows(&self) -> Vec<BehavioralRow> {
        self.rows
            .iter()
            .map(|r| BehavioralRow::from_record(&self.headers, r))
            .collect()
    }

    /// Project onto `feature_names` (model column order). Absent columns and
    /// blank cells are 0.0; anything else that is not a finite number fails.
    pub fn project(&self, feature_names: &[String]) -> Result<Array2<f32>, ComponentError> {
        let index: Vec<Option<usize>> = feature_names
            .iter()
            .map(|f| self.headers.iter().position(|h| h == f))
            .collect();

        let mut values = Vec::with_capacity(self.rows.len() * feature_names.len());
        for (row_idx, row) in self.rows.iter().enumerate() {
            for (name, col) in feature_names.iter().zip(&index) {
                let raw = col.and_then(|c| row.get(c)).map(|s| s.trim()).unwrap_or("");
                if raw.is_empty() {
                    values.push(0.0);
                    continue;
                }
                match raw.parse::<f32>() {
                    Ok(v) if v.is_finite() => values.push(v),
                    _ => {
                        return Err(ComponentError::InvalidValue {
                            row: row_idx,
                            column: name.clone(),
                            value: raw.to_string(),
                        })
                    }
                }
            }
        }
        Array2::from_shape_vec((self.rows.len(), feature_names.len()), values)
            .map_err(|e| ComponentError::Inference(format!("feature matrix: {e}")))
    }
}
