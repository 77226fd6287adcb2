//! Aggregated behavioural observation (one row per sample) with explicit
//! default-fill rules.

use serde::{Deserialize, Serialize};

pub const TOTAL_EVENTS: &str = "total_events";
pub const N_PROC_CREATE: &str = "n_proc_create";
pub const N_FILE_CREATE: &str = "n_file_create";
pub const N_NET_CONN: &str = "n_net_conn";
pub const RATIO_PROC_CREATE: &str = "ratio_proc_create";
pub const RATIO_FILE_CREATE: &str = "ratio_file_create";
pub const RATIO_NET_CONN: &str = "ratio_net_conn";

/// Raw row as supplied. Any field may be absent; see [`BehavioralRow::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehavioralRow {
    pub total_events: Option<u64>,
    pub n_proc_create: Option<u64>,
    pub n_file_create: Option<u64>,
    pub n_net_conn: Option<u64>,
    pub ratio_proc_create: Option<f64>,
    pub ratio_file_create: Option<f64>,
    pub ratio_net_conn: Option<f64>,
}

/// Row with every field filled in, ready for rule evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResolvedRow {
    pub total_events: u64,
    pub n_proc_create: u64,
    pub n_file_create: u64,
    pub n_net_conn: u64,
    pub ratio_proc_create: f64,
    pub ratio_file_create: f64,
    pub ratio_net_conn: f64,
}

impl BehavioralRow {
    /// Build from counts, deriving ratios against `total_events`.
    pub fn from_counts(total_events: u64, n_proc: u64, n_file: u64, n_net: u64) -> Self {
        Self {
            total_events: Some(total_events),
            n_proc_create: Some(n_proc),
            n_file_create: Some(n_file),
            n_net_conn: Some(n_net),
            ratio_proc_create: Some(safe_ratio(n_proc, total_events)),
            ratio_file_create: Some(safe_ratio(n_file, total_events)),
            ratio_net_conn: Some(safe_ratio(n_net, total_events)),
        }
    }

    /// Permissive parse of one table record: absent columns and cells that do
    /// not read as numbers are left empty, never rejected.
    pub fn from_record(headers: &[String], record: &[String]) -> Self {
        let cell = |name: &str| -> Option<&str> {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .and_then(|i| record.get(i))
                .map(|s| s.as_str())
        };
        Self {
            total_events: cell(TOTAL_EVENTS).and_then(coerce_count),
            n_proc_create: cell(N_PROC_CREATE).and_then(coerce_count),
            n_file_create: cell(N_FILE_CREATE).and_then(coerce_count),
            n_net_conn: cell(N_NET_CONN).and_then(coerce_count),
            ratio_proc_create: cell(RATIO_PROC_CREATE).and_then(coerce_ratio),
            ratio_file_create: cell(RATIO_FILE_CREATE).and_then(coerce_ratio),
            ratio_net_conn: cell(RATIO_NET_CONN).and_then(coerce_ratio),
        }
    }

    /// Missing counts become 0. A ratio that is missing or zero is recomputed
    /// from its count and `total_events` (0 when there are no events).
    pub fn resolve(&self) -> ResolvedRow {
        let total = self.total_events.unwrap_or(0);
        let n_proc = self.n_proc_create.unwrap_or(0);
        let n_file = self.n_file_create.unwrap_or(0);
        let n_net = self.n_net_conn.unwrap_or(0);
        let ratio = |given: Option<f64>, count: u64| match given {
            Some(r) if r != 0.0 => r,
            _ => safe_ratio(count, total),
        };
        ResolvedRow {
            total_events: total,
            n_proc_create: n_proc,
            n_file_create: n_file,
            n_net_conn: n_net,
            ratio_proc_create: ratio(self.ratio_proc_create, n_proc),
            ratio_file_create: ratio(self.ratio_file_create, n_file),
            ratio_net_conn: ratio(self.ratio_net_conn, n_net),
        }
    }
}

pub(crate) fn safe_ratio(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// Counts: any finite non-negative number, truncated. Everything else is absent.
fn coerce_count(raw: &str) -> Option<u64> {
    let v: f64 = raw.trim().parse().ok()?;
    if v.is_finite() && v >= 0.0 {
        Some(v.trunc() as u64)
    } else {
        None
    }
}

fn coerce_ratio(raw: &str) -> Option<f64> {
    let v: f64 = raw.trim().parse().ok()?;
    v.is_finite().then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coercion_is_permissive() {
        assert_eq!(coerce_count("12"), Some(12));
        assert_eq!(coerce_count(" 12.9 "), Some(12));
        assert_eq!(coerce_count("n/a"), None);
        assert_eq!(coerce_count("-3"), None);
        assert_eq!(coerce_count("NaN"), None);
        assert_eq!(coerce_ratio("inf"), None);
        assert_eq!(coerce_ratio("0.25"), Some(0.25));
    }

    #[test]
    fn supplied_ratio_wins_over_counts() {
        let row = BehavioralRow {
            total_events: Some(100),
            n_file_create: Some(1),
            ratio_file_create: Some(0.9),
            ..Default::default()
        };
        assert_eq!(row.resolve().ratio_file_create, 0.9);
    }
}
