//! Aggregation pipeline: Sysmon event-level records → one behavioural row per sample.

use super::behavioral::{
    BehavioralRow, N_FILE_CREATE, N_NET_CONN, N_PROC_CREATE, RATIO_FILE_CREATE, RATIO_NET_CONN,
    RATIO_PROC_CREATE, TOTAL_EVENTS,
};
use super::FeatureTable;
use crate::error::ScanError;
use serde::Serialize;
use std::io::Write;

/// Sysmon event ids that feed the behavioural counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SysmonEvent {
    ProcessCreate,
    NetworkConnect,
    FileCreate,
    Other(u32),
}

impl SysmonEvent {
    pub fn from_id(id: u32) -> Self {
        match id {
            1 => SysmonEvent::ProcessCreate,
            3 => SysmonEvent::NetworkConnect,
            11 => SysmonEvent::FileCreate,
            other => SysmonEvent::Other(other),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EventCounts {
    pub total: u64,
    pub proc_create: u64,
    pub file_create: u64,
    pub net_conn: u64,
}

impl EventCounts {
    pub fn push(&mut self, event: SysmonEvent) {
        self.total += 1;
        match event {
            SysmonEvent::ProcessCreate => self.proc_create += 1,
            SysmonEvent::FileCreate => self.file_create += 1,
            SysmonEvent::NetworkConnect => self.net_conn += 1,
            SysmonEvent::Other(_) => {}
        }
    }

    pub fn to_row(&self) -> BehavioralRow {
        BehavioralRow::from_counts(self.total, self.proc_create, self.file_create, self.net_conn)
    }
}

/// Aggregate a stream of Sysmon event ids.
pub fn aggregate_event_ids<I: IntoIterator<Item = u32>>(ids: I) -> BehavioralRow {
    let mut counts = EventCounts::default();
    for id in ids {
        counts.push(SysmonEvent::from_id(id));
    }
    counts.to_row()
}

/// Aggregate an event-level table. Each record counts once towards the total;
/// its kind comes from the `is_*` flag columns when present, else `event_id`.
pub fn aggregate_event_table(table: &FeatureTable) -> Result<BehavioralRow, ScanError> {
    if table.is_empty() {
        return Err(ScanError::EmptyInput("no events to aggregate".to_string()));
    }
    let col = |name: &str| table.headers().iter().position(|h| h == name);
    let event_id = col("event_id");
    let is_proc = col("is_process_create");
    let is_file = col("is_file_create");
    let is_net = col("is_network_conn");

    let flag = |row: &[String], c: Option<usize>| -> Option<bool> {
        let v: f64 = row.get(c?)?.trim().parse().ok()?;
        Some(v != 0.0)
    };

    let mut counts = EventCounts::default();
    for row in table.rows() {
        let row = row.as_slice();
        counts.total += 1;
        let id = event_id
            .and_then(|c| row.get(c))
            .and_then(|v| v.trim().parse::<u32>().ok())
            .map(SysmonEvent::from_id);
        if flag(row, is_proc).unwrap_or(id == Some(SysmonEvent::ProcessCreate)) {
            counts.proc_create += 1;
        }
        if flag(row, is_file).unwrap_or(id == Some(SysmonEvent::FileCreate)) {
            counts.file_create += 1;
        }
        if flag(row, is_net).unwrap_or(id == Some(SysmonEvent::NetworkConnect)) {
            counts.net_conn += 1;
        }
    }
    tracing::debug!(
        total = counts.total,
        proc_create = counts.proc_create,
        file_create = counts.file_create,
        net_conn = counts.net_conn,
        "aggregated behavioural events"
    );
    Ok(counts.to_row())
}

#[derive(Serialize)]
struct AggregateRecord<'a> {
    sample_id: &'a str,
    #[serde(rename = "total_events")]
    total: u64,
    n_proc_create: u64,
    n_file_create: u64,
    n_net_conn: u64,
    ratio_proc_create: f64,
    ratio_file_create: f64,
    ratio_net_conn: f64,
}

/// Write one aggregated row as a headed CSV, the shape `scan-behavioral` reads.
pub fn write_aggregate_csv<W: Write>(
    row: &BehavioralRow,
    sample_id: &str,
    writer: W,
) -> Result<(), ScanError> {
    let r = row.resolve();
    let mut w = csv::Writer::from_writer(writer);
    w.serialize(AggregateRecord {
        sample_id,
        total: r.total_events,
        n_proc_create: r.n_proc_create,
        n_file_create: r.n_file_create,
        n_net_conn: r.n_net_conn,
        ratio_proc_create: r.ratio_proc_create,
        ratio_file_create: r.ratio_file_create,
        ratio_net_conn: r.ratio_net_conn,
    })?;
    w.flush()?;
    Ok(())
}

/// Column names of the aggregated table, in output order.
pub const AGGREGATE_COLUMNS: [&str; 8] = [
    "sample_id",
    TOTAL_EVENTS,
    N_PROC_CREATE,
    N_FILE_CREATE,
    N_NET_CONN,
    RATIO_PROC_CREATE,
    RATIO_FILE_CREATE,
    RATIO_NET_CONN,
];
