//! Feature inputs: uploaded tables, typed behavioural rows and Sysmon aggregation.

mod behavioral;
mod pipeline;
mod table;

pub use behavioral::{BehavioralRow, ResolvedRow};
pub use pipeline::{
    aggregate_event_ids, aggregate_event_table, write_aggregate_csv, EventCounts, SysmonEvent,
    AGGREGATE_COLUMNS,
};
pub use table::FeatureTable;
