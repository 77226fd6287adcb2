//! Behavioural rule scorer and Sysmon aggregation.

use ransom_fusion::config::BehavioralConfig;
use ransom_fusion::features::{
    aggregate_event_ids, aggregate_event_table, write_aggregate_csv, BehavioralRow, FeatureTable,
    AGGREGATE_COLUMNS,
};
use ransom_fusion::model::{
    BehavioralScorer, REASON_FILE_ACTIVITY, REASON_NETWORK_ACTIVITY, REASON_NORMAL,
    REASON_NO_EVIDENCE, REASON_PROCESS_ACTIVITY,
};

fn table(csv: &str) -> FeatureTable {
    FeatureTable::from_reader(csv.as_bytes()).unwrap()
}

#[test]
fn empty_input_is_neutral() {
    let r = BehavioralScorer::default().score(&[]);
    assert_eq!(r.probabilities(), &[0.0]);
    assert_eq!(r.predictions(), &[0]);
    assert_eq!(r.threshold(), 0.6);
    assert_eq!(r.reasons(), &[REASON_NO_EVIDENCE.to_string()]);
}

#[test]
fn all_rules_fire_and_score_is_clamped() {
    let row = BehavioralRow::from_counts(2000, 50, 1500, 20);
    let r = BehavioralScorer::default().score(&[row]);
    let p = r.probabilities()[0];
    assert!((p - 1.0).abs() < 1e-12);
    assert!((0.0..=1.0).contains(&p));
    assert_eq!(r.predictions(), &[1]);
    assert_eq!(
        r.reasons(),
        &[
            REASON_FILE_ACTIVITY.to_string(),
            REASON_NETWORK_ACTIVITY.to_string(),
            REASON_PROCESS_ACTIVITY.to_string(),
        ]
    );
}

#[test]
fn clamp_holds_with_oversized_weights() {
    let mut config = BehavioralConfig::default();
    config.file_activity.weight = 0.9;
    config.network_activity.weight = 0.9;
    let row = BehavioralRow::from_counts(100, 0, 90, 10);
    let r = BehavioralScorer::new(config).score(&[row]);
    assert_eq!(r.probabilities(), &[1.0]);
}

#[test]
fn file_rule_alone_meets_threshold() {
    // ratio 0.6 > 0.5, no other activity
    let row = BehavioralRow::from_counts(100, 0, 60, 0);
    let r = BehavioralScorer::default().score(&[row]);
    assert!((r.probabilities()[0] - 0.6).abs() < 1e-12);
    assert_eq!(r.predictions(), &[1]);
}

#[test]
fn quiet_row_gets_normal_reason() {
    let row = BehavioralRow::from_counts(10_000, 1, 5, 1);
    let r = BehavioralScorer::default().score(&[row]);
    assert_eq!(r.probabilities(), &[0.0]);
    assert_eq!(r.reasons(), &[REASON_NORMAL.to_string()]);
}

#[test]
fn zero_total_events_yields_zero_ratios() {
    let row = BehavioralRow {
        total_events: Some(0),
        n_proc_create: Some(3),
        n_file_create: Some(7),
        n_net_conn: Some(2),
        ..Default::default()
    };
    let resolved = row.resolve();
    assert_eq!(resolved.ratio_proc_create, 0.0);
    assert_eq!(resolved.ratio_file_create, 0.0);
    assert_eq!(resolved.ratio_net_conn, 0.0);
    let r = BehavioralScorer::default().score(&[row]);
    assert_eq!(r.probabilities(), &[0.0]);
}

#[test]
fn reasons_come_from_first_row_only() {
    let quiet = BehavioralRow::from_counts(10_000, 0, 0, 0);
    let noisy = BehavioralRow::from_counts(100, 50, 90, 20);
    let r = BehavioralScorer::default().score(&[quiet, noisy]);
    assert_eq!(r.probabilities().len(), 2);
    assert_eq!(r.predictions(), &[0, 1]);
    assert_eq!(r.reasons(), &[REASON_NORMAL.to_string()]);
}

#[test]
fn scoring_is_idempotent() {
    let rows = vec![
        BehavioralRow::from_counts(500, 12, 300, 4),
        BehavioralRow::from_counts(40, 0, 1, 3),
    ];
    let scorer = BehavioralScorer::default();
    assert_eq!(scorer.score(&rows), scorer.score(&rows));
}

#[test]
fn malformed_cells_default_to_zero() {
    let t = table(
        "total_events,n_proc_create,n_file_create,n_net_conn,ratio_file_create\n\
         abc,n/a,,7,oops\n",
    );
    let rows = t.behavioral_rows();
    let resolved = rows[0].resolve();
    assert_eq!(resolved.total_events, 0);
    assert_eq!(resolved.n_proc_create, 0);
    assert_eq!(resolved.n_file_create, 0);
    assert_eq!(resolved.n_net_conn, 7);
    assert_eq!(resolved.ratio_net_conn, 0.0);
    // n_net_conn 7 > 5 fires the network rule only
    let r = BehavioralScorer::default().score(&rows);
    assert!((r.probabilities()[0] - 0.2).abs() < 1e-12);
    assert_eq!(r.predictions(), &[0]);
}

#[test]
fn supplied_ratios_are_used_without_counts() {
    let t = table("ratio_proc_create,ratio_file_create,ratio_net_conn\n0.05,0.7,0.03\n");
    let r = BehavioralScorer::default().score(&t.behavioral_rows());
    assert!((r.probabilities()[0] - 1.0).abs() < 1e-12);
}

#[test]
fn aggregates_event_ids() {
    let row = aggregate_event_ids([1, 11, 11, 3, 5, 11]);
    let r = row.resolve();
    assert_eq!(r.total_events, 6);
    assert_eq!(r.n_proc_create, 1);
    assert_eq!(r.n_file_create, 3);
    assert_eq!(r.n_net_conn, 1);
    assert!((r.ratio_file_create - 0.5).abs() < 1e-12);
}

#[test]
fn aggregates_event_table_flags() {
    let t = table(
        "event_id,timestamp,is_process_create,is_file_create,is_network_conn\n\
         1,2024-01-01T00:00:00Z,1,0,0\n\
         11,2024-01-01T00:00:01Z,0,1,0\n\
         11,2024-01-01T00:00:02Z,0,1,0\n\
         3,2024-01-01T00:00:03Z,0,0,1\n",
    );
    let r = aggregate_event_table(&t).unwrap().resolve();
    assert_eq!(r.total_events, 4);
    assert_eq!(r.n_file_create, 2);
    assert_eq!(r.n_proc_create, 1);
    assert_eq!(r.n_net_conn, 1);
}

#[test]
fn aggregates_event_table_by_id_only() {
    let t = table("event_id\n1\n1\n3\n22\n");
    let r = aggregate_event_table(&t).unwrap().resolve();
    assert_eq!(r.total_events, 4);
    assert_eq!(r.n_proc_create, 2);
    assert_eq!(r.n_net_conn, 1);
    assert_eq!(r.n_file_create, 0);
}

#[test]
fn empty_event_table_is_rejected() {
    let t = table("event_id\n");
    assert!(aggregate_event_table(&t).is_err());
}

#[test]
fn aggregate_csv_feeds_back_into_scorer() {
    let row = aggregate_event_ids([11, 11, 11, 1]);
    let mut buf = Vec::new();
    write_aggregate_csv(&row, "run_7", &mut buf).unwrap();

    let t = FeatureTable::from_reader(buf.as_slice()).unwrap();
    assert_eq!(t.headers(), &AGGREGATE_COLUMNS.map(String::from));
    assert_eq!(t.rows()[0][0], "run_7");
    // file ratio 0.75 fires the file rule, proc ratio 0.25 the process rule
    let r = BehavioralScorer::default().score(&t.behavioral_rows());
    assert!((r.probabilities()[0] - 0.8).abs() < 1e-12);
    assert_eq!(t.behavioral_rows()[0].resolve(), row.resolve());
}
