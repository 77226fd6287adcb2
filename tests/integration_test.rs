//! Integration test: config load, static scorer with a stub classifier, scan modes,
//! report rendering, scan history.

use ndarray::Array2;
use ransom_fusion::{
    config::{DetectorConfig, StaticModelConfig},
    error::{ComponentError, ScanError},
    features::FeatureTable,
    model::{Classifier, StaticArtifact, StaticScorer},
    report::{recommended_actions, risk_summary, SourceType},
    risk::{Component, ComponentScore, RiskBand, Verdict},
    scan::{ScanInput, Scanner, STATIC_ONLY_NOTE},
    storage::{ScanRecord, ScanStore},
};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Returns the first feature of each row as its probability and keeps the
/// last matrix it saw.
struct FirstColumnClassifier {
    seen: Arc<Mutex<Option<Array2<f32>>>>,
}

impl Classifier for FirstColumnClassifier {
    fn predict_proba(&self, rows: &Array2<f32>) -> Result<Vec<f64>, ComponentError> {
        *self.seen.lock().unwrap() = Some(rows.clone());
        Ok(rows.column(0).iter().map(|&v| f64::from(v).clamp(0.0, 1.0)).collect())
    }
}

fn stub_scorer() -> (Arc<StaticScorer>, Arc<Mutex<Option<Array2<f32>>>>) {
    let seen = Arc::new(Mutex::new(None));
    let artifact = StaticArtifact::new(
        Box::new(FirstColumnClassifier { seen: seen.clone() }),
        vec![
            "score_hint".to_string(),
            "SectionsMeanEntropy".to_string(),
            "ImportsNb".to_string(),
        ],
        vec![0.1, 0.6, 0.3],
        0.42,
    );
    let scorer = StaticScorer::with_artifact(StaticModelConfig::default(), artifact);
    (Arc::new(scorer), seen)
}

fn unavailable_scorer(dir: &Path) -> Arc<StaticScorer> {
    let config = StaticModelConfig {
        model_path: dir.join("missing.onnx"),
        features_path: dir.join("missing.json"),
        threshold_path: dir.join("missing_threshold.json"),
        ..StaticModelConfig::default()
    };
    Arc::new(StaticScorer::new(config))
}

fn input<'a>(name: &'a str, csv: &'a str) -> ScanInput<'a> {
    ScanInput {
        filename: name,
        bytes: csv.as_bytes(),
    }
}

#[test]
fn config_load_default() {
    let c = DetectorConfig::load(Path::new("nonexistent.json"));
    assert_eq!(c.fusion.static_weight, 0.6);
    assert_eq!(c.fusion.behavioral_weight, 0.4);
    assert_eq!(c.fusion.verdict_threshold, 0.5);
    assert_eq!(c.fusion.max_reasons, 3);
    assert_eq!(c.behavioral.threshold, 0.6);
    assert_eq!(c.behavioral.file_activity.count_trigger, 1000);
}

#[test]
fn config_partial_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"fusion": {"verdict_threshold": 0.7}, "log": {"json": false}}"#)
        .unwrap();
    let c = DetectorConfig::load(&path);
    assert_eq!(c.fusion.verdict_threshold, 0.7);
    assert_eq!(c.fusion.safe_max, 0.30);
    assert!(!c.log.json);
    assert_eq!(c.log.level, "info");
}

#[test]
fn static_scorer_projects_in_model_order() {
    let (scorer, seen) = stub_scorer();
    let t = FeatureTable::from_reader("ImportsNb,extra,score_hint\n4,9,0.9\n2,9,0.1\n".as_bytes())
        .unwrap();
    let r = scorer.score(&t).unwrap();
    assert_eq!(r.probabilities().len(), 2);
    assert!((r.probabilities()[0] - 0.9).abs() < 1e-6);
    assert_eq!(r.predictions(), &[1, 0]);
    assert_eq!(r.threshold(), 0.42);

    let x = seen.lock().unwrap().clone().unwrap();
    assert_eq!(x.shape(), &[2, 3]);
    // missing SectionsMeanEntropy column filled with zeros
    assert_eq!(x[[0, 1]], 0.0);
    assert_eq!(x[[0, 2]], 4.0);

    // entropy ranked first, imports second
    assert_eq!(r.reasons().len(), 2);
    assert!(r.reasons()[0].contains("scrambled"));
}

#[test]
fn static_scorer_rejects_invalid_value() {
    let (scorer, _) = stub_scorer();
    let t = FeatureTable::from_reader("score_hint,ImportsNb\n0.5,lots\n".as_bytes()).unwrap();
    match scorer.score(&t) {
        Err(ComponentError::InvalidValue { row, column, .. }) => {
            assert_eq!(row, 0);
            assert_eq!(column, "ImportsNb");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn missing_artifact_is_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let scorer = unavailable_scorer(dir.path());
    assert!(matches!(
        scorer.preload(),
        Err(ComponentError::ModelUnavailable(_))
    ));
    assert!(!scorer.is_loaded());

    // metadata present, model still missing
    std::fs::write(
        dir.path().join("missing.json"),
        r#"{"feature_names": ["a", "b"], "feature_importances": [0.5, 0.5]}"#,
    )
    .unwrap();
    assert!(matches!(
        scorer.preload(),
        Err(ComponentError::ModelUnavailable(msg)) if msg.contains("missing.onnx")
    ));
    assert!(!scorer.is_loaded());
}

#[test]
fn combined_scan_fuses_both() {
    let (scorer, _) = stub_scorer();
    let scanner = Scanner::new(&DetectorConfig::default(), scorer);
    // static 0.8; behavioural: network rule only -> 0.2
    let csv = "score_hint,total_events,n_proc_create,n_file_create,n_net_conn\n0.8,100,0,0,6\n";
    let report = scanner.scan_combined(&input("sample.csv", csv)).unwrap();
    assert!((report.final_prob - 0.56).abs() < 1e-6);
    assert_eq!(report.verdict, Verdict::Malicious);
    assert_eq!(report.risk_band, RiskBand::Caution);
    assert_eq!(report.source_type, SourceType::Combined);
    assert!(report.reasons[0].contains("Network connection"));
    assert_eq!(report.reasons.len(), 3);
    assert_eq!(report.sha256.as_deref().map(str::len), Some(64));
}

#[test]
fn combined_scan_survives_static_failure() {
    let dir = tempfile::tempdir().unwrap();
    let scanner = Scanner::new(&DetectorConfig::default(), unavailable_scorer(dir.path()));
    let csv = "total_events,n_proc_create,n_file_create,n_net_conn\n100,50,90,20\n";
    let report = scanner.scan_combined(&input("behav.csv", csv)).unwrap();
    assert!((report.final_prob - 1.0).abs() < 1e-9);
    assert_eq!(report.risk_band, RiskBand::HighRisk);
    assert!(matches!(
        report.components[&Component::Static],
        ComponentScore::Failed { .. }
    ));
}

#[test]
fn static_only_scan_marks_behavioural_absent() {
    let (scorer, _) = stub_scorer();
    let scanner = Scanner::new(&DetectorConfig::default(), scorer);
    let report = scanner
        .scan_static(&input("app.exe.csv", "score_hint\n0.2\n"))
        .unwrap();
    assert!((report.final_prob - 0.2).abs() < 1e-6);
    assert_eq!(report.verdict, Verdict::Safe);
    assert_eq!(report.risk_band, RiskBand::Safe);
    assert_eq!(report.source_type, SourceType::ExeStatic);
    match &report.components[&Component::Behavioral] {
        ComponentScore::Failed { error } => assert_eq!(error, STATIC_ONLY_NOTE),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn static_only_scan_without_model_fails() {
    let dir = tempfile::tempdir().unwrap();
    let scanner = Scanner::new(&DetectorConfig::default(), unavailable_scorer(dir.path()));
    let err = scanner
        .scan_static(&input("app.exe.csv", "score_hint\n0.2\n"))
        .unwrap_err();
    assert!(matches!(err, ScanError::Fusion(_)));
}

#[test]
fn empty_upload_is_rejected() {
    let (scorer, _) = stub_scorer();
    let scanner = Scanner::new(&DetectorConfig::default(), scorer);
    assert!(matches!(
        scanner.scan_behavioral(&input("empty.csv", "  \n")),
        Err(ScanError::EmptyInput(_))
    ));
}

#[test]
fn report_text_is_ascii_and_complete() {
    let (scorer, _) = stub_scorer();
    let scanner = Scanner::new(&DetectorConfig::default(), scorer);
    let csv = "total_events,n_file_create\n100,80\n";
    let report = scanner
        .scan_behavioral(&input("d\u{e9}mo.csv", csv))
        .unwrap();
    let text = report.render_text();
    assert!(text.is_ascii());
    assert!(text.contains("d?mo.csv"));
    assert!(text.contains("Final verdict: Malicious"));
    assert!(text.contains("Risk band: Caution"));
    assert!(text.contains("Immediately isolate the host"));
}

#[test]
fn scans_are_persisted_when_store_attached() {
    let (scorer, _) = stub_scorer();
    let store = Arc::new(ScanStore::open_in_memory(b"test-secret").unwrap());
    let scanner = Scanner::new(&DetectorConfig::default(), scorer).with_store(store.clone());
    let report = scanner
        .scan_behavioral(&input("b.csv", "total_events,n_net_conn\n10,9\n"))
        .unwrap();
    let saved = store.get(&report.id).unwrap().unwrap();
    assert_eq!(saved.verdict, "Safe");
    assert_eq!(saved.source_type, "behavioural_csv");
    assert!((saved.probability - 0.2).abs() < 1e-9);
    assert_eq!(saved.detail["reasons"][0], report.reasons[0].as_str());
}

#[test]
fn storage_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scans.db");
    let store = ScanStore::open(&path, b"test-secret").unwrap();
    for (i, ts) in [100i64, 300, 200].into_iter().enumerate() {
        store
            .insert_scan(&ScanRecord {
                id: format!("scan-{i}"),
                ts,
                filename: "x.csv".to_string(),
                verdict: "Malicious".to_string(),
                probability: 0.56,
                risk_band: "Caution".to_string(),
                source_type: "combined".to_string(),
                detail: serde_json::json!({"reasons": ["A"]}),
            })
            .unwrap();
    }
    let recent = store.recent(2).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].ts, 300);
    assert_eq!(recent[1].ts, 200);
    assert_eq!(recent[0].detail["reasons"][0], "A");

    assert_eq!(store.prune_before(250).unwrap(), 2);
    assert!(store.get("scan-0").unwrap().is_none());

    // wrong secret cannot read the detail column
    drop(store);
    let other = ScanStore::open(&path, b"other-secret").unwrap();
    assert!(other.get("scan-1").is_err());
}

#[test]
fn safe_verdict_outside_caution_band_gets_clean_summary() {
    // only reachable with overridden cut-points
    assert_eq!(
        risk_summary(Verdict::Safe, RiskBand::HighRisk),
        risk_summary(Verdict::Safe, RiskBand::Safe)
    );
    assert_eq!(
        recommended_actions(Verdict::Safe, RiskBand::HighRisk)[0],
        "No malicious indicators detected."
    );
    assert!(risk_summary(Verdict::Safe, RiskBand::Caution).contains("closer inspection"));
    assert!(risk_summary(Verdict::Malicious, RiskBand::Safe).contains("strong indicators"));
}

#[test]
fn static_scorer_is_shared_across_threads() {
    let (scorer, _) = stub_scorer();
    let t = FeatureTable::from_reader("score_hint\n0.9\n0.3\n".as_bytes()).unwrap();
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| scorer.score(&t).unwrap()))
            .collect();
        for h in handles {
            let r = h.join().unwrap();
            assert_eq!(r.predictions(), &[1, 0]);
        }
    });
    assert!(scorer.is_loaded());
}

#[test]
fn concurrent_first_load_failures_are_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let scorer = unavailable_scorer(dir.path());
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..8).map(|_| s.spawn(|| scorer.preload())).collect();
        for h in handles {
            assert!(matches!(
                h.join().unwrap(),
                Err(ComponentError::ModelUnavailable(_))
            ));
        }
    });
    assert!(!scorer.is_loaded());
}
