//! ransom-fusion entrypoint: scan an uploaded feature table (combined, static-only
//! or behavioural-only), aggregate Sysmon event tables, and browse scan history.

use clap::{Parser, Subcommand};
use ransom_fusion::{
    config::DetectorConfig,
    error::ScanError,
    features::{aggregate_event_table, write_aggregate_csv, FeatureTable},
    logging::{LogEvent, StructuredLogger},
    report::ScanReport,
    scan::{ScanInput, Scanner},
    storage::ScanStore,
    StaticScorer,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "ransom-fusion", about = "Static + behavioural ransomware risk fusion", version)]
struct Cli {
    /// Config file (JSON); falls back to RANSOM_FUSION_CONFIG, then config.json
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the plain-text report instead of JSON
    #[arg(long)]
    text: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run both scorers over one feature table
    Scan { file: PathBuf },
    /// Static classifier only (PE header features)
    ScanStatic { file: PathBuf },
    /// Behavioural scorer only (aggregated Sysmon features)
    ScanBehavioral { file: PathBuf },
    /// Aggregate an event-level Sysmon CSV into one behavioural row
    Aggregate {
        events: PathBuf,
        #[arg(long, default_value = "sample_1")]
        sample_id: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show recent scans
    History {
        #[arg(long)]
        limit: Option<usize>,
    },
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn config_path(cli: &Cli) -> PathBuf {
    cli.config.clone().unwrap_or_else(|| {
        std::env::var("RANSOM_FUSION_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.json"))
    })
}

fn open_store(config: &DetectorConfig) -> Option<Arc<ScanStore>> {
    if !config.storage.enabled {
        return None;
    }
    let Ok(secret) = std::env::var(&config.storage.secret_env) else {
        warn!(env = %config.storage.secret_env, "store secret not set; scan history disabled");
        return None;
    };
    if let Err(e) = std::fs::create_dir_all(&config.storage.data_dir) {
        warn!(error = %e, "cannot create data dir; scan history disabled");
        return None;
    }
    let path = config.storage.data_dir.join("scans.db");
    match ScanStore::open(&path, secret.as_bytes()) {
        Ok(s) => Some(Arc::new(s)),
        Err(e) => {
            warn!(error = %e, path = %path.display(), "cannot open scan history");
            None
        }
    }
}

fn print_report(report: &ScanReport, text: bool) -> Result<(), BoxError> {
    if text {
        print!("{}", report.render_text());
    } else {
        println!("{}", serde_json::to_string_pretty(report)?);
    }
    Ok(())
}

fn run_scan(
    scanner: &Scanner,
    mode: &Commands,
    path: &Path,
    text: bool,
) -> Result<(), BoxError> {
    let bytes = std::fs::read(path)?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let input = ScanInput {
        filename: &filename,
        bytes: &bytes,
    };
    let report = match mode {
        Commands::Scan { .. } => scanner.scan_combined(&input)?,
        Commands::ScanStatic { .. } => scanner.scan_static(&input)?,
        _ => scanner.scan_behavioral(&input)?,
    };
    print_report(&report, text)
}

fn run(cli: Cli) -> Result<(), BoxError> {
    let config = DetectorConfig::load(&config_path(&cli));
    StructuredLogger::init(config.log.json, &config.log.level);
    info!("ransom-fusion starting");

    match &cli.command {
        Commands::Scan { file } | Commands::ScanStatic { file } | Commands::ScanBehavioral { file } => {
            let static_scorer = Arc::new(StaticScorer::new(config.static_model.clone()));
            if !matches!(cli.command, Commands::ScanBehavioral { .. }) {
                if let Err(e) = static_scorer.preload() {
                    warn!(error = %e, "static model not loaded");
                }
            }
            let mut scanner = Scanner::new(&config, static_scorer);
            if let Some(store) = open_store(&config) {
                scanner = scanner.with_store(store);
            }
            run_scan(&scanner, &cli.command, file, cli.text)
        }
        Commands::Aggregate {
            events,
            sample_id,
            out,
        } => {
            let table = FeatureTable::from_path(events)?;
            let row = aggregate_event_table(&table)?;
            match out {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    write_aggregate_csv(&row, sample_id, std::fs::File::create(path)?)?;
                    info!(path = %path.display(), "aggregated features written");
                }
                None => write_aggregate_csv(&row, sample_id, std::io::stdout())?,
            }
            Ok(())
        }
        Commands::History { limit } => {
            let Some(store) = open_store(&config) else {
                return Err("scan history unavailable".into());
            };
            let records = store.recent(limit.unwrap_or(config.storage.history_limit))?;
            let mut out = std::io::stdout();
            for r in &records {
                let ts = chrono::DateTime::from_timestamp_millis(r.ts)
                    .map(|d| d.to_rfc3339())
                    .unwrap_or_default();
                let event = LogEvent {
                    ts,
                    level: "info",
                    message: "scan",
                    scan_id: Some(r.id.as_str()),
                    filename: Some(r.filename.as_str()),
                    probability: Some(r.probability),
                    verdict: Some(r.verdict.as_str()),
                    risk_band: Some(r.risk_band.as_str()),
                    error: None,
                };
                StructuredLogger::emit_json(&event, &mut out);
            }
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(ScanError::Fusion(f)) = e.downcast_ref::<ScanError>() {
                tracing::error!(error = %f, "scan failed");
            }
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
