//! Helpdesk reports - command line entry point

use anyhow::{Context, Result};
use clap::Parser;
use helpdesk_common::{init_logging, ConversationKind};
use helpdesk_config::ConfigLoader;
use helpdesk_reports::{HelpdeskReports, ReportParams, ReportProgress, ReportStage, SqliteStore};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,

    /// Log level, overrides the configured one
    #[arg(short, long)]
    log_level: Option<String>,

    /// Database URL, overrides the configured one
    #[arg(long, env = "HELPDESK_DATABASE_URL")]
    database: Option<String>,

    /// Report preset to compute (all, agents, tags)
    preset: String,

    /// Restrict the report to one conversation kind
    #[arg(short, long)]
    kind: Option<ConversationKind>,

    /// First day of the report period
    #[arg(long)]
    start_date: Option<String>,

    /// Last day of the report period
    #[arg(long)]
    end_date: Option<String>,

    /// First day of the comparison period
    #[arg(long, requires = "compare_end_date")]
    compare_start_date: Option<String>,

    /// Last day of the comparison period
    #[arg(long, requires = "compare_start_date")]
    compare_end_date: Option<String>,

    /// IANA timezone for bucketing, e.g. Europe/Berlin
    #[arg(short, long)]
    timezone: Option<String>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,

    /// Create the schema before querying
    #[arg(long)]
    migrate: bool,
}

impl Args {
    fn report_params(&self) -> ReportParams {
        ReportParams {
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            compare_start_date: self.compare_start_date.clone(),
            compare_end_date: self.compare_end_date.clone(),
            timezone: self.timezone.clone(),
        }
    }
}

fn log_progress(progress: &ReportProgress) {
    match progress.stage {
        ReportStage::Processing => debug!(
            "{:?}: {} ({} batches, {} rows)",
            progress.period, progress.message, progress.batches, progress.rows
        ),
        _ => info!("{:?}: {}", progress.period, progress.message),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match args.config {
        Some(ref path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };

    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }
    if let Some(ref url) = args.database {
        config.database.url = url.clone();
    }

    init_logging(config.logging.clone()).map_err(|e| anyhow::anyhow!(e))?;
    info!("Configuration loaded successfully");

    let store = SqliteStore::connect(&config.database.url, config.database.max_connections)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.url))?;
    if args.migrate {
        store.migrate().await?;
        info!("Database schema is up to date");
    }

    let reports = HelpdeskReports::new(Arc::new(store), config.reports.clone())?;
    if !reports.presets().contains(&args.preset) {
        anyhow::bail!(
            "Unknown preset '{}', expected one of: {}",
            args.preset,
            reports.presets().names().join(", ")
        );
    }

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let progress_task = tokio::spawn(async move {
        while let Some(progress) = progress_rx.recv().await {
            log_progress(&progress);
        }
    });

    let report = reports
        .get_report_with_progress(&args.preset, args.kind, &args.report_params(), Some(progress_tx))
        .await?;
    progress_task.await?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");

    info!("Report '{}' complete with {} metrics", args.preset, report.len());
    Ok(())
}
