use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use analysis_client::SimulatedAnalysisClient;
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use ingest_core::{
    config::{load_settings, Settings},
    validate, TracingNavigator, Verdict, WorkflowController,
};
use shared::{
    domain::{CandidateFile, FileSource, ReportCategory, ReportMetadata},
    error::AnalysisFailure,
    protocol::WorkflowState,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

#[derive(Parser, Debug)]
#[command(name = "ingest", about = "Submit a medical report for analysis")]
struct Cli {
    /// Settings file; defaults to ./ingest.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate, upload and analyze a report, printing each snapshot as JSON.
    Run {
        path: PathBuf,
        #[arg(long, default_value = "blood")]
        category: String,
        /// Report date as YYYY-MM-DD.
        #[arg(long)]
        date: Option<String>,
        /// Make the simulated analysis stage fail.
        #[arg(long)]
        fail_analysis: bool,
    },
    /// Only run file validation.
    Check { path: PathBuf },
    /// Print the effective settings.
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref()).context("loading settings")?;

    match cli.command {
        Command::Run {
            path,
            category,
            date,
            fail_analysis,
        } => {
            let metadata = report_metadata(&category, date)?;
            run(&settings, &path, metadata, fail_analysis).await?;
        }
        Command::Check { path } => {
            let file = candidate_file(&path).await?;
            match validate(&file, &settings.validation_policy()) {
                Verdict::Accepted => println!("accepted {} ({})", file.name, file.media_type),
                Verdict::Rejected(rejection) => {
                    bail!("rejected {}: {} ({})", file.name, rejection, rejection.code())
                }
            }
        }
        Command::Config => {
            print!(
                "{}",
                toml::to_string_pretty(&settings).context("rendering settings")?
            );
        }
    }

    Ok(())
}

async fn run(
    settings: &Settings,
    path: &Path,
    metadata: ReportMetadata,
    fail_analysis: bool,
) -> Result<()> {
    let file = candidate_file(path).await?;
    let analysis = if fail_analysis {
        SimulatedAnalysisClient::failing(
            settings.simulated_analysis().delay(),
            AnalysisFailure::Rejected("simulated failure requested".into()),
        )
    } else {
        settings.simulated_analysis()
    };

    let mut controller = WorkflowController::new(
        settings.workflow_config(),
        Arc::new(analysis),
        Arc::new(TracingNavigator),
    )
    .with_transfer(Arc::new(settings.simulated_transfer()));

    let mut snapshots = controller.snapshot_stream();
    let printer = tokio::spawn(async move {
        while let Some(snapshot) = snapshots.next().await {
            match serde_json::to_string(&snapshot) {
                Ok(line) => println!("{line}"),
                Err(err) => warn!(error = %err, "failed to encode snapshot"),
            }
        }
    });

    controller.set_metadata(metadata)?;
    controller.select_file(file, FileSource::Picker)?;
    if controller.state() == WorkflowState::Idle {
        controller.start_analysis()?;
    }

    let settled = tokio::select! {
        last = controller.run_until_settled() => Some(last),
        _ = tokio::signal::ctrl_c() => None,
    };
    let last = match settled {
        Some(last) => last,
        None => {
            info!("interrupted; cancelling upload");
            controller.cancel();
            controller.snapshot()
        }
    };

    drop(controller);
    printer.await.context("snapshot printer task")?;

    match (last.state, last.error) {
        (WorkflowState::Error, Some(report)) => {
            bail!("{} ({}): {}", report.kind.as_str(), report.code, report.message)
        }
        (state, _) => {
            info!(state = %state, "workflow finished");
            Ok(())
        }
    }
}

fn report_metadata(category: &str, date: Option<String>) -> Result<ReportMetadata> {
    if let Some(date) = &date {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .with_context(|| format!("invalid report date `{date}`, expected YYYY-MM-DD"))?;
    }
    Ok(ReportMetadata {
        report_date: date,
        category: ReportCategory::from_slug(category),
    })
}

async fn candidate_file(path: &Path) -> Result<CandidateFile> {
    let meta = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    if !meta.is_file() {
        bail!("{} is not a regular file", path.display());
    }
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("report.bin")
        .to_string();
    let media_type = mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(FALLBACK_MEDIA_TYPE);
    Ok(CandidateFile::new(name, meta.len(), media_type))
}
