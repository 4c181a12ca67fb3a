//! `export` command handler
//!
//! Runs the export on a background task and prints its progress events as
//! timestamped, colored lines. Ctrl-C requests cancellation; the run stops at
//! its next checkpoint and the summary reports what was left undone.

use std::sync::Arc;

use chrono::{DateTime, Local};
use colored::Colorize;

use crate::api::DeepSeekClient;
use crate::config::Config;
use crate::error::Result;
use crate::export::{ChannelSink, Exporter, ProgressEvent, RunOutcome, RunReport, Severity};

/// Run an export using `config`
///
/// # Arguments
///
/// * `config` - Loaded and validated configuration (consumed)
///
/// # Errors
///
/// Returns error if credentials are missing, the HTTP client cannot be
/// built, or the run ends in a critical failure. A cancelled run is not an
/// error.
///
/// # Examples
///
/// ```no_run
/// use deepseek_export::commands::run_export;
/// use deepseek_export::config::Config;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::load("config/config.yaml", &Default::default())?;
/// run_export(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_export(config: Config) -> Result<()> {
    let client = DeepSeekClient::new(&config.api, &config.credentials)?;
    let exporter = Arc::new(Exporter::new(Arc::new(client), config.export.settings()));

    let (sink, mut events) = ChannelSink::new();
    let handle = exporter.spawn(config.export.download_details, Arc::new(sink))?;

    let cancel = exporter.cancel_flag();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling export");
            cancel.cancel();
        }
    });

    while let Some(event) = events.recv().await {
        println!("{}", render_line(Local::now(), &event));
    }

    let report = handle.await?;
    interrupt.abort();

    print_summary(&report);

    match report.outcome {
        RunOutcome::Failed(reason) => Err(anyhow::anyhow!("Export failed: {}", reason)),
        _ => Ok(()),
    }
}

/// Status line for `event` without styling
fn format_line(at: DateTime<Local>, event: &ProgressEvent) -> String {
    format!("[{}] {}", at.format("%H:%M:%S"), event)
}

/// Status line for `event`, colored by severity
fn render_line(at: DateTime<Local>, event: &ProgressEvent) -> String {
    let line = format_line(at, event);
    match event.severity() {
        Severity::Info => line,
        Severity::Warn => line.yellow().to_string(),
        Severity::Error => line.red().to_string(),
    }
}

fn summary_line(report: &RunReport) -> String {
    match &report.outcome {
        RunOutcome::ListOnly => format!(
            "Session list exported: {} sessions",
            report.sessions_listed
        ),
        RunOutcome::Completed => format!(
            "Export finished: {} documents written, {} skipped, {} failed",
            report.documents_written, report.sessions_skipped, report.sessions_failed
        ),
        RunOutcome::ListAborted => {
            "Export cancelled while listing sessions; nothing was saved".to_string()
        }
        RunOutcome::DetailAborted { remaining } => format!(
            "Export cancelled: {} documents written, {} sessions not processed",
            report.documents_written, remaining
        ),
        RunOutcome::Failed(reason) => format!("Export failed: {}", reason),
    }
}

fn print_summary(report: &RunReport) {
    let line = summary_line(report);
    println!();
    match &report.outcome {
        RunOutcome::ListOnly | RunOutcome::Completed => println!("{}", line.green().bold()),
        RunOutcome::ListAborted | RunOutcome::DetailAborted { .. } => {
            println!("{}", line.yellow().bold())
        }
        RunOutcome::Failed(_) => println!("{}", line.red().bold()),
    }

    if report.listing_partial {
        println!(
            "{}",
            "Session list is partial: a page request failed during listing".yellow()
        );
    }
    if let Some(path) = &report.index_path {
        println!("Session index: {}", path.display().to_string().cyan());
    }
}
