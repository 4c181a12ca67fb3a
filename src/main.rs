//! DeepSeek Export - incremental chat history exporter
//!
#![doc = "Main entry point for the deepseek-export command."]

use anyhow::Result;

use deepseek_export::cli::{Cli, Commands};
use deepseek_export::commands;
use deepseek_export::config::Config;
use deepseek_export::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_logging(cli.verbose, cli.json_logs)?;

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Export { .. } => {
            tracing::info!(
                download_details = config.export.download_details,
                session_dir = %config.export.session_dir.display(),
                output_dir = %config.export.output_dir.display(),
                "Starting export"
            );
            commands::run_export(config).await?;
            Ok(())
        }
    }
}
