//! Command-line interface definition for the exporter
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// DeepSeek Export - archive your remote chat history locally
///
/// Lists every chat session visible to the account, saves the index as
/// JSON and optionally downloads each conversation as a Markdown document.
#[derive(Parser, Debug, Clone)]
#[command(name = "deepseek-export")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Export the session index and, optionally, every conversation
    Export {
        /// Also download each conversation and write it as Markdown
        #[arg(short, long)]
        details: bool,

        /// Authorization header value (e.g. "Bearer ...")
        #[arg(long)]
        authorization: Option<String>,

        /// Full cookie string copied from the browser
        #[arg(long)]
        cookie: Option<String>,

        /// Directory receiving session_list.json
        #[arg(long)]
        session_dir: Option<PathBuf>,

        /// Directory receiving one Markdown document per session
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            json_logs: false,
            command: Commands::Export {
                details: false,
                authorization: None,
                cookie: None,
                session_dir: None,
                output_dir: None,
            },
        }
    }
}
