//! DeepSeek Export - incremental chat history exporter
//!
//! This library lists every chat session of a DeepSeek web account, saves
//! the session index as JSON, and optionally downloads each conversation
//! and writes it as a Markdown document.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `api`: `ChatSource` trait, HTTP client, wire types and a scripted fake
//! - `export`: lister, detail fetcher, document writer and run orchestrator
//! - `cancel`: shared cancellation signal with interruptible sleeps
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//! - `commands`: CLI command handlers
//! - `logging`: tracing subscriber setup
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use deepseek_export::{Config, DeepSeekClient, Exporter, TracingSink};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let client = DeepSeekClient::new(&config.api, &config.credentials)?;
//!     let exporter = Exporter::new(Arc::new(client), config.export.settings());
//!     let report = exporter.run(true, &TracingSink).await?;
//!     println!("{:?}", report.outcome);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cancel;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;

// Re-export commonly used types
pub use api::{ChatSource, DeepSeekClient, FakeChatSource, SessionId, SessionRecord};
pub use cancel::CancelFlag;
pub use config::{Config, ExportSettings};
pub use error::{ExportError, Result};
pub use export::{
    ChannelSink, Exporter, ProgressEvent, ProgressSink, RunOutcome, RunReport, TracingSink,
};
