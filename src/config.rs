//! Configuration management for the exporter
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::cli::{Cli, Commands};
use crate::error::{ExportError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote service connection settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Outbound request credentials
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// Export pipeline settings
    #[serde(default)]
    pub export: ExportConfig,
}

/// Remote service connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the chat service; endpoints are resolved against it
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Value of the `X-App-Version` header
    #[serde(default = "default_app_version")]
    pub app_version: String,

    /// Value of the `X-Client-Version` header
    #[serde(default = "default_client_version")]
    pub client_version: String,

    /// Value of the `X-Client-Locale` header
    #[serde(default = "default_client_locale")]
    pub client_locale: String,
}

fn default_base_url() -> String {
    "https://chat.deepseek.com".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/142.0.0.0 Safari/537.36"
        .to_string()
}

fn default_app_version() -> String {
    "20241129.1".to_string()
}

fn default_client_version() -> String {
    "1.5.0".to_string()
}

fn default_client_locale() -> String {
    "zh_CN".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            user_agent: default_user_agent(),
            app_version: default_app_version(),
            client_version: default_client_version(),
            client_locale: default_client_locale(),
        }
    }
}

/// Credentials attached verbatim to every outbound request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Authorization header value, usually `Bearer <token>`
    #[serde(default)]
    pub authorization: String,

    /// Cookie header value copied from a logged-in browser session
    #[serde(default)]
    pub cookie: String,
}

impl CredentialsConfig {
    /// Ensure both credential values are present
    ///
    /// # Errors
    ///
    /// Returns `ExportError::MissingCredentials` naming the first empty value
    pub fn ensure_present(&self) -> Result<()> {
        if self.authorization.trim().is_empty() {
            return Err(
                ExportError::MissingCredentials("authorization is empty".to_string()).into(),
            );
        }
        if self.cookie.trim().is_empty() {
            return Err(ExportError::MissingCredentials("cookie is empty".to_string()).into());
        }
        Ok(())
    }
}

/// Export pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory holding `session_list.json`
    #[serde(default = "default_session_dir")]
    pub session_dir: PathBuf,

    /// Directory holding one Markdown document per session
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Download each session's messages after listing
    #[serde(default)]
    pub download_details: bool,

    /// Pause between session index pages (milliseconds)
    #[serde(default = "default_inter_page_delay_ms")]
    pub inter_page_delay_ms: u64,

    /// Pause between per-session detail downloads (milliseconds)
    #[serde(default = "default_inter_session_delay_ms")]
    pub inter_session_delay_ms: u64,

    /// Slice size used to poll for cancellation while pausing (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Number of messages requested per session
    #[serde(default = "default_detail_page_size")]
    pub detail_page_size: u32,
}

fn default_session_dir() -> PathBuf {
    PathBuf::from("deepseek_exports")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("deepseek_export_final")
}

fn default_inter_page_delay_ms() -> u64 {
    2000
}

fn default_inter_session_delay_ms() -> u64 {
    1500
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_detail_page_size() -> u32 {
    100
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            session_dir: default_session_dir(),
            output_dir: default_output_dir(),
            download_details: false,
            inter_page_delay_ms: default_inter_page_delay_ms(),
            inter_session_delay_ms: default_inter_session_delay_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            detail_page_size: default_detail_page_size(),
        }
    }
}

/// Resolved pipeline settings handed to the orchestrator
///
/// Built from [`ExportConfig`] with durations and paths in their final form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    /// Directory holding the session index file
    pub session_dir: PathBuf,
    /// Directory holding per-session documents
    pub output_dir: PathBuf,
    /// Pause between index pages
    pub inter_page_delay: Duration,
    /// Pause between per-session downloads
    pub inter_session_delay: Duration,
    /// Cancellation polling slice used inside every pause
    pub poll_interval: Duration,
    /// Messages requested per session
    pub detail_page_size: u32,
}

impl Default for ExportSettings {
    fn default() -> Self {
        ExportConfig::default().settings()
    }
}

impl ExportConfig {
    /// Convert into the orchestrator's resolved settings
    pub fn settings(&self) -> ExportSettings {
        ExportSettings {
            session_dir: self.session_dir.clone(),
            output_dir: self.output_dir.clone(),
            inter_page_delay: Duration::from_millis(self.inter_page_delay_ms),
            inter_session_delay: Duration::from_millis(self.inter_session_delay_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            detail_page_size: self.detail_page_size,
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ExportError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ExportError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(authorization) = std::env::var("DEEPSEEK_EXPORT_AUTHORIZATION") {
            self.credentials.authorization = authorization;
        }

        if let Ok(cookie) = std::env::var("DEEPSEEK_EXPORT_COOKIE") {
            self.credentials.cookie = cookie;
        }

        if let Ok(base_url) = std::env::var("DEEPSEEK_EXPORT_BASE_URL") {
            tracing::debug!(base_url = %base_url, "Env override: DEEPSEEK_EXPORT_BASE_URL");
            self.api.base_url = base_url;
        }

        if let Ok(timeout) = std::env::var("DEEPSEEK_EXPORT_TIMEOUT_SECONDS") {
            match timeout.parse::<u64>() {
                Ok(v) => self.api.timeout_seconds = v,
                Err(_) => {
                    tracing::warn!("Invalid DEEPSEEK_EXPORT_TIMEOUT_SECONDS: {}", timeout);
                }
            }
        }

        if let Ok(dir) = std::env::var("DEEPSEEK_EXPORT_SESSION_DIR") {
            self.export.session_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = std::env::var("DEEPSEEK_EXPORT_OUTPUT_DIR") {
            self.export.output_dir = PathBuf::from(dir);
        }

        if let Ok(details) = std::env::var("DEEPSEEK_EXPORT_DOWNLOAD_DETAILS") {
            match details.parse::<bool>() {
                Ok(v) => {
                    self.export.download_details = v;
                    tracing::debug!(
                        download_details = v,
                        "Env override: DEEPSEEK_EXPORT_DOWNLOAD_DETAILS"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for DEEPSEEK_EXPORT_DOWNLOAD_DETAILS: {}",
                        details
                    );
                }
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        match &cli.command {
            Commands::Export {
                details,
                authorization,
                cookie,
                session_dir,
                output_dir,
            } => {
                if *details {
                    self.export.download_details = true;
                }
                if let Some(authorization) = authorization {
                    self.credentials.authorization = authorization.clone();
                }
                if let Some(cookie) = cookie {
                    self.credentials.cookie = cookie.clone();
                }
                if let Some(dir) = session_dir {
                    self.export.session_dir = dir.clone();
                }
                if let Some(dir) = output_dir {
                    self.export.output_dir = dir.clone();
                }
            }
        }
    }

    /// Validate the configuration
    ///
    /// Credentials are not checked here; a run checks them when it starts.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let base = url::Url::parse(&self.api.base_url).map_err(|e| {
            ExportError::Config(format!("Invalid api.base_url {}: {}", self.api.base_url, e))
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ExportError::Config(format!(
                "api.base_url must use http or https, got {}",
                base.scheme()
            ))
            .into());
        }

        if self.api.timeout_seconds == 0 {
            return Err(ExportError::Config(
                "api.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.export.poll_interval_ms == 0 {
            return Err(ExportError::Config(
                "export.poll_interval_ms must be greater than 0".to_string(),
            )
            .into());
        }

        if self.export.detail_page_size == 0 {
            return Err(ExportError::Config(
                "export.detail_page_size must be greater than 0".to_string(),
            )
            .into());
        }

        if self.export.session_dir.as_os_str().is_empty() {
            return Err(
                ExportError::Config("export.session_dir cannot be empty".to_string()).into(),
            );
        }

        if self.export.output_dir.as_os_str().is_empty() {
            return Err(
                ExportError::Config("export.output_dir cannot be empty".to_string()).into(),
            );
        }

        Ok(())
    }
}
