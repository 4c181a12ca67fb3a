//! Logging setup for the exporter binary
//!
//! Human-readable or JSON output on stderr, filtered by `RUST_LOG` when it
//! is set and otherwise by a crate-level default.

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive
///
/// `verbose` raises the crate's level from `info` to `debug`.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "deepseek_export=debug"
    } else {
        "deepseek_export=info"
    }
}

/// Initialize the global tracing subscriber
///
/// # Arguments
///
/// * `verbose` - Use debug level for this crate when `RUST_LOG` is unset
/// * `json_format` - Emit JSON lines instead of formatted text
///
/// # Errors
///
/// Returns error if the filter cannot be built or a subscriber is already set
pub fn init_logging(verbose: bool, json_format: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(verbose)))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    if json_format {
        let layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr);
        registry.with(layer).try_init()?;
    } else {
        let layer = fmt::layer().with_target(true).with_writer(std::io::stderr);
        registry.with(layer).try_init()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(false), "deepseek_export=info");
        assert_eq!(default_directive(true), "deepseek_export=debug");
    }

    #[test]
    fn test_default_directives_parse() {
        assert!(EnvFilter::try_new(default_directive(false)).is_ok());
        assert!(EnvFilter::try_new(default_directive(true)).is_ok());
    }
}
