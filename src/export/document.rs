//! Markdown rendering and persistence of one session's history
//!
//! A document consists of a title heading, a metadata block with the session
//! id and last-updated time, and one role-labelled section per non-empty
//! message, each followed by a separator. Writing the same session again
//! overwrites the previous file.

use std::fmt::Write as _;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::api::{history_messages, ChatMessage, Role, SessionRecord};
use crate::error::Result;
use crate::export::filename::document_file_name;
use crate::export::normalize::normalize;

/// Result of writing one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// A document was written at this path
    Written(PathBuf),
    /// No payload, unexpected payload shape, or zero messages
    SkippedEmpty,
}

/// Section label for a message role
///
/// Every role other than user and assistant shares one generic label.
fn role_label(role: &Role) -> &'static str {
    match role {
        Role::User => "User",
        Role::Assistant => "Assistant",
        Role::Other(_) => "Message",
    }
}

/// Nanoseconds for a fractional second, capped below one full second
fn fraction_nanos(fract: f64) -> u32 {
    ((fract.abs() * 1e9) as u32).min(999_999_999)
}

/// Render `updated_at` as its raw value plus RFC 3339 when it is a valid timestamp
fn format_updated_at(updated_at: Option<f64>) -> String {
    let Some(ts) = updated_at else {
        return String::new();
    };

    let secs = ts.trunc() as i64;
    match DateTime::<Utc>::from_timestamp(secs, fraction_nanos(ts.fract())) {
        Some(dt) if ts.is_finite() && ts >= 0.0 => {
            format!("{} ({})", ts, dt.format("%Y-%m-%dT%H:%M:%SZ"))
        }
        _ => ts.to_string(),
    }
}

/// Render a session and its messages as Markdown
///
/// Messages whose normalized content is empty are left out.
pub fn render(session: &SessionRecord, messages: &[ChatMessage]) -> String {
    let mut doc = String::new();
    let _ = write!(
        doc,
        "# {}\n\n> ID: {}\n> Updated: {}\n\n---\n\n",
        session.display_title(),
        session.id(),
        format_updated_at(session.updated_at())
    );

    for message in messages {
        let content = normalize(message);
        if content.is_empty() {
            continue;
        }
        let _ = write!(
            doc,
            "### {}:\n\n{}\n\n---\n\n",
            role_label(&message.role),
            content
        );
    }

    doc
}

/// Writes one Markdown document per session into a directory
#[derive(Debug, Clone)]
pub struct DocumentWriter {
    output_dir: PathBuf,
}

impl DocumentWriter {
    /// Create a writer targeting `output_dir`; the directory is created on first write
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Write the document for `session` from its history payload
    ///
    /// # Arguments
    ///
    /// * `session` - Session metadata, used for the heading and filename
    /// * `payload` - Raw history response, `None` if it could not be fetched
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created or the file cannot be written
    pub fn write(&self, session: &SessionRecord, payload: Option<&Value>) -> Result<WriteOutcome> {
        let Some(payload) = payload else {
            return Ok(WriteOutcome::SkippedEmpty);
        };

        let messages = match history_messages(payload) {
            Ok(messages) => messages,
            Err(e) => {
                tracing::debug!(session_id = %session.id(), error = %e, "No usable history");
                return Ok(WriteOutcome::SkippedEmpty);
            }
        };
        if messages.is_empty() {
            return Ok(WriteOutcome::SkippedEmpty);
        }

        std::fs::create_dir_all(&self.output_dir)?;

        let path = self
            .output_dir
            .join(document_file_name(session.display_title(), session.id()));
        std::fs::write(&path, render(session, &messages))?;

        tracing::debug!(path = %path.display(), messages = messages.len(), "Wrote document");
        Ok(WriteOutcome::Written(path))
    }
}
