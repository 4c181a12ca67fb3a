//! Remote chat service abstraction
//!
//! The export pipeline talks to the service only through the [`ChatSource`]
//! trait: one call per page of the session index and one call per session
//! history. [`DeepSeekClient`] is the HTTP implementation; [`FakeChatSource`]
//! replays scripted responses in process.

pub mod client;
pub mod fake;
pub mod types;

use crate::error::Result;
use async_trait::async_trait;

pub use client::DeepSeekClient;
pub use fake::FakeChatSource;
pub use types::{
    history_messages, ChatMessage, DetailOutcome, Fragment, MessageContent, Role, SessionId,
    SessionPage, SessionRecord, UNTITLED,
};

/// Source of session index pages and session histories
///
/// Requests are issued strictly one at a time by the export pipeline.
#[async_trait]
pub trait ChatSource: Send + Sync {
    /// Fetch one page of the session index
    ///
    /// # Arguments
    ///
    /// * `cursor` - `updated_at` cursor from the previous page, `None` for the first page
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be sent, the server reports a
    /// non-success status, or the body is not JSON. An unexpected JSON shape
    /// is not an error; it yields an empty page.
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<SessionPage>;

    /// Fetch the message history of one session
    ///
    /// Never fails; transport problems are reported as
    /// [`DetailOutcome::Unavailable`].
    async fn fetch_history(&self, session_id: &SessionId, count: u32) -> DetailOutcome;
}
