//! In-process scripted chat source for tests
//!
//! [`FakeChatSource`] replays a fixed sequence of page responses and serves
//! session histories from a map, recording every request it receives. Once
//! the page script is exhausted it answers with empty pages.
//!
//! It can also trip a [`CancelFlag`] after a given number of page or history
//! requests, which lets tests place an abort at an exact point of a run.
//!
//! # Example
//!
//! ```
//! use deepseek_export::api::{ChatSource, FakeChatSource, SessionPage, SessionRecord};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let source = FakeChatSource::new()
//!     .with_page(SessionPage::new(vec![SessionRecord::new("a", "A", 2.0)], false));
//!
//! let page = source.fetch_page(None).await.unwrap();
//! assert_eq!(page.sessions.len(), 1);
//! assert_eq!(source.requested_cursors(), vec![None]);
//! # }
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::api::{ChatSource, DetailOutcome, SessionId, SessionPage};
use crate::cancel::CancelFlag;
use crate::error::{ExportError, Result};

#[derive(Debug, Default)]
struct FakeState {
    pages: VecDeque<std::result::Result<SessionPage, String>>,
    histories: HashMap<SessionId, DetailOutcome>,
    cursors: Vec<Option<String>>,
    history_requests: Vec<SessionId>,
}

/// Scripted [`ChatSource`]
#[derive(Debug, Default)]
pub struct FakeChatSource {
    state: Mutex<FakeState>,
    cancel_after_pages: Option<(usize, CancelFlag)>,
    cancel_after_histories: Option<(usize, CancelFlag)>,
}

impl FakeChatSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a page response
    pub fn with_page(self, page: SessionPage) -> Self {
        self.state().pages.push_back(Ok(page));
        self
    }

    /// Queue a failing page response
    pub fn with_page_error(self, reason: &str) -> Self {
        self.state().pages.push_back(Err(reason.to_string()));
        self
    }

    /// Serve `messages` as the `chat_messages` of a session's history
    pub fn with_history(self, session_id: impl Into<SessionId>, messages: Vec<Value>) -> Self {
        let envelope = json!({"data": {"biz_data": {"chat_messages": messages}}});
        self.with_history_outcome(session_id, DetailOutcome::Available(envelope))
    }

    /// Serve a specific outcome for a session's history
    pub fn with_history_outcome(
        self,
        session_id: impl Into<SessionId>,
        outcome: DetailOutcome,
    ) -> Self {
        self.state().histories.insert(session_id.into(), outcome);
        self
    }

    /// Set `flag` once `count` page requests have been answered
    pub fn cancel_after_pages(mut self, count: usize, flag: CancelFlag) -> Self {
        self.cancel_after_pages = Some((count, flag));
        self
    }

    /// Set `flag` once `count` history requests have been answered
    pub fn cancel_after_histories(mut self, count: usize, flag: CancelFlag) -> Self {
        self.cancel_after_histories = Some((count, flag));
        self
    }

    /// Cursors received by `fetch_page`, in order
    pub fn requested_cursors(&self) -> Vec<Option<String>> {
        self.state().cursors.clone()
    }

    /// Session ids received by `fetch_history`, in order
    pub fn requested_histories(&self) -> Vec<SessionId> {
        self.state().history_requests.clone()
    }
}

fn trip(trigger: &Option<(usize, CancelFlag)>, seen: usize) {
    if let Some((count, flag)) = trigger {
        if seen >= *count {
            flag.cancel();
        }
    }
}

#[async_trait]
impl ChatSource for FakeChatSource {
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<SessionPage> {
        let (response, seen) = {
            let mut state = self.state();
            state.cursors.push(cursor.map(str::to_string));
            let response = state.pages.pop_front().unwrap_or_else(|| Ok(SessionPage::default()));
            (response, state.cursors.len())
        };
        trip(&self.cancel_after_pages, seen);
        response.map_err(|reason| ExportError::Transport(reason).into())
    }

    async fn fetch_history(&self, session_id: &SessionId, _count: u32) -> DetailOutcome {
        let (outcome, seen) = {
            let mut state = self.state();
            state.history_requests.push(session_id.clone());
            let outcome = state
                .histories
                .get(session_id)
                .cloned()
                .unwrap_or_else(|| DetailOutcome::Unavailable("HTTP 404".to_string()));
            (outcome, state.history_requests.len())
        };
        trip(&self.cancel_after_histories, seen);
        outcome
    }
}
