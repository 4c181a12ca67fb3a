//! Per-session history retrieval

use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::{ChatSource, DetailOutcome, SessionRecord};
use crate::export::progress::{emit, ProgressEvent, ProgressSink};

/// Fetches one session's history and reports when it is unavailable
pub struct DetailFetcher {
    source: Arc<dyn ChatSource>,
    page_size: u32,
}

impl DetailFetcher {
    /// Create a fetcher requesting up to `page_size` messages per session
    pub fn new(source: Arc<dyn ChatSource>, page_size: u32) -> Self {
        Self { source, page_size }
    }

    /// Retrieve the history of `session`
    ///
    /// Failures come back as [`DetailOutcome::Unavailable`] and are reported
    /// to `sink`; they never end the run.
    pub async fn fetch(&self, session: &SessionRecord, sink: &dyn ProgressSink) -> DetailOutcome {
        debug!(session_id = %session.id(), count = self.page_size, "Fetching history");
        let outcome = self.source.fetch_history(session.id(), self.page_size).await;

        if let DetailOutcome::Unavailable(reason) = &outcome {
            warn!(session_id = %session.id(), %reason, "History unavailable");
            emit(
                sink,
                ProgressEvent::DetailUnavailable {
                    title: session.display_title().to_string(),
                    reason: reason.clone(),
                },
            );
        }
        outcome
    }
}
