//! Cursor-paginated crawl of the session index
//!
//! Pages are requested strictly one after another. Each record is kept the
//! first time its id is seen, so the result holds every id at most once in
//! first-seen order. Pagination stops when the server runs out of pages, on
//! an empty page, on a page that adds nothing new, when the cursor stops
//! advancing, on a failed request, or when cancellation is observed.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::api::{ChatSource, SessionId, SessionRecord};
use crate::cancel::CancelFlag;
use crate::export::progress::{emit, ProgressEvent, ProgressSink};

/// Why listing finished normally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompleteReason {
    /// The server reported no further pages
    Exhausted,
    /// The server returned a page without records
    EmptyPage,
    /// A page after the first contained only known ids
    NoNewRecords,
    /// The next cursor equalled the current one, or could not be computed
    CursorStalled,
}

impl CompleteReason {
    /// Whether a loop guard, rather than the server, ended pagination
    pub fn is_guard(self) -> bool {
        matches!(
            self,
            CompleteReason::NoNewRecords | CompleteReason::CursorStalled
        )
    }
}

/// How a listing ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListCompletion {
    /// Pagination ended on its own
    Complete(CompleteReason),
    /// A page request failed; the records are partial
    Error(String),
    /// Cancellation was observed; the records are partial
    Cancelled,
}

/// Records collected by a listing and how it ended
#[derive(Debug, Clone, PartialEq)]
pub struct ListingOutcome {
    /// Deduplicated records in first-seen order
    pub sessions: Vec<SessionRecord>,
    /// Termination state
    pub completion: ListCompletion,
    /// Page requests issued
    pub pages: usize,
    /// Records dropped as duplicates
    pub duplicates: usize,
}

/// Session index crawler
pub struct SessionLister {
    source: Arc<dyn ChatSource>,
    page_delay: Duration,
    poll_interval: Duration,
}

impl SessionLister {
    /// Create a lister
    ///
    /// # Arguments
    ///
    /// * `source` - Page source
    /// * `page_delay` - Pause between page requests
    /// * `poll_interval` - Cancellation polling slice used during the pause
    pub fn new(source: Arc<dyn ChatSource>, page_delay: Duration, poll_interval: Duration) -> Self {
        Self {
            source,
            page_delay,
            poll_interval,
        }
    }

    /// Crawl the session index until it ends, fails, or is cancelled
    ///
    /// Whatever was collected is returned in every case; callers decide from
    /// [`ListingOutcome::completion`] whether the list may be treated as whole.
    pub async fn run(&self, cancel: &CancelFlag, sink: &dyn ProgressSink) -> ListingOutcome {
        let mut cursor: Option<String> = None;
        let mut seen: HashSet<SessionId> = HashSet::new();
        let mut outcome = ListingOutcome {
            sessions: Vec::new(),
            completion: ListCompletion::Cancelled,
            pages: 0,
            duplicates: 0,
        };

        emit(sink, ProgressEvent::ListingStarted);

        let completion = loop {
            if cancel.is_cancelled() {
                emit(
                    sink,
                    ProgressEvent::ListingCancelled {
                        collected: outcome.sessions.len(),
                    },
                );
                break ListCompletion::Cancelled;
            }

            outcome.pages += 1;
            let page_no = outcome.pages;
            emit(sink, ProgressEvent::PageRequested { page: page_no });

            let page = match self.source.fetch_page(cursor.as_deref()).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(page = page_no, error = %e, "Session page request failed");
                    emit(
                        sink,
                        ProgressEvent::PageFailed {
                            page: page_no,
                            reason: e.to_string(),
                        },
                    );
                    break ListCompletion::Error(e.to_string());
                }
            };

            if page.entries() == 0 {
                debug!(page = page_no, "Empty session page");
                break self.finish(sink, CompleteReason::EmptyPage, outcome.sessions.len());
            }
            if page.malformed > 0 {
                warn!(page = page_no, count = page.malformed, "Page had unreadable entries");
            }

            let received = page.sessions.len();
            let next_cursor = page.next_cursor;

            let mut new_records = 0;
            for record in page.sessions {
                if seen.insert(record.id().clone()) {
                    outcome.sessions.push(record);
                    new_records += 1;
                }
            }
            let duplicates = received - new_records;
            outcome.duplicates += duplicates;

            emit(
                sink,
                ProgressEvent::PageFetched {
                    page: page_no,
                    received,
                    new_records,
                },
            );
            if duplicates > 0 {
                emit(
                    sink,
                    ProgressEvent::DuplicatesSkipped {
                        page: page_no,
                        count: duplicates,
                    },
                );
            }

            if page_no > 1 && new_records == 0 {
                break self.finish(sink, CompleteReason::NoNewRecords, outcome.sessions.len());
            }

            match next_cursor {
                Some(next) if Some(&next) != cursor.as_ref() => {
                    debug!(page = page_no, cursor = %next, "Advancing cursor");
                    cursor = Some(next);
                }
                _ => {
                    break self.finish(sink, CompleteReason::CursorStalled, outcome.sessions.len());
                }
            }

            if !page.has_more {
                break self.finish(sink, CompleteReason::Exhausted, outcome.sessions.len());
            }

            cancel.sleep(self.page_delay, self.poll_interval).await;
        };
        outcome.completion = completion;

        info!(
            sessions = outcome.sessions.len(),
            pages = outcome.pages,
            duplicates = outcome.duplicates,
            completion = ?outcome.completion,
            "Session listing finished"
        );
        outcome
    }

    fn finish(&self, sink: &dyn ProgressSink, reason: CompleteReason, total: usize) -> ListCompletion {
        if reason.is_guard() {
            warn!(?reason, total, "Pagination stopped by loop guard");
        }
        emit(sink, ProgressEvent::ListingComplete { reason, total });
        ListCompletion::Complete(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{FakeChatSource, SessionPage};
    use std::time::Instant;

    fn record(id: &str, updated_at: f64) -> SessionRecord {
        SessionRecord::new(id, &format!("title {}", id), updated_at)
    }

    fn lister(source: Arc<FakeChatSource>) -> SessionLister {
        SessionLister::new(source, Duration::from_millis(1), Duration::from_millis(1))
    }

    fn ids(outcome: &ListingOutcome) -> Vec<String> {
        outcome.sessions.iter().map(|s| s.id().to_string()).collect()
    }

    fn quiet(_: &ProgressEvent) {}

    #[tokio::test]
    async fn test_single_page_then_exhausted() {
        let source = Arc::new(FakeChatSource::new().with_page(SessionPage::new(
            vec![record("a", 3.0), record("b", 2.0), record("c", 1.0)],
            false,
        )));

        let outcome = lister(source.clone()).run(&CancelFlag::new(), &quiet).await;
        assert_eq!(ids(&outcome), vec!["a", "b", "c"]);
        assert_eq!(
            outcome.completion,
            ListCompletion::Complete(CompleteReason::Exhausted)
        );
        assert_eq!(source.requested_cursors(), vec![None]);
    }

    #[tokio::test]
    async fn test_cursor_passed_with_three_decimals() {
        let source = Arc::new(
            FakeChatSource::new()
                .with_page(SessionPage::new(vec![record("a", 5.5), record("b", 4.25)], true))
                .with_page(SessionPage::new(vec![record("c", 3.0)], false)),
        );

        let outcome = lister(source.clone()).run(&CancelFlag::new(), &quiet).await;
        assert_eq!(ids(&outcome), vec!["a", "b", "c"]);
        assert_eq!(
            source.requested_cursors(),
            vec![None, Some("4.250".to_string())]
        );
    }

    #[tokio::test]
    async fn test_deduplicates_across_pages_in_first_seen_order() {
        let source = Arc::new(
            FakeChatSource::new()
                .with_page(SessionPage::new(vec![record("a", 5.0), record("b", 4.0)], true))
                .with_page(SessionPage::new(
                    vec![record("b", 4.0), record("c", 3.0), record("a", 2.5)],
                    true,
                ))
                .with_page(SessionPage::new(vec![record("d", 2.0)], false)),
        );

        let outcome = lister(source).run(&CancelFlag::new(), &quiet).await;
        assert_eq!(ids(&outcome), vec!["a", "b", "c", "d"]);
        assert_eq!(outcome.duplicates, 2);
    }

    #[tokio::test]
    async fn test_page_without_new_ids_stops() {
        let source = Arc::new(
            FakeChatSource::new()
                .with_page(SessionPage::new(vec![record("a", 5.0), record("b", 4.0)], true))
                .with_page(SessionPage::new(vec![record("a", 3.0), record("b", 2.0)], true))
                .with_page(SessionPage::new(vec![record("z", 1.0)], false)),
        );

        let outcome = lister(source.clone()).run(&CancelFlag::new(), &quiet).await;
        assert_eq!(ids(&outcome), vec!["a", "b"]);
        assert_eq!(
            outcome.completion,
            ListCompletion::Complete(CompleteReason::NoNewRecords)
        );
        assert_eq!(source.requested_cursors().len(), 2);
    }

    #[tokio::test]
    async fn test_repeated_cursor_stops() {
        let source = Arc::new(
            FakeChatSource::new()
                .with_page(SessionPage::new(vec![record("a", 7.0)], true))
                .with_page(SessionPage::new(vec![record("b", 7.0004)], true))
                .with_page(SessionPage::new(vec![record("c", 1.0)], false)),
        );

        let outcome = lister(source.clone()).run(&CancelFlag::new(), &quiet).await;
        assert_eq!(ids(&outcome), vec!["a", "b"]);
        assert_eq!(
            outcome.completion,
            ListCompletion::Complete(CompleteReason::CursorStalled)
        );
        assert_eq!(source.requested_cursors().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_timestamp_stalls() {
        let last = record("b", 0.0).with_field("updated_at", serde_json::Value::Null);
        let source = Arc::new(
            FakeChatSource::new().with_page(SessionPage::new(vec![record("a", 2.0), last], true)),
        );

        let outcome = lister(source).run(&CancelFlag::new(), &quiet).await;
        assert_eq!(outcome.sessions.len(), 2);
        assert_eq!(
            outcome.completion,
            ListCompletion::Complete(CompleteReason::CursorStalled)
        );
    }

    #[tokio::test]
    async fn test_empty_first_page_completes() {
        let source = Arc::new(FakeChatSource::new().with_page(SessionPage::new(vec![], true)));
        let outcome = lister(source).run(&CancelFlag::new(), &quiet).await;
        assert!(outcome.sessions.is_empty());
        assert_eq!(
            outcome.completion,
            ListCompletion::Complete(CompleteReason::EmptyPage)
        );
    }

    #[tokio::test]
    async fn test_page_of_unreadable_entries_is_not_empty() {
        let unreadable = SessionPage::parse(&serde_json::json!({"data": {"biz_data": {
            "chat_sessions": [{"title": "no id", "updated_at": 3.0}],
            "has_more": true
        }}}))
        .unwrap();
        let source = Arc::new(
            FakeChatSource::new()
                .with_page(unreadable)
                .with_page(SessionPage::new(vec![record("a", 2.0)], false)),
        );

        let outcome = lister(source.clone()).run(&CancelFlag::new(), &quiet).await;
        assert_eq!(ids(&outcome), vec!["a"]);
        assert_eq!(
            outcome.completion,
            ListCompletion::Complete(CompleteReason::Exhausted)
        );
        assert_eq!(
            source.requested_cursors(),
            vec![None, Some("3.000".to_string())]
        );
    }

    #[tokio::test]
    async fn test_error_keeps_accumulated_records() {
        let source = Arc::new(
            FakeChatSource::new()
                .with_page(SessionPage::new(vec![record("a", 5.0)], true))
                .with_page_error("server returned HTTP 502"),
        );

        let outcome = lister(source).run(&CancelFlag::new(), &quiet).await;
        assert_eq!(ids(&outcome), vec!["a"]);
        assert!(
            matches!(outcome.completion, ListCompletion::Error(ref msg) if msg.contains("502"))
        );
    }

    #[tokio::test]
    async fn test_cancel_before_first_page() {
        let source = Arc::new(FakeChatSource::new());
        let cancel = CancelFlag::new();
        cancel.cancel();

        let outcome = lister(source.clone()).run(&cancel, &quiet).await;
        assert_eq!(outcome.completion, ListCompletion::Cancelled);
        assert!(source.requested_cursors().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_during_page_delay_is_prompt() {
        let source = Arc::new(
            FakeChatSource::new()
                .with_page(SessionPage::new(vec![record("a", 5.0)], true))
                .with_page(SessionPage::new(vec![record("b", 4.0)], false)),
        );
        let lister = SessionLister::new(
            source.clone(),
            Duration::from_secs(2),
            Duration::from_millis(100),
        );
        let cancel = CancelFlag::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            canceller.cancel();
        });

        let start = Instant::now();
        let outcome = lister.run(&cancel, &quiet).await;

        assert!(start.elapsed() < Duration::from_millis(150 + 200));
        assert_eq!(outcome.completion, ListCompletion::Cancelled);
        assert_eq!(ids(&outcome), vec!["a"]);
        assert_eq!(source.requested_cursors().len(), 1);
    }

    #[tokio::test]
    async fn test_progress_reports_counts() {
        use std::sync::Mutex;

        let source = Arc::new(
            FakeChatSource::new()
                .with_page(SessionPage::new(vec![record("a", 5.0), record("b", 4.0)], true))
                .with_page(SessionPage::new(vec![record("b", 4.0), record("c", 3.0)], false)),
        );
        let events = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&events);
        let sink = move |e: &ProgressEvent| captured.lock().unwrap().push(e.clone());

        lister(source).run(&CancelFlag::new(), &sink).await;

        let events = events.lock().unwrap();
        assert!(events.contains(&ProgressEvent::PageFetched {
            page: 2,
            received: 2,
            new_records: 1
        }));
        assert!(events.contains(&ProgressEvent::DuplicatesSkipped { page: 2, count: 1 }));
        assert!(events.contains(&ProgressEvent::ListingComplete {
            reason: CompleteReason::Exhausted,
            total: 3
        }));
    }
}
