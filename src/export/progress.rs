//! Progress reporting from the export worker to its observer
//!
//! The worker never touches presentation directly. It emits
//! [`ProgressEvent`]s into a [`ProgressSink`]; each event renders as a
//! human-readable status line through `Display`.

use std::fmt;
use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::export::lister::CompleteReason;

/// Severity of a progress event, used for coloring and log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Normal progress
    Info,
    /// Something was skipped or stopped early
    Warn,
    /// A stage failed
    Error,
}

/// Status update emitted during an export run
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A run has started
    RunStarted {
        /// Whether per-session documents will be written
        download_details: bool,
    },
    /// An output directory was created
    DirectoryCreated {
        /// Created directory
        path: PathBuf,
    },
    /// Listing of the session index has begun
    ListingStarted,
    /// A page of the session index is being requested
    PageRequested {
        /// 1-based page number
        page: usize,
    },
    /// A page was received
    PageFetched {
        /// 1-based page number
        page: usize,
        /// Records on the page
        received: usize,
        /// Records not seen on earlier pages
        new_records: usize,
    },
    /// Records on a page had already been seen
    DuplicatesSkipped {
        /// 1-based page number
        page: usize,
        /// Number of repeated records
        count: usize,
    },
    /// A page request failed and listing stopped
    PageFailed {
        /// 1-based page number
        page: usize,
        /// Failure description
        reason: String,
    },
    /// Listing finished normally
    ListingComplete {
        /// Why pagination stopped
        reason: CompleteReason,
        /// Records collected
        total: usize,
    },
    /// Listing observed a cancellation request
    ListingCancelled {
        /// Records collected before stopping
        collected: usize,
    },
    /// The session index was not written because the run was aborted
    IndexNotSaved,
    /// The session index file was written
    IndexSaved {
        /// Path of the index file
        path: PathBuf,
        /// Records written
        total: usize,
    },
    /// List-only run finished
    ListOnlyFinished,
    /// Per-session downloads are starting
    DetailsStarted {
        /// Sessions to process
        total: usize,
    },
    /// A session is being processed
    SessionStarted {
        /// 1-based position
        index: usize,
        /// Sessions in the run
        total: usize,
        /// Session title
        title: String,
    },
    /// A session's history could not be fetched
    DetailUnavailable {
        /// Session title
        title: String,
        /// Failure description
        reason: String,
    },
    /// A document was written
    DocumentSaved {
        /// Name of the written file
        file_name: String,
    },
    /// A session produced no document
    SessionSkipped {
        /// Session title
        title: String,
    },
    /// Writing a session's document failed
    SessionFailed {
        /// Session title
        title: String,
        /// Failure description
        reason: String,
    },
    /// The per-session loop stopped on a cancellation request
    DetailsAborted {
        /// Sessions left unprocessed
        remaining: usize,
    },
    /// Every session was processed
    DetailsFinished {
        /// Documents written
        written: usize,
        /// Sessions skipped as empty
        skipped: usize,
        /// Sessions that failed
        failed: usize,
    },
    /// An unexpected error ended the run
    CriticalFailure {
        /// Failure description
        reason: String,
    },
}

impl ProgressEvent {
    /// Severity of this event
    pub fn severity(&self) -> Severity {
        match self {
            ProgressEvent::PageFailed { .. }
            | ProgressEvent::SessionFailed { .. }
            | ProgressEvent::CriticalFailure { .. } => Severity::Error,
            ProgressEvent::DuplicatesSkipped { .. }
            | ProgressEvent::ListingCancelled { .. }
            | ProgressEvent::IndexNotSaved
            | ProgressEvent::DetailUnavailable { .. }
            | ProgressEvent::SessionSkipped { .. }
            | ProgressEvent::DetailsAborted { .. } => Severity::Warn,
            ProgressEvent::ListingComplete { reason, .. } if reason.is_guard() => Severity::Warn,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::RunStarted { download_details } => {
                let mode = if *download_details {
                    "index and documents"
                } else {
                    "index only"
                };
                write!(f, "Export started ({})", mode)
            }
            ProgressEvent::DirectoryCreated { path } => {
                write!(f, "Created directory: {}", path.display())
            }
            ProgressEvent::ListingStarted => f.write_str("Fetching session list..."),
            ProgressEvent::PageRequested { page } => write!(f, "  -> Requesting page {}...", page),
            ProgressEvent::PageFetched {
                received,
                new_records,
                ..
            } => write!(f, "     Fetched {}, new {}", received, new_records),
            ProgressEvent::DuplicatesSkipped { page, count } => {
                write!(f, "     Page {}: skipped {} duplicate sessions", page, count)
            }
            ProgressEvent::PageFailed { page, reason } => {
                write!(f, "  Request for page {} failed: {}", page, reason)
            }
            ProgressEvent::ListingComplete { reason, total } => match reason {
                CompleteReason::Exhausted => {
                    write!(f, "  Session list complete: {} sessions", total)
                }
                CompleteReason::EmptyPage => {
                    write!(f, "  No more sessions returned: {} sessions", total)
                }
                CompleteReason::NoNewRecords => write!(
                    f,
                    "  Page contained only duplicates, stopping ({} sessions, list may be truncated)",
                    total
                ),
                CompleteReason::CursorStalled => write!(
                    f,
                    "  Pagination cursor did not advance, stopping ({} sessions)",
                    total
                ),
            },
            ProgressEvent::ListingCancelled { collected } => write!(
                f,
                "Aborted while fetching session list ({} collected)",
                collected
            ),
            ProgressEvent::IndexNotSaved => {
                f.write_str("Aborted: incomplete session list was not saved")
            }
            ProgressEvent::IndexSaved { path, total } => write!(
                f,
                "Found {} sessions; session list saved to {}",
                total,
                path.display()
            ),
            ProgressEvent::ListOnlyFinished => {
                f.write_str("Detail download is off; saved the session list only")
            }
            ProgressEvent::DetailsStarted { total } => {
                write!(f, "Downloading {} conversations...", total)
            }
            ProgressEvent::SessionStarted {
                index,
                total,
                title,
            } => write!(f, "[{}/{}] Processing: {}", index, total, title),
            ProgressEvent::DetailUnavailable { title, reason } => {
                write!(f, "  {}: history unavailable ({})", title, reason)
            }
            ProgressEvent::DocumentSaved { file_name } => write!(f, "  Saved: {}", file_name),
            ProgressEvent::SessionSkipped { title } => {
                write!(f, "  {}: skipped: empty", title)
            }
            ProgressEvent::SessionFailed { title, reason } => {
                write!(f, "  {}: processing failed: {}", title, reason)
            }
            ProgressEvent::DetailsAborted { remaining } => write!(
                f,
                "Aborted: {} remaining sessions were not processed",
                remaining
            ),
            ProgressEvent::DetailsFinished {
                written,
                skipped,
                failed,
            } => write!(
                f,
                "All sessions processed: {} saved, {} skipped, {} failed",
                written, skipped, failed
            ),
            ProgressEvent::CriticalFailure { reason } => {
                write!(f, "CRITICAL ERROR: {}", reason)
            }
        }
    }
}

/// Observer of export progress
///
/// Implementations must be cheap and must not block; the worker calls
/// `report` inline.
pub trait ProgressSink: Send + Sync {
    /// Receive one event
    fn report(&self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn report(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Sink forwarding events over an unbounded channel
///
/// The receiving half is typically drained by the supervising task.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver for its events
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn report(&self, event: &ProgressEvent) {
        // The observer may have gone away; progress is best effort.
        let _ = self.tx.send(event.clone());
    }
}

/// Hand `event` to `sink`
///
/// Nothing is logged here; a sink that wants events in the log is wrapped in
/// or replaced by [`TracingSink`].
pub(crate) fn emit(sink: &dyn ProgressSink, event: ProgressEvent) {
    sink.report(&event);
}

/// Sink writing every event to `tracing` at a level matching its severity
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn report(&self, event: &ProgressEvent) {
        match event.severity() {
            Severity::Info => tracing::info!("{}", event),
            Severity::Warn => tracing::warn!("{}", event),
            Severity::Error => tracing::error!("{}", event),
        }
    }
}
