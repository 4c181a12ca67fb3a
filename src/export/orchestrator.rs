//! Export run sequencing
//!
//! One run lists the session index, saves it, and then, when requested,
//! downloads and writes every session in listed order. All remote calls
//! happen sequentially on the task executing the run. A shared
//! [`CancelFlag`] is polled before each page, right after listing, before
//! each session, and inside every pause.
//!
//! At most one run may be active per [`Exporter`]. The running state is
//! cleared on every exit path, including failures.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::api::ChatSource;
use crate::cancel::CancelFlag;
use crate::config::ExportSettings;
use crate::error::{ExportError, Result};
use crate::export::detail::DetailFetcher;
use crate::export::document::{DocumentWriter, WriteOutcome};
use crate::export::index::save_index;
use crate::export::lister::{ListCompletion, SessionLister};
use crate::export::progress::{emit, ProgressEvent, ProgressSink};

/// Terminal state of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The index was saved and detail download was not requested
    ListOnly,
    /// The index was saved and every session was processed
    Completed,
    /// Cancelled during listing; the index was not saved
    ListAborted,
    /// Cancelled during the per-session loop
    DetailAborted {
        /// Sessions left unprocessed
        remaining: usize,
    },
    /// An unexpected error ended the run
    Failed(String),
}

impl RunOutcome {
    /// Whether the run ended because of a cancellation request
    pub fn is_aborted(&self) -> bool {
        matches!(
            self,
            RunOutcome::ListAborted | RunOutcome::DetailAborted { .. }
        )
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Terminal state
    pub outcome: RunOutcome,
    /// Distinct sessions collected by listing
    pub sessions_listed: usize,
    /// Listing stopped on a failed request; the index holds a partial list
    pub listing_partial: bool,
    /// Path of the saved index, if it was saved
    pub index_path: Option<std::path::PathBuf>,
    /// Documents written
    pub documents_written: usize,
    /// Sessions that produced no document
    pub sessions_skipped: usize,
    /// Sessions whose document could not be written
    pub sessions_failed: usize,
    /// Sessions not processed because of cancellation
    pub sessions_remaining: usize,
}

impl RunReport {
    fn new() -> Self {
        Self {
            outcome: RunOutcome::Failed("run did not start".to_string()),
            sessions_listed: 0,
            listing_partial: false,
            index_path: None,
            documents_written: 0,
            sessions_skipped: 0,
            sessions_failed: 0,
            sessions_remaining: 0,
        }
    }
}

/// Clears the running flag when dropped
struct RunGuard {
    running: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Export orchestrator
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use deepseek_export::api::{FakeChatSource, SessionPage, SessionRecord};
/// use deepseek_export::config::ExportSettings;
/// use deepseek_export::export::{Exporter, RunOutcome, TracingSink};
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let dir = tempfile::tempdir()?;
/// let source = FakeChatSource::new()
///     .with_page(SessionPage::new(vec![SessionRecord::new("a", "A", 1.0)], false));
/// let settings = ExportSettings {
///     session_dir: dir.path().join("index"),
///     output_dir: dir.path().join("docs"),
///     ..ExportSettings::default()
/// };
///
/// let exporter = Exporter::new(Arc::new(source), settings);
/// let report = exporter.run(false, &TracingSink).await?;
/// assert_eq!(report.outcome, RunOutcome::ListOnly);
/// assert_eq!(report.sessions_listed, 1);
/// # Ok(())
/// # }
/// ```
pub struct Exporter {
    source: Arc<dyn ChatSource>,
    settings: ExportSettings,
    cancel: CancelFlag,
    running: Arc<AtomicBool>,
}

impl Exporter {
    /// Create an exporter over `source`
    pub fn new(source: Arc<dyn ChatSource>, settings: ExportSettings) -> Self {
        Self {
            source,
            settings,
            cancel: CancelFlag::new(),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create an exporter observing an existing cancellation signal
    pub fn with_cancel_flag(
        source: Arc<dyn ChatSource>,
        settings: ExportSettings,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            cancel,
            ..Self::new(source, settings)
        }
    }

    /// Settings used by every run
    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Handle to this exporter's cancellation signal
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Request cancellation of the active run
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether a run is in progress
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn claim(&self) -> Result<RunGuard> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ExportError::RunActive.into());
        }
        self.cancel.reset();
        Ok(RunGuard {
            running: Arc::clone(&self.running),
        })
    }

    /// Execute one run on the current task
    ///
    /// # Arguments
    ///
    /// * `download_details` - Also write one document per session
    /// * `sink` - Receiver of progress events
    ///
    /// # Errors
    ///
    /// Returns `ExportError::RunActive` if another run is in progress.
    /// Failures during the run do not produce an error; they end the run
    /// with [`RunOutcome::Failed`].
    pub async fn run(&self, download_details: bool, sink: &dyn ProgressSink) -> Result<RunReport> {
        let guard = self.claim()?;
        Ok(self.run_claimed(guard, download_details, sink).await)
    }

    /// Execute one run on a background task
    ///
    /// The single-run check happens before this returns, so a rejected run
    /// never spawns.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::RunActive` if another run is in progress
    pub fn spawn(
        self: &Arc<Self>,
        download_details: bool,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<JoinHandle<RunReport>> {
        let guard = self.claim()?;
        let this = Arc::clone(self);
        Ok(tokio::spawn(async move {
            this.run_claimed(guard, download_details, sink.as_ref())
                .await
        }))
    }

    async fn run_claimed(
        &self,
        _guard: RunGuard,
        download_details: bool,
        sink: &dyn ProgressSink,
    ) -> RunReport {
        let mut report = RunReport::new();
        let outcome = match self.execute(download_details, sink, &mut report).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Export run failed");
                emit(
                    sink,
                    ProgressEvent::CriticalFailure {
                        reason: e.to_string(),
                    },
                );
                RunOutcome::Failed(e.to_string())
            }
        };
        report.outcome = outcome;
        info!(outcome = ?report.outcome, "Export run finished");
        report
    }

    async fn execute(
        &self,
        download_details: bool,
        sink: &dyn ProgressSink,
        report: &mut RunReport,
    ) -> Result<RunOutcome> {
        emit(sink, ProgressEvent::RunStarted { download_details });

        ensure_dir(&self.settings.session_dir, sink)?;
        if download_details {
            ensure_dir(&self.settings.output_dir, sink)?;
        }

        let lister = SessionLister::new(
            Arc::clone(&self.source),
            self.settings.inter_page_delay,
            self.settings.poll_interval,
        );
        let listing = lister.run(&self.cancel, sink).await;
        report.sessions_listed = listing.sessions.len();

        match &listing.completion {
            ListCompletion::Cancelled => {
                emit(sink, ProgressEvent::IndexNotSaved);
                return Ok(RunOutcome::ListAborted);
            }
            ListCompletion::Error(reason) => {
                warn!(%reason, collected = listing.sessions.len(), "Saving partial session list");
                report.listing_partial = true;
            }
            ListCompletion::Complete(_) => {}
        }

        if self.cancel.is_cancelled() {
            emit(sink, ProgressEvent::IndexNotSaved);
            return Ok(RunOutcome::ListAborted);
        }

        let path = save_index(&self.settings.session_dir, &listing.sessions)?;
        emit(
            sink,
            ProgressEvent::IndexSaved {
                path: path.clone(),
                total: listing.sessions.len(),
            },
        );
        report.index_path = Some(path);

        if !download_details {
            emit(sink, ProgressEvent::ListOnlyFinished);
            return Ok(RunOutcome::ListOnly);
        }

        let fetcher = DetailFetcher::new(Arc::clone(&self.source), self.settings.detail_page_size);
        let writer = DocumentWriter::new(&self.settings.output_dir);
        let total = listing.sessions.len();
        emit(sink, ProgressEvent::DetailsStarted { total });

        for (i, session) in listing.sessions.iter().enumerate() {
            if self.cancel.is_cancelled() {
                let remaining = total - i;
                report.sessions_remaining = remaining;
                emit(sink, ProgressEvent::DetailsAborted { remaining });
                return Ok(RunOutcome::DetailAborted { remaining });
            }

            let title = session.display_title().to_string();
            emit(
                sink,
                ProgressEvent::SessionStarted {
                    index: i + 1,
                    total,
                    title: title.clone(),
                },
            );

            let detail = fetcher.fetch(session, sink).await;
            match writer.write(session, detail.payload()) {
                Ok(WriteOutcome::Written(path)) => {
                    report.documents_written += 1;
                    let file_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    emit(sink, ProgressEvent::DocumentSaved { file_name });
                }
                Ok(WriteOutcome::SkippedEmpty) => {
                    report.sessions_skipped += 1;
                    emit(sink, ProgressEvent::SessionSkipped { title });
                }
                Err(e) => {
                    report.sessions_failed += 1;
                    error!(session_id = %session.id(), error = %e, "Failed to write document");
                    emit(
                        sink,
                        ProgressEvent::SessionFailed {
                            title,
                            reason: e.to_string(),
                        },
                    );
                }
            }

            if i + 1 < total {
                self.cancel
                    .sleep(self.settings.inter_session_delay, self.settings.poll_interval)
                    .await;
            }
        }

        emit(
            sink,
            ProgressEvent::DetailsFinished {
                written: report.documents_written,
                skipped: report.sessions_skipped,
                failed: report.sessions_failed,
            },
        );
        Ok(RunOutcome::Completed)
    }
}

fn ensure_dir(path: &std::path::Path, sink: &dyn ProgressSink) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
        emit(
            sink,
            ProgressEvent::DirectoryCreated {
                path: path.to_path_buf(),
            },
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{FakeChatSource, SessionPage, SessionRecord};
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    fn settings(dir: &TempDir) -> ExportSettings {
        ExportSettings {
            session_dir: dir.path().join("index"),
            output_dir: dir.path().join("docs"),
            inter_page_delay: Duration::from_millis(1),
            inter_session_delay: Duration::from_millis(1),
            poll_interval: Duration::from_millis(1),
            detail_page_size: 100,
        }
    }

    fn records(n: usize) -> Vec<SessionRecord> {
        (0..n)
            .map(|i| {
                SessionRecord::new(
                    format!("s{}", i).as_str(),
                    &format!("Chat {}", i),
                    (100 - i) as f64,
                )
            })
            .collect()
    }

    fn user_message(text: &str) -> Vec<Value> {
        vec![json!({"role": "USER", "content": text})]
    }

    fn doc_count(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path().join("docs"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<ProgressEvent>>,
    }

    impl ProgressSink for Recorder {
        fn report(&self, event: &ProgressEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    impl Recorder {
        fn lines(&self) -> Vec<String> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(ToString::to_string)
                .collect()
        }

        fn contains(&self, event: &ProgressEvent) -> bool {
            self.events.lock().unwrap().contains(event)
        }
    }

    #[tokio::test]
    async fn test_list_only_writes_index_and_no_documents() {
        let dir = TempDir::new().unwrap();
        let source = FakeChatSource::new().with_page(SessionPage::new(records(3), false));
        let exporter = Exporter::new(Arc::new(source), settings(&dir));
        let sink = Recorder::default();

        let report = exporter.run(false, &sink).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::ListOnly);
        let index = std::fs::read_to_string(dir.path().join("index/session_list.json")).unwrap();
        let saved: Vec<Value> = serde_json::from_str(&index).unwrap();
        assert_eq!(saved.len(), 3);
        assert!(!dir.path().join("docs").exists());
        assert!(sink.contains(&ProgressEvent::ListOnlyFinished));
        assert!(!exporter.is_running());
    }

    #[tokio::test]
    async fn test_full_run_writes_documents() {
        let dir = TempDir::new().unwrap();
        let source = FakeChatSource::new()
            .with_page(SessionPage::new(records(2), false))
            .with_history("s0", user_message("first"))
            .with_history("s1", user_message("second"));
        let exporter = Exporter::new(Arc::new(source), settings(&dir));
        let sink = Recorder::default();

        let report = exporter.run(true, &sink).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.documents_written, 2);
        assert!(dir.path().join("docs/Chat 0_s0.md").exists());
        assert!(dir.path().join("docs/Chat 1_s1.md").exists());
        assert!(sink.lines().contains(&"[2/2] Processing: Chat 1".to_string()));
    }

    #[tokio::test]
    async fn test_empty_history_is_skipped() {
        let dir = TempDir::new().unwrap();
        let source = FakeChatSource::new()
            .with_page(SessionPage::new(records(1), false))
            .with_history("s0", vec![]);
        let exporter = Exporter::new(Arc::new(source), settings(&dir));
        let sink = Recorder::default();

        let report = exporter.run(true, &sink).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.sessions_skipped, 1);
        assert_eq!(doc_count(&dir), 0);
        assert!(sink
            .lines()
            .iter()
            .any(|line| line.contains("skipped: empty")));
    }

    #[tokio::test]
    async fn test_unavailable_history_does_not_stop_loop() {
        let dir = TempDir::new().unwrap();
        let source = FakeChatSource::new()
            .with_page(SessionPage::new(records(2), false))
            .with_history("s1", user_message("kept"));
        let exporter = Exporter::new(Arc::new(source), settings(&dir));

        let report = exporter.run(true, &Recorder::default()).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.sessions_skipped, 1);
        assert_eq!(report.documents_written, 1);
    }

    #[tokio::test]
    async fn test_cancel_after_two_of_five_sessions() {
        let dir = TempDir::new().unwrap();
        let mut source = FakeChatSource::new().with_page(SessionPage::new(records(5), false));
        for i in 0..5 {
            source = source.with_history(format!("s{}", i).as_str(), user_message("hi"));
        }
        let cancel = CancelFlag::new();
        let source = source.cancel_after_histories(2, cancel.clone());
        let exporter = Exporter::with_cancel_flag(Arc::new(source), settings(&dir), cancel);
        let sink = Recorder::default();

        let report = exporter.run(true, &sink).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::DetailAborted { remaining: 3 });
        assert_eq!(report.documents_written, 2);
        assert_eq!(doc_count(&dir), 2);
        assert!(sink
            .lines()
            .contains(&"Aborted: 3 remaining sessions were not processed".to_string()));
    }

    #[tokio::test]
    async fn test_cancel_during_listing_does_not_save_index() {
        let dir = TempDir::new().unwrap();
        let cancel = CancelFlag::new();
        let source = FakeChatSource::new()
            .with_page(SessionPage::new(records(2), true))
            .with_page(SessionPage::new(records(4)[2..].to_vec(), false))
            .cancel_after_pages(1, cancel.clone());
        let exporter = Exporter::with_cancel_flag(Arc::new(source), settings(&dir), cancel);
        let sink = Recorder::default();

        let report = exporter.run(true, &sink).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::ListAborted);
        assert!(report.index_path.is_none());
        assert!(!dir.path().join("index/session_list.json").exists());
        assert!(sink.contains(&ProgressEvent::IndexNotSaved));
    }

    #[tokio::test]
    async fn test_listing_error_saves_partial_index_and_continues() {
        let dir = TempDir::new().unwrap();
        let source = FakeChatSource::new()
            .with_page(SessionPage::new(records(2), true))
            .with_page_error("HTTP 500")
            .with_history("s0", user_message("x"));
        let exporter = Exporter::new(Arc::new(source), settings(&dir));

        let report = exporter.run(true, &Recorder::default()).await.unwrap();

        assert!(report.listing_partial);
        assert_eq!(report.sessions_listed, 2);
        assert!(dir.path().join("index/session_list.json").exists());
        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.documents_written, 1);
    }

    #[tokio::test]
    async fn test_second_concurrent_run_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut config = settings(&dir);
        config.inter_page_delay = Duration::from_millis(500);
        let source = FakeChatSource::new()
            .with_page(SessionPage::new(records(1), true))
            .with_page(SessionPage::new(records(2)[1..].to_vec(), false));
        let exporter = Arc::new(Exporter::new(Arc::new(source), config));

        let handle = exporter
            .spawn(false, Arc::new(Recorder::default()))
            .unwrap();
        assert!(exporter.is_running());

        let second = exporter.run(false, &Recorder::default()).await;
        let err = second.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExportError>(),
            Some(ExportError::RunActive)
        ));

        let report = handle.await.unwrap();
        assert_eq!(report.outcome, RunOutcome::ListOnly);
        assert!(!exporter.is_running());
    }

    #[tokio::test]
    async fn test_new_run_clears_previous_cancellation() {
        let dir = TempDir::new().unwrap();
        let source = FakeChatSource::new().with_page(SessionPage::new(records(1), false));
        let exporter = Exporter::new(Arc::new(source), settings(&dir));
        exporter.cancel();

        let report = exporter.run(false, &Recorder::default()).await.unwrap();
        assert_eq!(report.outcome, RunOutcome::ListOnly);
    }

    #[tokio::test]
    async fn test_unwritable_session_dir_is_critical_failure() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("index");
        std::fs::write(&blocker, "not a directory").unwrap();
        let source = FakeChatSource::new().with_page(SessionPage::new(records(1), false));
        let exporter = Exporter::new(Arc::new(source), settings(&dir));
        let sink = Recorder::default();

        let report = exporter.run(false, &sink).await.unwrap();

        assert!(matches!(report.outcome, RunOutcome::Failed(_)));
        assert!(sink.lines().iter().any(|l| l.starts_with("CRITICAL ERROR")));
        assert!(!exporter.is_running());
    }
}
