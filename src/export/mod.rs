//! Export pipeline
//!
//! [`Exporter`] drives a run: [`SessionLister`] crawls the session index,
//! [`save_index`] persists it, and for each session [`DetailFetcher`] and
//! [`DocumentWriter`] produce one Markdown document. Progress flows out as
//! [`ProgressEvent`]s through a [`ProgressSink`].

pub mod detail;
pub mod document;
pub mod filename;
pub mod index;
pub mod lister;
pub mod normalize;
pub mod orchestrator;
pub mod progress;

pub use detail::DetailFetcher;
pub use document::{render, DocumentWriter, WriteOutcome};
pub use filename::{document_file_name, sanitize, MAX_NAME_CHARS};
pub use index::{load_index, save_index, INDEX_FILE_NAME};
pub use lister::{CompleteReason, ListCompletion, ListingOutcome, SessionLister};
pub use normalize::{normalize, normalize_content};
pub use orchestrator::{Exporter, RunOutcome, RunReport};
pub use progress::{ChannelSink, ProgressEvent, ProgressSink, Severity, TracingSink};
