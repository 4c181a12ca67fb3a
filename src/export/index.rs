//! Session index file

use std::path::{Path, PathBuf};

use crate::api::SessionRecord;
use crate::error::Result;

/// File name of the session index inside the session directory
pub const INDEX_FILE_NAME: &str = "session_list.json";

/// Write `sessions` as a pretty-printed JSON array to `dir/session_list.json`
///
/// Records are written verbatim, including fields this crate does not
/// interpret. An existing index is overwritten.
///
/// # Errors
///
/// Returns error if the directory cannot be created or the file cannot be written
pub fn save_index(dir: &Path, sessions: &[SessionRecord]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(INDEX_FILE_NAME);
    let json = serde_json::to_string_pretty(sessions)?;
    std::fs::write(&path, json)?;
    tracing::debug!(path = %path.display(), total = sessions.len(), "Saved session index");
    Ok(path)
}

/// Read a previously saved session index
///
/// # Errors
///
/// Returns error if the file cannot be read or is not a JSON array of records
pub fn load_index(path: &Path) -> Result<Vec<SessionRecord>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
