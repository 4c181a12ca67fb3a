//! Filename sanitization for exported documents

use crate::api::SessionId;

/// Characters removed from filenames
const INVALID_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Maximum length of a sanitized name, in characters
pub const MAX_NAME_CHARS: usize = 80;

/// Map an arbitrary title to a filesystem-safe name
///
/// Removes `\ / * ? : " < > |`, trims surrounding whitespace, then keeps at
/// most [`MAX_NAME_CHARS`] characters.
///
/// # Examples
///
/// ```
/// use deepseek_export::export::sanitize;
///
/// assert_eq!(sanitize("a/b:c*\"d"), "abcd");
/// ```
pub fn sanitize(title: &str) -> String {
    let cleaned: String = title.chars().filter(|c| !INVALID_CHARS.contains(c)).collect();
    cleaned.trim().chars().take(MAX_NAME_CHARS).collect()
}

/// Document filename for a session: `sanitize(title + "_" + id) + ".md"`
pub fn document_file_name(title: &str, id: &SessionId) -> String {
    format!("{}.md", sanitize(&format!("{}_{}", title, id)))
}
