//! Flattening of message bodies into plain text

use crate::api::{ChatMessage, Fragment, MessageContent};

/// Flatten a message body into one string
///
/// Direct text comes first, followed by the text of every fragment in
/// order. Fragments without text contribute nothing. An empty result means
/// the message has no content and should not be rendered.
///
/// # Examples
///
/// ```
/// use deepseek_export::api::{Fragment, MessageContent};
/// use deepseek_export::export::normalize_content;
///
/// let content = MessageContent::Mixed {
///     text: "A".to_string(),
///     fragments: vec![Fragment::text("B"), Fragment::text("C")],
/// };
/// assert_eq!(normalize_content(&content), "ABC");
/// ```
pub fn normalize_content(content: &MessageContent) -> String {
    match content {
        MessageContent::Empty => String::new(),
        MessageContent::Text(text) => text.clone(),
        MessageContent::Fragments(fragments) => join_fragments(String::new(), fragments),
        MessageContent::Mixed { text, fragments } => join_fragments(text.clone(), fragments),
    }
}

/// Flatten a whole message; see [`normalize_content`]
pub fn normalize(message: &ChatMessage) -> String {
    normalize_content(&message.content)
}

fn join_fragments(mut out: String, fragments: &[Fragment]) -> String {
    for text in fragments.iter().filter_map(|f| f.content.as_deref()) {
        out.push_str(text);
    }
    out
}
