//! Wire types for the chat service
//!
//! Session records are kept close to the service's JSON so the session index
//! can be written back verbatim. Message payloads vary in shape (direct text,
//! typed fragments, or both), so they are read leniently into
//! [`MessageContent`] instead of failing deserialization.

use crate::error::{ExportError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identifier of a remote chat session
///
/// The service has used both string and integer identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionId {
    /// Numeric identifier
    Number(i64),
    /// Textual identifier (UUID-like)
    Text(String),
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionId::Number(n) => write!(f, "{}", n),
            SessionId::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        SessionId::Text(value.to_string())
    }
}

impl From<i64> for SessionId {
    fn from(value: i64) -> Self {
        SessionId::Number(value)
    }
}

impl SessionId {
    /// Read an identifier from a JSON value
    ///
    /// Strings and integers are accepted; anything else is not an id.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(SessionId::Text(s.clone())),
            Value::Number(n) => n.as_i64().map(SessionId::Number),
            _ => None,
        }
    }
}

/// Title used when a session has none
pub const UNTITLED: &str = "Untitled";

/// Format a timestamp as a pagination cursor with 3-decimal precision
pub fn format_cursor(updated_at: f64) -> String {
    format!("{:.3}", updated_at)
}

/// Metadata for one remote conversation
///
/// The record is the service's JSON object, kept as received so the session
/// index can be written back verbatim. Only `id` is required; the other
/// fields are read leniently and a missing or mistyped value counts as
/// absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct SessionRecord {
    id: SessionId,
    fields: Map<String, Value>,
}

impl SessionRecord {
    /// Create a record with the given id, title and timestamp
    pub fn new(id: impl Into<SessionId>, title: &str, updated_at: f64) -> Self {
        let id = id.into();
        let mut fields = Map::new();
        fields.insert(
            "id".to_string(),
            match &id {
                SessionId::Number(n) => Value::from(*n),
                SessionId::Text(s) => Value::from(s.as_str()),
            },
        );
        fields.insert("title".to_string(), Value::from(title));
        fields.insert("updated_at".to_string(), Value::from(updated_at));
        Self { id, fields }
    }

    /// Replace or add one field, keeping the rest as they are
    ///
    /// The `id` field is fixed at construction and is left untouched.
    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        if key != "id" {
            self.fields.insert(key.to_string(), value);
        }
        self
    }

    /// Unique session identifier
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Human-readable title, if the record carries a string one
    pub fn title(&self) -> Option<&str> {
        self.fields.get("title").and_then(Value::as_str)
    }

    /// Last activity as fractional Unix seconds, if the record carries a number
    pub fn updated_at(&self) -> Option<f64> {
        self.fields.get("updated_at").and_then(Value::as_f64)
    }

    /// Whether the session is pinned; anything but `true` reads as unpinned
    pub fn pinned(&self) -> bool {
        self.fields
            .get("pinned")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Raw field by name
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Title for display, falling back to [`UNTITLED`]
    pub fn display_title(&self) -> &str {
        match self.title() {
            Some(title) if !title.trim().is_empty() => title,
            _ => UNTITLED,
        }
    }

    /// Pagination cursor derived from `updated_at` with 3-decimal precision
    ///
    /// # Examples
    ///
    /// ```
    /// use deepseek_export::api::SessionRecord;
    ///
    /// let record = SessionRecord::new("abc", "hello", 1732851234.5);
    /// assert_eq!(record.cursor().as_deref(), Some("1732851234.500"));
    /// ```
    pub fn cursor(&self) -> Option<String> {
        self.updated_at().map(format_cursor)
    }
}

impl TryFrom<Map<String, Value>> for SessionRecord {
    type Error = ExportError;

    fn try_from(fields: Map<String, Value>) -> std::result::Result<Self, Self::Error> {
        let id = fields
            .get("id")
            .and_then(SessionId::from_value)
            .ok_or_else(|| ExportError::Protocol("session entry without a usable id".to_string()))?;
        Ok(Self { id, fields })
    }
}

impl From<SessionRecord> for Map<String, Value> {
    fn from(record: SessionRecord) -> Self {
        record.fields
    }
}

/// Navigate `{data: {biz_data: ...}}`
fn biz_data(envelope: &Value) -> Option<&Value> {
    envelope
        .get("data")
        .and_then(|data| data.get("biz_data"))
        .filter(|biz| biz.is_object())
}

/// One page of the session index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPage {
    /// Records in server order
    pub sessions: Vec<SessionRecord>,
    /// Whether the server reports further pages
    pub has_more: bool,
    /// Entries that could not be read as a session record
    pub malformed: usize,
    /// Cursor for the next request, taken from the page's last entry
    pub next_cursor: Option<String>,
}

impl SessionPage {
    /// Build a page from records
    pub fn new(sessions: Vec<SessionRecord>, has_more: bool) -> Self {
        let next_cursor = sessions.last().and_then(SessionRecord::cursor);
        Self {
            sessions,
            has_more,
            malformed: 0,
            next_cursor,
        }
    }

    /// Entries the server returned, readable or not
    pub fn entries(&self) -> usize {
        self.sessions.len() + self.malformed
    }

    /// Parse a `fetch_page` response envelope
    ///
    /// Entries without a string or integer `id` are counted in `malformed`
    /// and dropped. The next cursor comes from the last entry as sent, even
    /// when that entry was dropped.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::Protocol` when `data.biz_data` is missing
    pub fn parse(envelope: &Value) -> Result<Self> {
        let biz = biz_data(envelope)
            .ok_or_else(|| ExportError::Protocol("missing data.biz_data".to_string()))?;

        let has_more = biz
            .get("has_more")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let entries = biz
            .get("chat_sessions")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let mut page = SessionPage {
            has_more,
            next_cursor: entries
                .last()
                .and_then(|entry| entry.get("updated_at"))
                .and_then(Value::as_f64)
                .map(format_cursor),
            ..Default::default()
        };

        for entry in entries {
            let record = match entry {
                Value::Object(fields) => SessionRecord::try_from(fields.clone()),
                _ => Err(ExportError::Protocol(
                    "session entry is not an object".to_string(),
                )),
            };
            match record {
                Ok(record) => page.sessions.push(record),
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping malformed session entry");
                    page.malformed += 1;
                }
            }
        }

        Ok(page)
    }
}

/// Author of a chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// The account owner
    User,
    /// The model
    Assistant,
    /// Any other role, kept verbatim
    Other(String),
}

impl Role {
    /// Parse a role name case-insensitively
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "USER" => Role::User,
            "ASSISTANT" => Role::Assistant,
            _ => Role::Other(raw.trim().to_string()),
        }
    }
}

/// One typed piece of a fragmented message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    /// Fragment type as reported by the service (e.g. `THINK`, `RESPONSE`)
    pub kind: Option<String>,
    /// Text of the fragment, if any
    pub content: Option<String>,
}

impl Fragment {
    /// Fragment carrying only text
    pub fn text(content: &str) -> Self {
        Self {
            kind: None,
            content: Some(content.to_string()),
        }
    }

    fn from_value(value: &Value) -> Self {
        Self {
            kind: value.get("type").and_then(Value::as_str).map(str::to_string),
            content: value
                .get("content")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

/// Message body in one of the shapes the service produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    /// No content at all
    Empty,
    /// Direct `content` string only
    Text(String),
    /// `fragments` list only
    Fragments(Vec<Fragment>),
    /// Both a direct `content` string and a `fragments` list
    Mixed {
        /// Direct content, rendered first
        text: String,
        /// Fragments, rendered in order after `text`
        fragments: Vec<Fragment>,
    },
}

impl MessageContent {
    /// Classify the raw parts of a message
    pub fn from_parts(text: Option<String>, fragments: Option<Vec<Fragment>>) -> Self {
        let text = text.filter(|t| !t.is_empty());
        match (text, fragments) {
            (None, None) => MessageContent::Empty,
            (Some(text), None) => MessageContent::Text(text),
            (None, Some(fragments)) => MessageContent::Fragments(fragments),
            (Some(text), Some(fragments)) => MessageContent::Mixed { text, fragments },
        }
    }
}

/// One message of a session's history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Author
    pub role: Role,
    /// Body
    pub content: MessageContent,
}

impl ChatMessage {
    /// Read a message leniently; malformed or missing fields count as absent
    ///
    /// # Examples
    ///
    /// ```
    /// use deepseek_export::api::{ChatMessage, Role};
    /// use serde_json::json;
    ///
    /// let msg = ChatMessage::from_value(&json!({"role": "user", "content": "hi"}));
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn from_value(value: &Value) -> Self {
        let role = Role::parse(value.get("role").and_then(Value::as_str).unwrap_or(""));
        let text = value
            .get("content")
            .and_then(Value::as_str)
            .map(str::to_string);
        let fragments = value
            .get("fragments")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(Fragment::from_value).collect());

        Self {
            role,
            content: MessageContent::from_parts(text, fragments),
        }
    }
}

/// Extract the message list from a `history_messages` response envelope
///
/// A missing `chat_messages` field yields an empty list.
///
/// # Errors
///
/// Returns `ExportError::Protocol` when `data.biz_data` is missing
pub fn history_messages(envelope: &Value) -> Result<Vec<ChatMessage>> {
    let biz = biz_data(envelope)
        .ok_or_else(|| ExportError::Protocol("missing data.biz_data".to_string()))?;

    Ok(biz
        .get("chat_messages")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(ChatMessage::from_value).collect())
        .unwrap_or_default())
}

/// Result of requesting one session's history
#[derive(Debug, Clone, PartialEq)]
pub enum DetailOutcome {
    /// Raw response envelope
    Available(Value),
    /// Non-success status or transport failure, with a reason
    Unavailable(String),
}

impl DetailOutcome {
    /// The payload, if one was received
    pub fn payload(&self) -> Option<&Value> {
        match self {
            DetailOutcome::Available(value) => Some(value),
            DetailOutcome::Unavailable(_) => None,
        }
    }
}
