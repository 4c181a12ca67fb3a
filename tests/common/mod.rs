use std::time::Duration;

use serde_json::{json, Value};
use tempfile::TempDir;

use deepseek_export::config::{ApiConfig, CredentialsConfig, ExportSettings};

#[allow(dead_code)]
pub const AUTHORIZATION: &str = "Bearer test-token";

#[allow(dead_code)]
pub const COOKIE: &str = "ds_session_id=abc; other=1";

#[allow(dead_code)]
pub fn api_config(base_url: &str) -> ApiConfig {
    ApiConfig {
        base_url: base_url.to_string(),
        timeout_seconds: 5,
        ..ApiConfig::default()
    }
}

#[allow(dead_code)]
pub fn credentials() -> CredentialsConfig {
    CredentialsConfig {
        authorization: AUTHORIZATION.to_string(),
        cookie: COOKIE.to_string(),
    }
}

/// Settings rooted in `dir` with millisecond pauses
#[allow(dead_code)]
pub fn fast_settings(dir: &TempDir) -> ExportSettings {
    ExportSettings {
        session_dir: dir.path().join("deepseek_exports"),
        output_dir: dir.path().join("deepseek_export_final"),
        inter_page_delay: Duration::from_millis(1),
        inter_session_delay: Duration::from_millis(1),
        poll_interval: Duration::from_millis(1),
        detail_page_size: 100,
    }
}

#[allow(dead_code)]
pub fn session_json(id: &str, title: &str, updated_at: f64) -> Value {
    json!({"id": id, "title": title, "updated_at": updated_at, "pinned": false})
}

#[allow(dead_code)]
pub fn page_body(sessions: Vec<Value>, has_more: bool) -> Value {
    json!({
        "code": 0,
        "data": {"biz_code": 0, "biz_data": {"chat_sessions": sessions, "has_more": has_more}}
    })
}

#[allow(dead_code)]
pub fn history_body(messages: Vec<Value>) -> Value {
    json!({
        "code": 0,
        "data": {"biz_code": 0, "biz_data": {"chat_messages": messages}}
    })
}

#[allow(dead_code)]
pub fn count_files(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.count())
        .unwrap_or(0)
}
