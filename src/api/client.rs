//! HTTP client for the DeepSeek web chat API
//!
//! Every request carries the caller's authorization token and cookie string
//! together with the fixed headers the web client sends. Requests are bounded
//! by the configured timeout.

use crate::api::{ChatSource, DetailOutcome, SessionId, SessionPage};
use crate::config::{ApiConfig, CredentialsConfig};
use crate::error::{ExportError, Result};

use async_trait::async_trait;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, COOKIE, ORIGIN, REFERER,
};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Session index endpoint
pub const FETCH_PAGE_PATH: &str = "/api/v0/chat_session/fetch_page";

/// Session history endpoint
pub const HISTORY_PATH: &str = "/api/v0/chat/history_messages";

/// DeepSeek web API client
///
/// # Examples
///
/// ```
/// use deepseek_export::api::DeepSeekClient;
/// use deepseek_export::config::{ApiConfig, CredentialsConfig};
///
/// let credentials = CredentialsConfig {
///     authorization: "Bearer token".to_string(),
///     cookie: "session=abc".to_string(),
/// };
/// let client = DeepSeekClient::new(&ApiConfig::default(), &credentials);
/// assert!(client.is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct DeepSeekClient {
    client: Client,
    base_url: Url,
}

impl DeepSeekClient {
    /// Create a new client
    ///
    /// # Arguments
    ///
    /// * `api` - Base URL, timeout and client identification headers
    /// * `credentials` - Authorization and cookie values attached to every request
    ///
    /// # Errors
    ///
    /// Returns `ExportError::MissingCredentials` if either credential is empty,
    /// `ExportError::Config` if the base URL or a header value is invalid
    pub fn new(api: &ApiConfig, credentials: &CredentialsConfig) -> Result<Self> {
        credentials.ensure_present()?;

        let base_url = Url::parse(&api.base_url)
            .map_err(|e| ExportError::Config(format!("Invalid base URL: {}", e)))?;
        let headers = Self::default_headers(api, credentials, &base_url)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(api.timeout_seconds))
            .user_agent(api.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| ExportError::Config(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(base_url = %base_url, "Initialized DeepSeek client");

        Ok(Self { client, base_url })
    }

    fn default_headers(
        api: &ApiConfig,
        credentials: &CredentialsConfig,
        base_url: &Url,
    ) -> Result<HeaderMap> {
        fn value(name: &str, raw: &str) -> Result<HeaderValue> {
            HeaderValue::from_str(raw.trim()).map_err(|_| {
                ExportError::Config(format!("Invalid value for header {}", name)).into()
            })
        }

        let origin = base_url.origin().ascii_serialization();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            AUTHORIZATION,
            value("Authorization", &credentials.authorization)?,
        );
        headers.insert(COOKIE, value("Cookie", &credentials.cookie)?);
        headers.insert(REFERER, value("Referer", &format!("{}/", origin))?);
        headers.insert(ORIGIN, value("Origin", &origin)?);
        headers.insert(
            HeaderName::from_static("x-app-version"),
            value("X-App-Version", &api.app_version)?,
        );
        headers.insert(
            HeaderName::from_static("x-client-locale"),
            value("X-Client-Locale", &api.client_locale)?,
        );
        headers.insert(
            HeaderName::from_static("x-client-platform"),
            HeaderValue::from_static("web"),
        );
        headers.insert(
            HeaderName::from_static("x-client-version"),
            value("X-Client-Version", &api.client_version)?,
        );
        Ok(headers)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ExportError::Config(format!("Invalid endpoint {}: {}", path, e)).into())
    }

    async fn get_json(&self, url: Url, query: &[(&str, String)]) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| ExportError::Transport(format!("request failed: {}", e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(
                ExportError::Transport(format!("server returned HTTP {}", status.as_u16())).into(),
            );
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ExportError::Transport(format!("unreadable response: {}", e)).into())
    }
}

#[async_trait]
impl ChatSource for DeepSeekClient {
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<SessionPage> {
        let mut query = vec![("lte_cursor.pinned", "false".to_string())];
        if let Some(cursor) = cursor {
            query.push(("lte_cursor.updated_at", cursor.to_string()));
        }

        tracing::debug!(cursor = ?cursor, "Requesting session page");
        let body = self.get_json(self.endpoint(FETCH_PAGE_PATH)?, &query).await?;

        match SessionPage::parse(&body) {
            Ok(page) => Ok(page),
            Err(e) => {
                tracing::warn!(error = %e, "Unexpected session page shape, treating as empty");
                Ok(SessionPage::default())
            }
        }
    }

    async fn fetch_history(&self, session_id: &SessionId, count: u32) -> DetailOutcome {
        let url = match self.endpoint(HISTORY_PATH) {
            Ok(url) => url,
            Err(e) => return DetailOutcome::Unavailable(e.to_string()),
        };
        let query = [
            ("chat_session_id", session_id.to_string()),
            ("count", count.to_string()),
        ];

        tracing::debug!(session_id = %session_id, count, "Requesting session history");
        match self.get_json(url, &query).await {
            Ok(body) => DetailOutcome::Available(body),
            Err(e) => {
                tracing::debug!(session_id = %session_id, error = %e, "History request failed");
                DetailOutcome::Unavailable(e.to_string())
            }
        }
    }
}
