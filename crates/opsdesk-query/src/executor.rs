use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::FetchError;
use crate::http_client::{self, ClientSettings};

const MAX_TEXT_MESSAGE_CHARS: usize = 200;

/// Where a domain fetcher sends its request, relative to the API base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl Endpoint {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn with_query<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }
}

/// Performs one outbound request and hands back the raw payload.
#[async_trait]
pub trait FetchExecutor: Send + Sync {
    async fn execute(&self, endpoint: &Endpoint, cancel: &CancellationToken)
        -> Result<Value, FetchError>;
}

/// Admin API executor over a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: reqwest::Client,
    base: String,
    admin_token: Option<String>,
}

impl HttpExecutor {
    pub fn new(base: impl Into<String>, settings: &ClientSettings) -> reqwest::Result<Self> {
        Ok(Self::with_client(http_client::client(settings)?, base))
    }

    pub fn with_client(client: reqwest::Client, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
            admin_token: None,
        }
    }

    pub fn with_admin_token(mut self, token: Option<String>) -> Self {
        self.admin_token = token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base, path)
        } else {
            format!("{}/{}", self.base, path)
        }
    }

    fn request(&self, endpoint: &Endpoint) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .request(endpoint.method.clone(), self.url(&endpoint.path))
            .header(ACCEPT, "application/json");
        if !endpoint.query.is_empty() {
            req = req.query(&endpoint.query);
        }
        if let Some(token) = self.admin_token.as_deref() {
            req = req.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        req
    }
}

#[async_trait]
impl FetchExecutor for HttpExecutor {
    async fn execute(
        &self,
        endpoint: &Endpoint,
        cancel: &CancellationToken,
    ) -> Result<Value, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Aborted);
        }
        let started = Instant::now();
        let req = self.request(endpoint);
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Aborted),
            res = send_and_decode(req) => res,
        };
        let outcome = match &result {
            Ok(_) => "ok",
            Err(FetchError::Aborted) => "aborted",
            Err(_) => "error",
        };
        debug!(
            target: "opsdesk.fetch",
            method = %endpoint.method,
            path = %endpoint.path,
            elapsed_ms = started.elapsed().as_millis() as u64,
            outcome,
            "admin request finished"
        );
        result
    }
}

async fn send_and_decode(req: reqwest::RequestBuilder) -> Result<Value, FetchError> {
    let resp = req
        .send()
        .await
        .map_err(|err| FetchError::Network(err.to_string()))?;
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|err| FetchError::Network(err.to_string()))?;
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            message: extract_error_message(status.as_u16(), &body),
        });
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|err| FetchError::Decode(err.to_string()))
}

/// Human-readable message for a failed response body.
pub fn extract_error_message(status: u16, body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if let Some(message) = message_from_json(&value) {
            return message;
        }
    } else if !trimmed.is_empty()
        && trimmed.chars().count() <= MAX_TEXT_MESSAGE_CHARS
        && !trimmed.starts_with('<')
    {
        return trimmed.to_string();
    }
    format!("request failed (status {status})")
}

fn message_from_json(value: &Value) -> Option<String> {
    use opsdesk_normalize::{field, pick_string};

    if let Some(error) = field(value, "error") {
        if let Some(msg) = pick_string(Some(error)) {
            return Some(msg);
        }
        if let Some(msg) = pick_string(field(error, "message")) {
            return Some(msg);
        }
    }
    ["message", "detail", "title"]
        .iter()
        .find_map(|key| pick_string(field(value, key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_prefers_error_fields() {
        assert_eq!(extract_error_message(400, r#"{"error":"bad window"}"#), "bad window");
        assert_eq!(
            extract_error_message(422, r#"{"error":{"message":"limit too large"}}"#),
            "limit too large"
        );
        assert_eq!(extract_error_message(404, r#"{"detail":"no such model"}"#), "no such model");
        assert_eq!(
            extract_error_message(403, r#"{"type":"about:blank","title":"Forbidden"}"#),
            "Forbidden"
        );
    }

    #[test]
    fn message_falls_back_to_status() {
        assert_eq!(extract_error_message(502, ""), "request failed (status 502)");
        assert_eq!(extract_error_message(500, r#"{"code":17}"#), "request failed (status 500)");
        assert_eq!(
            extract_error_message(503, "<html><body>down</body></html>"),
            "request failed (status 503)"
        );
        assert_eq!(extract_error_message(503, "upstream unavailable"), "upstream unavailable");
        let long = "x".repeat(500);
        assert_eq!(extract_error_message(500, &long), "request failed (status 500)");
    }

    #[test]
    fn urls_join_without_double_slashes() {
        let exec = HttpExecutor::with_client(reqwest::Client::new(), "http://127.0.0.1:8091/");
        assert_eq!(exec.url("/admin/models"), "http://127.0.0.1:8091/admin/models");
        assert_eq!(exec.url("admin/models"), "http://127.0.0.1:8091/admin/models");
    }
}
