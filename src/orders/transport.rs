//! HTTP transport
//!
//! One authenticated request per call, no retries. Responses are returned as
//! raw JSON; non-2xx responses are turned into the matching [`Error`]
//! variant using the documented error envelope.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::Duration;

use super::auth::{Credentials, API_KEY_HEADER};
use crate::error::{ApiErrorBody, Error, ErrorEnvelope, Result};

/// Sends a single request to the orders API
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue `method path` with an optional JSON body and return the decoded
    /// response body (`null` for empty bodies)
    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: Client,
    base_url: String,
    credentials: Credentials,
}

impl HttpTransport {
    pub fn new(
        base_url: impl Into<String>,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self> {
        if credentials.is_empty() {
            return Err(Error::Config("API key must not be empty".to_string()));
        }

        let http_client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        tracing::debug!(
            method = %method,
            path,
            api_key = %self.credentials.masked_key(),
            "Sending request"
        );

        let mut request = self
            .http_client
            .request(method.clone(), self.url(path))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header(API_KEY_HEADER, self.credentials.api_key());

        if let Some(body) = body {
            request = request.body(serde_json::to_vec(body)?);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let retry_after = parse_retry_after(response.headers());
        let text = response.text().await?;

        tracing::debug!(method = %method, path, status, "Received response");
        parse_response(status, &text, retry_after)
    }
}

/// `retry-after` in whole seconds
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Map a raw response onto `Ok(json)` or the matching error.
///
/// Only a 2xx body that is not JSON becomes [`Error::InvalidResponse`].
/// A non-2xx body that is not JSON is still mapped by its status code, so a
/// 404 or 503 page from a proxy keeps its retry and not-found semantics; the
/// message carries a truncated snippet of the body.
pub(crate) fn parse_response(
    status: u16,
    text: &str,
    retry_after: Option<Duration>,
) -> Result<Value> {
    if (200..300).contains(&status) {
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        return serde_json::from_str(text).map_err(|e| {
            Error::InvalidResponse(format!("malformed JSON in {} response: {}", status, e))
        });
    }

    let body = match serde_json::from_str::<ErrorEnvelope>(text) {
        Ok(envelope) => envelope.error,
        // proxies and load balancers answer with HTML or plain text
        Err(_) => ApiErrorBody {
            message: fallback_message(status, text),
            ..Default::default()
        },
    };
    Err(Error::from_status(status, body, retry_after))
}

fn fallback_message(status: u16, text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return format!("HTTP {}", status);
    }
    let snippet: String = text.chars().take(200).collect();
    format!("HTTP {}: {}", status, snippet)
}
