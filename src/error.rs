//! Error types for the orders API client
//!
//! Every failure surfaced by the library is an [`Error`]. Variants follow the
//! HTTP status semantics of the remote service so the resilience layer can
//! decide what is worth retrying.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Field-scoped error messages keyed by category (`currency`, `amount`, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record messages for a category. Empty lists are dropped.
    pub fn extend(&mut self, category: impl Into<String>, messages: Vec<String>) {
        if messages.is_empty() {
            return;
        }
        self.0.entry(category.into()).or_default().extend(messages);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, category: &str) -> Option<&[String]> {
        self.0.get(category).map(Vec::as_slice)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Total number of messages across all categories
    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (category, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{}: {}", category, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// A single field error reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Body of the documented error envelope:
/// `{"status": "error", "error": {"message", "code"?, "fields"?}}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_fields",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub fields: Vec<FieldError>,
    /// Seconds to wait, sometimes sent in the body of a 429
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorEnvelope {
    #[serde(default)]
    #[allow(dead_code)]
    pub status: Option<String>,
    pub error: ApiErrorBody,
}

/// Accepts `fields` either as `{"field": "msg" | ["msg", ...]}` or as
/// `[{"field": ..., "message": ...}]`.
fn deserialize_fields<'de, D>(deserializer: D) -> std::result::Result<Vec<FieldError>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Messages {
        One(String),
        Many(Vec<String>),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Fields {
        List(Vec<FieldError>),
        Map(BTreeMap<String, Messages>),
    }

    let fields = Option::<Fields>::deserialize(deserializer)?;
    Ok(match fields {
        None => Vec::new(),
        Some(Fields::List(list)) => list,
        Some(Fields::Map(map)) => map
            .into_iter()
            .flat_map(|(field, messages)| {
                let messages = match messages {
                    Messages::One(m) => vec![m],
                    Messages::Many(ms) => ms,
                };
                messages.into_iter().map(move |message| FieldError {
                    field: field.clone(),
                    message,
                })
            })
            .collect(),
    })
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Auth,
    NotFound,
    RateLimit,
    Server,
    Api,
    Transport,
    Polling,
    Config,
}

#[derive(Debug, Error)]
pub enum Error {
    /// Client-side pre-flight validation failed; nothing was sent
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// 401/403
    #[error("authentication failed ({status}): {message}. Check the configured API key")]
    Auth {
        status: u16,
        message: String,
        code: Option<String>,
    },

    /// 404
    #[error("not found: {message}")]
    NotFound {
        message: String,
        code: Option<String>,
    },

    /// 429
    #[error("rate limit exceeded: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    /// 5xx
    #[error("server error ({status}): {message}")]
    Server {
        status: u16,
        message: String,
        code: Option<String>,
    },

    /// Any other non-2xx response (409, 422, ...)
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        code: Option<String>,
        fields: Vec<FieldError>,
    },

    /// Network failure or timeout
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body was not JSON or did not have the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("request failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    #[error("polling stopped: resource was cancelled")]
    PollCancelled,

    #[error("polling gave up after {attempts} attempts: {message}")]
    PollExhausted { attempts: u32, message: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build the error for a non-2xx response
    pub fn from_status(status: u16, body: ApiErrorBody, retry_after: Option<Duration>) -> Self {
        let ApiErrorBody {
            message,
            code,
            fields,
            retry_after: body_retry_after,
        } = body;
        match status {
            401 | 403 => Self::Auth {
                status,
                message,
                code,
            },
            404 => Self::NotFound { message, code },
            429 => Self::RateLimited {
                message,
                retry_after: retry_after.or(body_retry_after.map(Duration::from_secs)),
            },
            500..=599 => Self::Server {
                status,
                message,
                code,
            },
            _ => Self::Api {
                status,
                message,
                code,
                fields,
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::RateLimited { .. } => ErrorKind::RateLimit,
            Self::Server { .. } => ErrorKind::Server,
            Self::Api { .. } => ErrorKind::Api,
            Self::Transport(_) | Self::InvalidResponse(_) => ErrorKind::Transport,
            Self::RetriesExhausted { source, .. } => source.kind(),
            Self::PollCancelled | Self::PollExhausted { .. } => ErrorKind::Polling,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// HTTP status behind this error, if it came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. } | Self::Server { status, .. } | Self::Api { status, .. } => {
                Some(*status)
            }
            Self::NotFound { .. } => Some(404),
            Self::RateLimited { .. } => Some(429),
            Self::RetriesExhausted { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Server-supplied wait hint on a 429
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // without_url keeps query strings out of logs
        Self::Transport(err.without_url().to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(message: &str) -> ApiErrorBody {
        ApiErrorBody {
            message: message.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::from_status(401, body("x"), None).kind(), ErrorKind::Auth);
        assert_eq!(Error::from_status(403, body("x"), None).kind(), ErrorKind::Auth);
        assert_eq!(Error::from_status(404, body("x"), None).kind(), ErrorKind::NotFound);
        assert_eq!(Error::from_status(429, body("x"), None).kind(), ErrorKind::RateLimit);
        assert_eq!(Error::from_status(503, body("x"), None).kind(), ErrorKind::Server);
        assert_eq!(Error::from_status(409, body("x"), None).kind(), ErrorKind::Api);
        assert_eq!(Error::from_status(422, body("x"), None).status(), Some(422));
    }

    #[test]
    fn test_retry_after_prefers_header() {
        let mut b = body("slow down");
        b.retry_after = Some(30);
        let err = Error::from_status(429, b.clone(), Some(Duration::from_secs(7)));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));

        let err = Error::from_status(429, b, None);
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_envelope_fields_as_map() {
        let json = r#"{"status":"error","error":{"message":"Invalid order","code":"VALIDATION",
            "fields":{"amount":"must be positive","currency":["bad pair","unsupported"]}}}"#;
        let envelope: ErrorEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.error.code.as_deref(), Some("VALIDATION"));
        assert_eq!(envelope.error.fields.len(), 3);
        assert_eq!(envelope.error.fields[0].field, "amount");
    }

    #[test]
    fn test_envelope_fields_as_list() {
        let json = r#"{"status":"error","error":{"message":"Invalid",
            "fields":[{"field":"recipient_id","message":"unknown recipient"}]}}"#;
        let envelope: ErrorEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(
            envelope.error.fields,
            vec![FieldError {
                field: "recipient_id".to_string(),
                message: "unknown recipient".to_string()
            }]
        );
    }

    #[test]
    fn test_envelope_without_fields() {
        let json = r#"{"status":"error","error":{"message":"Order not found"}}"#;
        let envelope: ErrorEnvelope = serde_json::from_str(json).unwrap();
        assert!(envelope.error.fields.is_empty());
        assert!(envelope.error.code.is_none());
    }

    #[test]
    fn test_exhausted_keeps_inner_kind() {
        let err = Error::RetriesExhausted {
            attempts: 3,
            source: Box::new(Error::from_status(502, body("bad gateway"), None)),
        };
        assert_eq!(err.kind(), ErrorKind::Server);
        assert_eq!(err.status(), Some(502));
        assert!(err.to_string().contains("3 attempts"));
    }

    #[test]
    fn test_validation_errors_display() {
        let mut errors = ValidationErrors::new();
        errors.extend("amount", vec!["Amount must be greater than 0".to_string()]);
        errors.extend("currency", vec![]);
        assert_eq!(errors.len(), 1);
        assert!(errors.get("currency").is_none());
        assert_eq!(errors.to_string(), "amount: Amount must be greater than 0");
        assert!(errors.into_result().is_err());
    }
}
