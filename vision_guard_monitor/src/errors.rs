//! Error types for the monitor client

use std::fmt;
use tracing::{debug, warn};

pub type Result<T> = std::result::Result<T, MonitorError>;

#[derive(Debug)]
pub enum MonitorError {
    /// No response was received (connection refused, DNS, timeout)
    Network(String),

    /// Backend answered with a non-success status
    Api {
        status: u16,
        detail: Option<String>,
    },

    /// Response body did not have the expected shape
    MalformedResponse(String),

    /// Action refused locally before any request was sent
    Rejected(String),

    /// IO operation failed
    Io(std::io::Error),

    /// HTTP client error that is not a connectivity problem
    Http(reqwest::Error),

    /// JSON serialization/deserialization failed
    Json(serde_json::Error),

    /// Configuration error
    Config(String),

    /// Generic error with message
    Other(String),
}

impl MonitorError {
    /// True for errors where the backend was never reached.
    pub fn is_network(&self) -> bool {
        match self {
            MonitorError::Network(_) => true,
            MonitorError::Http(err) => err.is_connect() || err.is_timeout(),
            _ => false,
        }
    }

    /// Message suitable for an operator alert.
    ///
    /// Backend `detail` strings are shown verbatim; everything else falls
    /// back to the supplied generic message.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            MonitorError::Api {
                detail: Some(detail),
                ..
            } => detail.clone(),
            MonitorError::Rejected(msg) => msg.clone(),
            _ => fallback.to_string(),
        }
    }

    /// Build an API error from a status code and raw response body.
    ///
    /// FastAPI-style bodies carry `{"detail": "..."}`; anything else is
    /// treated as having no structured detail.
    pub fn from_response(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| value.get("detail").and_then(|d| d.as_str()).map(str::to_string));

        MonitorError::Api { status, detail }
    }
}

/// Log a failed poll read. Connectivity loss is expected during outages
/// and is kept out of the normal log stream.
pub(crate) fn log_poll_error(what: &str, err: &MonitorError) {
    if err.is_network() {
        debug!("Error fetching {}: {}", what, err);
    } else {
        warn!("Error fetching {}: {}", what, err);
    }
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::Network(msg) => write!(f, "Network error: {}", msg),
            MonitorError::Api {
                status,
                detail: Some(detail),
            } => write!(f, "API error {}: {}", status, detail),
            MonitorError::Api { status, detail: None } => write!(f, "API error {}", status),
            MonitorError::MalformedResponse(msg) => write!(f, "Malformed response: {}", msg),
            MonitorError::Rejected(msg) => write!(f, "Rejected: {}", msg),
            MonitorError::Io(err) => write!(f, "IO error: {}", err),
            MonitorError::Http(err) => write!(f, "HTTP error: {}", err),
            MonitorError::Json(err) => write!(f, "JSON error: {}", err),
            MonitorError::Config(msg) => write!(f, "Configuration error: {}", msg),
            MonitorError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MonitorError::Io(err) => Some(err),
            MonitorError::Http(err) => Some(err),
            MonitorError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MonitorError {
    fn from(err: std::io::Error) -> Self {
        MonitorError::Io(err)
    }
}

impl From<reqwest::Error> for MonitorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            MonitorError::Network(err.to_string())
        } else if err.is_decode() {
            MonitorError::MalformedResponse(err.to_string())
        } else {
            MonitorError::Http(err)
        }
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::Json(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_extracted_from_body() {
        let err = MonitorError::from_response(400, r#"{"detail":"already active"}"#);
        assert_eq!(err.user_message("generic"), "already active");
        assert!(!err.is_network());
    }

    #[test]
    fn test_unstructured_body_uses_fallback() {
        let err = MonitorError::from_response(500, "Internal Server Error");
        match &err {
            MonitorError::Api { status, detail } => {
                assert_eq!(*status, 500);
                assert!(detail.is_none());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.user_message("generic"), "generic");
    }

    #[test]
    fn test_network_classification() {
        assert!(MonitorError::Network("refused".to_string()).is_network());
        assert!(!MonitorError::MalformedResponse("bad".to_string()).is_network());
        assert!(!MonitorError::Rejected("busy".to_string()).is_network());
    }
}
