// API error normalization
//
// Every HTTP-layer failure is reduced to one shape: a human-readable
// `detail` plus the HTTP status when one was received. Callers decide
// per call site whether an error is fatal or retry-eligible.

use serde_json::Value;
use std::fmt;

/// Substring the backend puts in the conflict `detail` when an analysis
/// job is already running for the board. The backend's messages are
/// Spanish; this constant is a wire-compatibility contract, not a
/// translation choice.
pub const ALREADY_RUNNING_MARKER: &str = "ya está siendo analizado";

/// Normalized API error: `{ detail, status }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Human-readable message. Validation-error lists are flattened
    /// into a single string before they get here.
    pub detail: String,
    /// HTTP status code, when the server responded at all.
    pub status: Option<u16>,
}

impl ApiError {
    /// Transport-level failure (DNS, refused connection, body read).
    pub fn network(message: impl fmt::Display) -> Self {
        Self {
            detail: format!("connection error: {}", message),
            status: None,
        }
    }

    /// Fatal 401: session is no longer valid.
    pub fn unauthorized() -> Self {
        Self {
            detail: "session expired".to_string(),
            status: Some(401),
        }
    }

    /// Response body could not be decoded into the expected model.
    pub fn decode(message: impl fmt::Display) -> Self {
        Self {
            detail: format!("unexpected response shape: {}", message),
            status: None,
        }
    }

    /// Build from a non-2xx response body.
    ///
    /// The backend reports errors as `{"detail": ...}` where `detail` is
    /// either a string or a list of validation errors carrying `msg`
    /// fields. Lists are joined into one readable string.
    pub fn from_error_body(status: u16, body: &Value) -> Self {
        let detail = match body.get("detail") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Array(items)) => {
                let joined: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(Value::as_str))
                    .collect();
                if joined.is_empty() {
                    "unknown error".to_string()
                } else {
                    joined.join(". ")
                }
            }
            _ => "unknown error".to_string(),
        };
        Self {
            detail,
            status: Some(status),
        }
    }

    /// True when this is the concurrent-trigger conflict. Callers treat
    /// it as "the job is running, start polling" rather than a failure.
    pub fn is_already_running(&self) -> bool {
        self.detail.contains(ALREADY_RUNNING_MARKER)
    }

    /// True for the fatal unauthenticated case (session cleared).
    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(code) => write!(f, "{} (HTTP {})", self.detail, code),
            None => write!(f, "{}", self.detail),
        }
    }
}

impl std::error::Error for ApiError {}
