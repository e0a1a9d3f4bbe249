//! Error types for Casebridge
//!
//! Covers every failure mode the relay distinguishes: transport problems,
//! authentication and lookup failures reported by either remote API,
//! optimistic-concurrency conflicts on case updates, and fatal
//! configuration errors at startup. Uses thiserror for ergonomic error handling.

use crate::config::ValidationError;
use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias for Casebridge operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Comprehensive error type for Casebridge operations
#[derive(Error, Debug)]
pub enum RelayError {
    /// Configuration errors (missing file, missing keys, bad values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration failed validation
    #[error("Invalid configuration: {}", format_validation(.0))]
    Validation(Vec<ValidationError>),

    /// Transport-level failures (DNS, timeout, connection refused) and
    /// response decoding errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote rejected our credentials (401/403)
    #[error("Authentication failed: HTTP {status}")]
    Auth { status: StatusCode },

    /// Remote resource does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Stale version token on a case update (409)
    #[error("Version conflict: {0}")]
    Conflict(String),

    /// Any other non-success HTTP response
    #[error("API error: HTTP {status}: {body}")]
    Api { status: StatusCode, body: String },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl RelayError {
    /// Classify a non-success HTTP response.
    ///
    /// `what` names the resource for not-found and conflict messages.
    pub fn from_status(status: StatusCode, what: &str, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RelayError::Auth { status },
            StatusCode::NOT_FOUND => RelayError::NotFound(what.to_string()),
            StatusCode::CONFLICT => RelayError::Conflict(format!("{}: {}", what, body)),
            _ => RelayError::Api { status, body },
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, RelayError::Auth { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RelayError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, RelayError::Conflict(_))
    }

    /// Short label used for the `kind` dimension of error metrics
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Config(_) | RelayError::Validation(_) => "config",
            RelayError::Http(e) if e.is_timeout() => "timeout",
            RelayError::Http(e) if e.is_decode() => "decode",
            RelayError::Http(_) => "transport",
            RelayError::Auth { .. } => "auth",
            RelayError::NotFound(_) => "not_found",
            RelayError::Conflict(_) => "conflict",
            RelayError::Api { .. } => "api",
            RelayError::Io(_) => "io",
            RelayError::Json(_) | RelayError::Yaml(_) => "parse",
            RelayError::Other(_) => "other",
        }
    }
}

fn format_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
