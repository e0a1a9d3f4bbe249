//! External Integrations
//!
//! Adapters for Kibana Security Cases (the case source) and Gitea (the issue
//! sink), plus the capability traits the sync engine consumes.
//!
//! # Error boundary
//!
//! Each adapter performs its HTTP calls through `Result`-returning methods.
//! The trait methods below are where those errors stop: they are logged with
//! structured fields and turned into a boolean, an empty list, or `None`.
//! Nothing an adapter encounters during a poll cycle propagates into the sync
//! engine or the poll loop.

pub mod gitea;
pub mod kibana;

pub use gitea::GiteaAdapter;
pub use kibana::KibanaAdapter;

use crate::model::{Case, CreatedIssue, IssueDraft, Label};
use crate::RelayError;
use async_trait::async_trait;
use std::fmt;

/// Maximum number of cases returned by one search
pub const MAX_CASES_PER_SEARCH: usize = 100;

/// Read and acknowledge cases in the case-management system
#[async_trait]
pub trait CaseSource: Send + Sync {
    /// Cases carrying `tag` in any casing, at most [`MAX_CASES_PER_SEARCH`].
    /// Empty on failure.
    async fn find_by_tag(&self, tag: &str) -> Vec<Case>;

    /// Fresh snapshot of a single case. `None` on failure.
    async fn get(&self, case_id: &str) -> Option<Case>;

    /// Swap `remove_tag` for `add_tag`, set the status to in-progress and submit
    /// the snapshot's version token, all in one request. `false` on any failure,
    /// version conflicts included.
    async fn update_tags_and_status(&self, case: &Case, remove_tag: &str, add_tag: &str) -> bool;

    /// Best-effort comment on a case
    async fn add_comment(&self, case_id: &str, text: &str) -> bool;

    /// Startup connectivity check
    async fn probe(&self) -> ProbeOutcome;
}

/// Create issues in the issue tracker
#[async_trait]
pub trait IssueSink: Send + Sync {
    /// Full organization label set. Empty on failure.
    async fn list_org_labels(&self) -> Vec<Label>;

    /// Create one issue. `None` on failure.
    async fn create_issue(&self, draft: &IssueDraft) -> Option<CreatedIssue>;

    /// Startup connectivity check
    async fn probe(&self) -> ProbeOutcome;
}

/// Result of a connectivity probe.
///
/// Probes fetch a resource that cannot exist; a 404 proves the endpoint is
/// reachable and the credentials were accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Endpoint answered "not found"
    Reachable,
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// Connection, DNS or timeout failure
    Unreachable(String),
    /// Any other response
    Unexpected(String),
}

impl ProbeOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ProbeOutcome::Reachable)
    }

    /// Interpret the result of fetching a nonexistent resource
    pub(crate) fn from_result<T>(result: crate::Result<T>) -> Self {
        match result {
            Err(RelayError::NotFound(_)) => ProbeOutcome::Reachable,
            Err(RelayError::Auth { status }) if status.as_u16() == 401 => {
                ProbeOutcome::Unauthorized
            }
            Err(RelayError::Auth { .. }) => ProbeOutcome::Forbidden,
            Err(RelayError::Http(e)) => ProbeOutcome::Unreachable(e.to_string()),
            Err(e) => ProbeOutcome::Unexpected(e.to_string()),
            Ok(_) => ProbeOutcome::Unexpected("probe resource unexpectedly exists".to_string()),
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Reachable => write!(f, "reachable"),
            ProbeOutcome::Unauthorized => write!(f, "unauthorized (check API key)"),
            ProbeOutcome::Forbidden => write!(f, "forbidden (API key lacks privileges)"),
            ProbeOutcome::Unreachable(e) => write!(f, "unreachable: {}", e),
            ProbeOutcome::Unexpected(e) => write!(f, "unexpected response: {}", e),
        }
    }
}

/// Build the shared reqwest client for an adapter
pub(crate) fn build_client(
    verify_tls: bool,
    timeout: std::time::Duration,
    headers: reqwest::header::HeaderMap,
) -> crate::Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .danger_accept_invalid_certs(!verify_tls)
        .user_agent(concat!("casebridge/", env!("CARGO_PKG_VERSION")))
        .default_headers(headers)
        .build()?;
    Ok(client)
}

/// Turn a non-success response into a classified error
pub(crate) async fn error_for_response(response: reqwest::Response, what: &str) -> RelayError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    RelayError::from_status(status, what, body)
}
