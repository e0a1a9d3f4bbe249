//! Gitea Issues Adapter
//!
//! Label lookup and issue creation against the Gitea REST API (v1).

use super::{build_client, error_for_response, IssueSink, ProbeOutcome};
use crate::config::GiteaConfig;
use crate::model::{CreatedIssue, IssueDraft, Label};
use crate::relay::metrics;
use crate::{RelayError, Result};
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Requested page size for label listing. Servers may cap it lower
/// (`MAX_RESPONSE_ITEMS`), so a short page does not mean the last page.
const LABEL_PAGE_SIZE: usize = 50;
/// Total item count Gitea reports on list endpoints
const TOTAL_COUNT_HEADER: &str = "x-total-count";
/// Stop paging after this many pages
const MAX_LABEL_PAGES: usize = 40;

/// Gitea API client
pub struct GiteaAdapter {
    client: Client,
    api_url: String,
    organization: String,
    repository: String,
}

impl GiteaAdapter {
    /// Create a new Gitea adapter
    ///
    /// Returns an error if the token is missing or the HTTP client cannot be created.
    pub fn new(config: &GiteaConfig, timeout: Duration) -> Result<Self> {
        let token = config
            .resolve_api_key()
            .ok_or_else(|| RelayError::Config("Gitea API key is not set".to_string()))?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("token {}", token))
            .map_err(|e| RelayError::Config(format!("Invalid Gitea API key: {}", e)))?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let client = build_client(config.verify_tls, timeout, headers)?;
        let api_url = format!("{}/api/v1", config.url.trim_end_matches('/'));

        Ok(Self {
            client,
            api_url,
            organization: config.organization.clone(),
            repository: config.repository.clone(),
        })
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    fn issues_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/issues",
            self.api_url,
            urlencoding::encode(&self.organization),
            urlencoding::encode(&self.repository)
        )
    }

    /// Fetch every label defined on the organization, following pagination
    pub async fn fetch_org_labels(&self) -> Result<Vec<Label>> {
        let url = format!(
            "{}/orgs/{}/labels",
            self.api_url,
            urlencoding::encode(&self.organization)
        );

        let mut labels = Vec::new();
        for page in 1..=MAX_LABEL_PAGES {
            let response = self
                .client
                .get(&url)
                .query(&[("page", page), ("limit", LABEL_PAGE_SIZE)])
                .send()
                .await?;

            if response.status() != StatusCode::OK {
                return Err(error_for_response(
                    response,
                    &format!("labels of organization {}", self.organization),
                )
                .await);
            }

            let total = response
                .headers()
                .get(TOTAL_COUNT_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<usize>().ok());

            let batch: Vec<Label> = response.json().await?;
            if batch.is_empty() {
                break;
            }
            labels.extend(batch);
            if total.is_some_and(|total| labels.len() >= total) {
                break;
            }
            if page == MAX_LABEL_PAGES {
                warn!(
                    org = %self.organization,
                    fetched = labels.len(),
                    "Stopped listing Gitea labels at the page limit"
                );
            }
        }

        debug!(org = %self.organization, count = labels.len(), "Listed Gitea labels");
        Ok(labels)
    }

    /// Create an issue in the configured repository
    pub async fn post_issue(&self, draft: &IssueDraft) -> Result<CreatedIssue> {
        let response = self
            .client
            .post(self.issues_url())
            .json(draft)
            .send()
            .await?;

        match response.status() {
            StatusCode::CREATED | StatusCode::OK => Ok(response.json().await?),
            _ => Err(error_for_response(
                response,
                &format!("repository {}/{}", self.organization, self.repository),
            )
            .await),
        }
    }

    /// Fetch an issue by number; used by the probe with a number that cannot exist
    async fn fetch_issue(&self, number: u64) -> Result<CreatedIssue> {
        let url = format!("{}/{}", self.issues_url(), number);
        let response = self.client.get(&url).send().await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            _ => Err(error_for_response(response, &format!("issue #{}", number)).await),
        }
    }
}

#[async_trait]
impl IssueSink for GiteaAdapter {
    async fn list_org_labels(&self) -> Vec<Label> {
        match self.fetch_org_labels().await {
            Ok(labels) => labels,
            Err(e) => {
                metrics::record_api_error("gitea", e.kind());
                warn!(
                    org = %self.organization,
                    error = %e,
                    "Failed to list Gitea labels; issues will be created without labels"
                );
                Vec::new()
            }
        }
    }

    async fn create_issue(&self, draft: &IssueDraft) -> Option<CreatedIssue> {
        info!(
            repo = %self.repository,
            title = %draft.title,
            labels = ?draft.labels,
            "Creating Gitea issue"
        );

        match self.post_issue(draft).await {
            Ok(issue) => {
                info!(number = issue.number, url = %issue.html_url, "Gitea issue created");
                Some(issue)
            }
            Err(e) => {
                metrics::record_api_error("gitea", e.kind());
                error!(title = %draft.title, error = %e, "Failed to create Gitea issue");
                None
            }
        }
    }

    async fn probe(&self) -> ProbeOutcome {
        let outcome = ProbeOutcome::from_result(self.fetch_issue(0).await);
        if outcome.is_ok() {
            info!(
                org = %self.organization,
                repo = %self.repository,
                "Gitea connectivity check passed"
            );
        } else {
            error!(
                org = %self.organization,
                repo = %self.repository,
                outcome = %outcome,
                "Gitea connectivity check failed"
            );
        }
        outcome
    }
}
