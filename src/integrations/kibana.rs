//! Kibana Security Cases Adapter
//!
//! Case discovery and write-back against the Kibana cases REST API.

use super::{build_client, error_for_response, CaseSource, ProbeOutcome, MAX_CASES_PER_SEARCH};
use crate::config::KibanaConfig;
use crate::model::{tag_casings, Case};
use crate::relay::metrics;
use crate::{RelayError, Result};
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Status written back together with the success tag
pub const IN_PROGRESS_STATUS: &str = "in-progress";

/// Case id that cannot exist, fetched by the connectivity probe
const PROBE_CASE_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Kibana cases API client
pub struct KibanaAdapter {
    client: Client,
    base_url: String,
    cases_url: String,
    case_owner: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CaseSearchResponse {
    #[serde(default)]
    cases: Vec<Case>,
    #[serde(default)]
    total: Option<u64>,
}

/// Body of the bulk update endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CaseUpdateRequest {
    pub cases: Vec<CaseUpdate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseUpdate {
    pub id: String,
    pub version: String,
    pub tags: Vec<String>,
    pub status: String,
}

impl CaseUpdateRequest {
    /// Single-case update swapping `remove_tag` for `add_tag`
    pub fn retag(case: &Case, remove_tag: &str, add_tag: &str) -> Self {
        Self {
            cases: vec![CaseUpdate {
                id: case.id.clone(),
                version: case.version.clone(),
                tags: case.retagged(remove_tag, add_tag),
                status: IN_PROGRESS_STATUS.to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct CommentRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    owner: &'a str,
    comment: &'a str,
}

impl KibanaAdapter {
    /// Create a new Kibana adapter
    ///
    /// Returns an error if the API key is missing or the HTTP client cannot be created.
    pub fn new(config: &KibanaConfig, timeout: Duration) -> Result<Self> {
        let api_key = config
            .resolve_api_key()
            .ok_or_else(|| RelayError::Config("Kibana API key is not set".to_string()))?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("ApiKey {}", api_key))
            .map_err(|e| RelayError::Config(format!("Invalid Kibana API key: {}", e)))?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert("kbn-xsrf", HeaderValue::from_static("true"));

        let client = build_client(config.verify_tls, timeout, headers)?;
        let base_url = config.url.trim_end_matches('/').to_string();
        let cases_url = format!("{}/api/cases", base_url);

        Ok(Self {
            client,
            base_url,
            cases_url,
            case_owner: config.case_owner.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn case_url(&self, case_id: &str) -> String {
        format!("{}/{}", self.cases_url, urlencoding::encode(case_id))
    }

    /// Search cases tagged with any casing of `tag`
    pub async fn search_cases(&self, tag: &str) -> Result<Vec<Case>> {
        let url = format!("{}/_find", self.cases_url);

        let mut params: Vec<(&str, String)> = tag_casings(tag)
            .into_iter()
            .map(|t| ("tags", t))
            .collect();
        params.push(("perPage", MAX_CASES_PER_SEARCH.to_string()));

        debug!(tag = %tag, "Searching Kibana cases");

        let response = self.client.get(&url).query(&params).send().await?;

        if response.status() != StatusCode::OK {
            return Err(error_for_response(response, "case search").await);
        }

        let result: CaseSearchResponse = response.json().await?;
        let mut cases = result.cases;
        if let Some(total) = result.total {
            if total as usize > MAX_CASES_PER_SEARCH {
                warn!(
                    total = total,
                    limit = MAX_CASES_PER_SEARCH,
                    "More tagged cases than one search returns; the rest wait for later cycles"
                );
            }
        }
        cases.truncate(MAX_CASES_PER_SEARCH);

        info!(tag = %tag, returned = cases.len(), "Kibana case search complete");
        Ok(cases)
    }

    /// Get a single case by id
    pub async fn get_case(&self, case_id: &str) -> Result<Case> {
        debug!(case_id = %case_id, "Fetching Kibana case");

        let response = self.client.get(self.case_url(case_id)).send().await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            _ => Err(error_for_response(response, &format!("case {}", case_id)).await),
        }
    }

    /// Submit a bulk update request
    pub async fn update_cases(&self, request: &CaseUpdateRequest) -> Result<()> {
        let response = self
            .client
            .patch(&self.cases_url)
            .json(request)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(()),
            _ => {
                let ids: Vec<&str> = request.cases.iter().map(|c| c.id.as_str()).collect();
                Err(error_for_response(response, &format!("cases {}", ids.join(","))).await)
            }
        }
    }

    /// Post a user comment on a case
    pub async fn post_comment(&self, case_id: &str, text: &str) -> Result<()> {
        let url = format!("{}/comments", self.case_url(case_id));
        let body = CommentRequest {
            kind: "user",
            owner: &self.case_owner,
            comment: text,
        };

        let response = self.client.post(&url).json(&body).send().await?;

        match response.status() {
            StatusCode::OK => Ok(()),
            _ => Err(error_for_response(response, &format!("case {}", case_id)).await),
        }
    }
}

#[async_trait]
impl CaseSource for KibanaAdapter {
    async fn find_by_tag(&self, tag: &str) -> Vec<Case> {
        match self.search_cases(tag).await {
            Ok(cases) => cases,
            Err(e) => {
                metrics::record_api_error("kibana", e.kind());
                if e.is_auth() {
                    error!(tag = %tag, error = %e, "Kibana rejected credentials during case search");
                } else {
                    error!(tag = %tag, error = %e, "Kibana case search failed");
                }
                Vec::new()
            }
        }
    }

    async fn get(&self, case_id: &str) -> Option<Case> {
        match self.get_case(case_id).await {
            Ok(case) => Some(case),
            Err(e) => {
                metrics::record_api_error("kibana", e.kind());
                warn!(case_id = %case_id, error = %e, "Failed to fetch Kibana case");
                None
            }
        }
    }

    async fn update_tags_and_status(&self, case: &Case, remove_tag: &str, add_tag: &str) -> bool {
        let request = CaseUpdateRequest::retag(case, remove_tag, add_tag);
        info!(
            case_id = %case.id,
            version = %case.version,
            tags = ?request.cases[0].tags,
            "Updating Kibana case tags and status"
        );

        match self.update_cases(&request).await {
            Ok(()) => true,
            Err(e) => {
                metrics::record_api_error("kibana", e.kind());
                if e.is_conflict() {
                    warn!(case_id = %case.id, version = %case.version, error = %e, "Kibana case version conflict");
                } else {
                    warn!(case_id = %case.id, error = %e, "Kibana case update failed");
                }
                false
            }
        }
    }

    async fn add_comment(&self, case_id: &str, text: &str) -> bool {
        match self.post_comment(case_id, text).await {
            Ok(()) => {
                debug!(case_id = %case_id, "Comment added to Kibana case");
                true
            }
            Err(e) => {
                metrics::record_api_error("kibana", e.kind());
                warn!(case_id = %case_id, error = %e, "Failed to add comment to Kibana case");
                false
            }
        }
    }

    async fn probe(&self) -> ProbeOutcome {
        let outcome = ProbeOutcome::from_result(self.get_case(PROBE_CASE_ID).await);
        if outcome.is_ok() {
            info!(url = %self.base_url, "Kibana connectivity check passed");
        } else {
            error!(url = %self.base_url, outcome = %outcome, "Kibana connectivity check failed");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(url: &str) -> KibanaConfig {
        KibanaConfig {
            url: url.to_string(),
            api_key: Some("secret".to_string()),
            api_key_env: None,
            verify_tls: true,
            case_owner: "securitySolution".to_string(),
        }
    }

    fn adapter(server: &MockServer) -> KibanaAdapter {
        KibanaAdapter::new(&test_config(&server.uri()), Duration::from_secs(5))
            .expect("Failed to create adapter")
    }

    fn case_json(id: &str, tags: &[&str]) -> serde_json::Value {
        json!({
            "id": id,
            "version": "WzEsMV0=",
            "title": format!("Case {}", id),
            "description": "details",
            "severity": "medium",
            "tags": tags,
            "status": "open",
            "created_by": { "username": "analyst", "full_name": "Ana Lyst" }
        })
    }

    fn sample_case(tags: &[&str]) -> Case {
        Case {
            id: "c1".to_string(),
            title: "Brute force".to_string(),
            description: None,
            severity: Severity::High,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            version: "v1".to_string(),
            status: Some("open".to_string()),
            created_by: None,
        }
    }

    #[test]
    fn test_adapter_creation() {
        let adapter = KibanaAdapter::new(
            &test_config("https://kibana.example.com/"),
            Duration::from_secs(5),
        )
        .expect("Failed to create adapter");
        assert_eq!(adapter.base_url(), "https://kibana.example.com");
        assert_eq!(
            adapter.case_url("a b"),
            "https://kibana.example.com/api/cases/a%20b"
        );
    }

    #[test]
    fn test_adapter_requires_api_key() {
        let mut config = test_config("https://kibana.example.com");
        config.api_key = None;
        assert!(matches!(
            KibanaAdapter::new(&config, Duration::from_secs(5)),
            Err(RelayError::Config(_))
        ));
    }

    #[test]
    fn test_retag_request_payload() {
        let request = CaseUpdateRequest::retag(&sample_case(&["security"]), "security", "forwarded");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "cases": [{
                    "id": "c1",
                    "version": "v1",
                    "tags": ["forwarded"],
                    "status": "in-progress"
                }]
            })
        );
    }

    #[tokio::test]
    async fn test_find_by_tag_queries_all_casings() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/cases/_find"))
            .and(header("kbn-xsrf", "true"))
            .and(header("authorization", "ApiKey secret"))
            .and(query_param("tags", "security"))
            .and(query_param("tags", "Security"))
            .and(query_param("tags", "SECURITY"))
            .and(query_param("perPage", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "cases": [
                    case_json("c1", &["security"]),
                    case_json("c2", &["Security"]),
                    case_json("c3", &["SECURITY"])
                ],
                "page": 1,
                "per_page": 100,
                "total": 3
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cases = adapter(&server).find_by_tag("Security").await;
        let ids: Vec<&str> = cases.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
        assert_eq!(cases[0].severity, Severity::Medium);
    }

    #[tokio::test]
    async fn test_find_by_tag_returns_empty_on_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/cases/_find"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        assert!(adapter(&server).find_by_tag("security").await.is_empty());
    }

    #[tokio::test]
    async fn test_find_by_tag_returns_empty_when_unreachable() {
        let config = test_config("http://127.0.0.1:9");
        let adapter = KibanaAdapter::new(&config, Duration::from_millis(500)).unwrap();
        assert!(adapter.find_by_tag("security").await.is_empty());
    }

    #[tokio::test]
    async fn test_get_case() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/cases/c1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(case_json("c1", &["security"])))
            .mount(&server)
            .await;

        let case = adapter(&server).get("c1").await.expect("case");
        assert_eq!(case.version, "WzEsMV0=");
        assert!(adapter(&server).get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_update_tags_and_status() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/cases"))
            .and(body_json(json!({
                "cases": [{
                    "id": "c1",
                    "version": "v1",
                    "tags": ["network", "forwarded"],
                    "status": "in-progress"
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let ok = adapter(&server)
            .update_tags_and_status(&sample_case(&["Security", "network"]), "security", "forwarded")
            .await;
        assert!(ok);
    }

    #[tokio::test]
    async fn test_update_conflict_returns_false() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/cases"))
            .respond_with(
                ResponseTemplate::new(409).set_body_string("version conflict for case c1"),
            )
            .mount(&server)
            .await;

        let adapter = adapter(&server);
        let request = CaseUpdateRequest::retag(&sample_case(&["security"]), "security", "forwarded");
        assert!(adapter.update_cases(&request).await.unwrap_err().is_conflict());
        assert!(
            !adapter
                .update_tags_and_status(&sample_case(&["security"]), "security", "forwarded")
                .await
        );
    }

    #[tokio::test]
    async fn test_add_comment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/cases/c1/comments"))
            .and(body_json(json!({
                "type": "user",
                "owner": "securitySolution",
                "comment": "Issue: https://gitea.example.com/secops/incidents/issues/7"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(case_json("c1", &[])))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = adapter(&server);
        assert!(
            adapter
                .add_comment("c1", "Issue: https://gitea.example.com/secops/incidents/issues/7")
                .await
        );
        assert!(!adapter.add_comment("c2", "unmatched").await);
    }

    #[tokio::test]
    async fn test_probe_outcomes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/api/cases/{}", PROBE_CASE_ID)))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        assert_eq!(adapter(&server).probe().await, ProbeOutcome::Reachable);

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        assert_eq!(adapter(&server).probe().await, ProbeOutcome::Unauthorized);

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        assert_eq!(adapter(&server).probe().await, ProbeOutcome::Forbidden);
    }
}
