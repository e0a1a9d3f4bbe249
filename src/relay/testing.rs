//! In-memory `CaseSource` / `IssueSink` fakes that record every call

use crate::integrations::{CaseSource, IssueSink, ProbeOutcome};
use crate::model::{Case, CreatedIssue, IssueDraft, Label, Severity};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub(crate) fn case(id: &str, title: &str, tags: &[&str], severity: Severity, version: &str) -> Case {
    Case {
        id: id.to_string(),
        title: title.to_string(),
        description: Some(format!("{} details", title)),
        severity,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        version: version.to_string(),
        status: Some("open".to_string()),
        created_by: None,
    }
}

/// Recorded `update_tags_and_status` call
#[derive(Debug, Clone)]
pub(crate) struct UpdateCall {
    pub case_id: String,
    pub version: String,
    pub tags: Vec<String>,
}

#[derive(Default)]
pub(crate) struct FakeCases {
    pub found: Vec<Case>,
    /// Snapshots returned by `get`
    pub fresh: HashMap<String, Case>,
    /// Results handed out by successive updates; empty means success
    pub update_results: Mutex<VecDeque<bool>>,
    pub comment_ok: bool,
    pub probe_outcome: Option<ProbeOutcome>,
    pub searches: Mutex<Vec<String>>,
    pub gets: Mutex<Vec<String>>,
    pub updates: Mutex<Vec<UpdateCall>>,
    pub comments: Mutex<Vec<(String, String)>>,
}

impl FakeCases {
    pub fn with_cases(found: Vec<Case>) -> Self {
        Self {
            found,
            comment_ok: true,
            ..Default::default()
        }
    }

    pub fn failing_updates(self, results: &[bool]) -> Self {
        *self.update_results.lock().unwrap() = results.iter().copied().collect();
        self
    }

    pub fn with_fresh(mut self, case: Case) -> Self {
        self.fresh.insert(case.id.clone(), case);
        self
    }

    pub fn updates(&self) -> Vec<UpdateCall> {
        self.updates.lock().unwrap().clone()
    }

    pub fn comments(&self) -> Vec<(String, String)> {
        self.comments.lock().unwrap().clone()
    }

    pub fn gets(&self) -> Vec<String> {
        self.gets.lock().unwrap().clone()
    }
}

#[async_trait]
impl CaseSource for FakeCases {
    async fn find_by_tag(&self, tag: &str) -> Vec<Case> {
        self.searches.lock().unwrap().push(tag.to_string());
        self.found.clone()
    }

    async fn get(&self, case_id: &str) -> Option<Case> {
        self.gets.lock().unwrap().push(case_id.to_string());
        self.fresh.get(case_id).cloned()
    }

    async fn update_tags_and_status(&self, case: &Case, remove_tag: &str, add_tag: &str) -> bool {
        self.updates.lock().unwrap().push(UpdateCall {
            case_id: case.id.clone(),
            version: case.version.clone(),
            tags: case.retagged(remove_tag, add_tag),
        });
        self.update_results.lock().unwrap().pop_front().unwrap_or(true)
    }

    async fn add_comment(&self, case_id: &str, text: &str) -> bool {
        self.comments
            .lock()
            .unwrap()
            .push((case_id.to_string(), text.to_string()));
        self.comment_ok
    }

    async fn probe(&self) -> ProbeOutcome {
        self.probe_outcome.clone().unwrap_or(ProbeOutcome::Reachable)
    }
}

#[derive(Default)]
pub(crate) struct FakeIssues {
    pub labels: Vec<Label>,
    pub fail_titles: Vec<String>,
    pub probe_outcome: Option<ProbeOutcome>,
    pub label_requests: Mutex<usize>,
    pub created: Mutex<Vec<IssueDraft>>,
}

impl FakeIssues {
    pub fn with_labels(labels: Vec<Label>) -> Self {
        Self {
            labels,
            ..Default::default()
        }
    }

    pub fn created(&self) -> Vec<IssueDraft> {
        self.created.lock().unwrap().clone()
    }

    pub fn label_requests(&self) -> usize {
        *self.label_requests.lock().unwrap()
    }
}

#[async_trait]
impl IssueSink for FakeIssues {
    async fn list_org_labels(&self) -> Vec<Label> {
        *self.label_requests.lock().unwrap() += 1;
        self.labels.clone()
    }

    async fn create_issue(&self, draft: &IssueDraft) -> Option<CreatedIssue> {
        if self.fail_titles.contains(&draft.title) {
            return None;
        }
        let mut created = self.created.lock().unwrap();
        created.push(draft.clone());
        let number = created.len() as u64;
        Some(CreatedIssue {
            number,
            html_url: format!("https://gitea.example.com/secops/incidents/issues/{}", number),
        })
    }

    async fn probe(&self) -> ProbeOutcome {
        self.probe_outcome.clone().unwrap_or(ProbeOutcome::Reachable)
    }
}
