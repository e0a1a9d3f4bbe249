//! Gitea issue and label types

use super::case::Case;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Organization label in Gitea
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: u64,
    pub name: String,
}

impl Label {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Issue creation payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueDraft {
    pub title: String,
    pub body: String,
    pub labels: Vec<u64>,
}

impl IssueDraft {
    /// Build the issue forwarded for `case`.
    ///
    /// Title is the case title; the body is the case description followed by
    /// a provenance footer linking back to the case.
    pub fn from_case(case: &Case, kibana_url: &str, labels: BTreeSet<u64>) -> Self {
        Self {
            title: case.title.clone(),
            body: render_body(case, kibana_url),
            labels: labels.into_iter().collect(),
        }
    }
}

/// `description + "\n\n---\n" + provenance`
pub fn render_body(case: &Case, kibana_url: &str) -> String {
    format!(
        "{}\n\n---\n{}",
        case.description.as_deref().unwrap_or_default(),
        provenance_line(case, kibana_url)
    )
}

fn provenance_line(case: &Case, kibana_url: &str) -> String {
    format!(
        "Forwarded from Kibana case {} (opened by {})",
        case.deep_link(kibana_url),
        case.creator_name()
    )
}

/// Subset of Gitea's issue response the relay needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedIssue {
    #[serde(default)]
    pub number: u64,
    pub html_url: String,
}
