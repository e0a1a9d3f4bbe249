//! Kibana Security case snapshot
//!
//! A `Case` is the read-only view of one case as returned by the cases API.
//! The relay never mutates a snapshot; write-back computes a new tag list
//! and submits it together with the snapshot's version token.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Case severity as reported by Kibana
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Parse a severity name, ignoring case
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Absent, null or unrecognized severities read as `Low`
fn deserialize_severity<'de, D>(deserializer: D) -> Result<Severity, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Severity::parse).unwrap_or_default())
}

fn deserialize_null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<String>> = Option::deserialize(deserializer)?;
    Ok(raw.unwrap_or_default())
}

/// User who opened the case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseCreator {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Kibana Security case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_severity")]
    pub severity: Severity,
    #[serde(default, deserialize_with = "deserialize_null_as_empty")]
    pub tags: Vec<String>,
    /// Optimistic-concurrency token required by updates
    pub version: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_by: Option<CaseCreator>,
}

/// Placeholder used when the case creator has no display name
pub const UNKNOWN_CREATOR: &str = "N/A";

impl Case {
    /// Case-insensitive tag membership
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| tags_equal(t, tag))
    }

    /// Tag list for the write-back request.
    ///
    /// Drops every casing of `remove` and appends `add` unless some casing of
    /// it is already present. Order of the remaining tags is preserved.
    pub fn retagged(&self, remove: &str, add: &str) -> Vec<String> {
        let mut tags: Vec<String> = self
            .tags
            .iter()
            .filter(|t| !tags_equal(t, remove))
            .cloned()
            .collect();
        if !tags.iter().any(|t| tags_equal(t, add)) {
            tags.push(add.to_string());
        }
        tags
    }

    /// Display name of the creator, or "N/A"
    pub fn creator_name(&self) -> &str {
        self.created_by
            .as_ref()
            .and_then(|c| c.full_name.as_deref())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(UNKNOWN_CREATOR)
    }

    /// Link to the case in the Security app
    pub fn deep_link(&self, kibana_url: &str) -> String {
        format!(
            "{}/app/security/cases/{}",
            kibana_url.trim_end_matches('/'),
            self.id
        )
    }
}

/// Tag equality ignoring case, Unicode-aware
pub fn tags_equal(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// Casings a tag is searched under: as supplied, lowercase, titlecase and
/// uppercase, with duplicates removed.
pub fn tag_casings(tag: &str) -> Vec<String> {
    let lower = tag.to_lowercase();
    let mut chars = lower.chars();
    let title = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };

    let mut casings: Vec<String> = Vec::with_capacity(4);
    for candidate in [tag.to_string(), lower, title, tag.to_uppercase()] {
        if !casings.contains(&candidate) {
            casings.push(candidate);
        }
    }
    casings
}
