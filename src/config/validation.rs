//! Configuration validation
//!
//! Validates Casebridge configuration for correctness:
//! - Valid URLs for both remote systems
//! - API keys resolvable (inline or from the environment)
//! - A usable tag protocol (distinct, non-empty tags)
//! - A severity label table with the "low" fallback entry

use super::relay_config::RelayConfig;
use crate::model::{tags_equal, Severity};

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub(crate) fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation result
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

/// Validate a Casebridge configuration, collecting every problem found
pub fn validate_config(config: &RelayConfig) -> ValidationResult {
    let mut errors = Vec::new();

    // Kibana
    if !is_http_url(&config.kibana.url) {
        errors.push(ValidationError::new(
            "kibana.url",
            format!("Invalid Kibana URL: {}", config.kibana.url),
        ));
    }
    if config.kibana.resolve_api_key().is_none() {
        errors.push(ValidationError::new(
            "kibana.api_key",
            "Set api_key or point api_key_env at a non-empty environment variable",
        ));
    }
    if config.kibana.case_owner.trim().is_empty() {
        errors.push(ValidationError::new(
            "kibana.case_owner",
            "Case owner cannot be empty",
        ));
    }

    // Gitea
    if !is_http_url(&config.gitea.url) {
        errors.push(ValidationError::new(
            "gitea.url",
            format!("Invalid Gitea URL: {}", config.gitea.url),
        ));
    }
    if config.gitea.resolve_api_key().is_none() {
        errors.push(ValidationError::new(
            "gitea.api_key",
            "Set api_key or point api_key_env at a non-empty environment variable",
        ));
    }
    if config.gitea.organization.trim().is_empty() {
        errors.push(ValidationError::new(
            "gitea.organization",
            "Organization cannot be empty",
        ));
    }
    if config.gitea.repository.trim().is_empty() {
        errors.push(ValidationError::new(
            "gitea.repository",
            "Repository cannot be empty",
        ));
    }

    // Tag protocol
    let search_tag = config.sync.search_tag.trim();
    let success_tag = config.sync.success_tag.trim();
    if search_tag.is_empty() {
        errors.push(ValidationError::new("sync.search_tag", "must not be empty"));
    }
    if success_tag.is_empty() {
        errors.push(ValidationError::new("sync.success_tag", "must not be empty"));
    }
    for (field, raw) in [
        ("sync.search_tag", &config.sync.search_tag),
        ("sync.success_tag", &config.sync.success_tag),
    ] {
        if !raw.trim().is_empty() && raw.trim() != raw.as_str() {
            errors.push(ValidationError::new(
                field,
                "must not have leading or trailing whitespace",
            ));
        }
    }
    if !search_tag.is_empty() && tags_equal(search_tag, success_tag) {
        errors.push(ValidationError::new(
            "sync.success_tag",
            "must differ from search_tag (compared case-insensitively)",
        ));
    }

    if config.sync.poll_interval_secs == 0 {
        errors.push(ValidationError::new(
            "sync.poll_interval_secs",
            "must be greater than 0",
        ));
    }
    if config.sync.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "sync.request_timeout_secs",
            "must be greater than 0",
        ));
    }

    // Severity table
    let has_low = config
        .sync
        .severity_labels
        .keys()
        .any(|k| k.eq_ignore_ascii_case("low"));
    if !has_low {
        errors.push(ValidationError::new(
            "sync.severity_labels",
            "must contain a \"low\" entry used as the fallback",
        ));
    }
    for key in config.sync.severity_labels.keys() {
        if Severity::parse(key).is_none() {
            errors.push(ValidationError::new(
                "sync.severity_labels",
                format!(
                    "Unknown severity '{}'. Must be one of: low, medium, high, critical",
                    key
                ),
            ));
        }
    }

    // Logging
    if !LOG_LEVELS.contains(&config.logging.level.to_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "logging.level",
            format!(
                "Invalid level '{}'. Must be one of: {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }
    if !LOG_FORMATS.contains(&config.logging.format.as_str()) {
        errors.push(ValidationError::new(
            "logging.format",
            format!(
                "Invalid format '{}'. Must be one of: {}",
                config.logging.format,
                LOG_FORMATS.join(", ")
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_http_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    matches!(rest, Some(host) if !host.trim_matches('/').is_empty())
}
