//! Casebridge configuration file handling
//!
//! Loads the YAML configuration describing both remote systems, the tag
//! protocol, the severity label table, logging and metrics export.

use super::validation::validate_config;
use crate::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Kibana Security Cases connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KibanaConfig {
    /// Kibana base URL (e.g., "https://kibana.example.com")
    pub url: String,

    /// API key sent as `Authorization: ApiKey <key>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable holding the API key, used when `api_key` is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Verify the server's TLS certificate
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,

    /// Solution that owns the cases, required when posting comments
    #[serde(default = "default_case_owner")]
    pub case_owner: String,
}

/// Gitea connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiteaConfig {
    /// Gitea base URL (e.g., "https://gitea.example.com")
    pub url: String,

    /// Access token sent as `Authorization: token <key>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable holding the token, used when `api_key` is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Organization owning both the labels and the target repository
    pub organization: String,

    /// Repository that receives the issues
    pub repository: String,

    /// Verify the server's TLS certificate
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
}

/// Tag protocol and polling behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Tag marking a case for intake
    pub search_tag: String,

    /// Tag marking a case as already forwarded
    pub success_tag: String,

    /// Pause between the end of one cycle and the start of the next
    pub poll_interval_secs: u64,

    /// Upper bound for any single HTTP request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Severity name -> Gitea label id. Must contain "low".
    pub severity_labels: BTreeMap<String, u64>,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Metrics export settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Write Prometheus text format here after every cycle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub textfile_path: Option<PathBuf>,
}

fn default_verify_tls() -> bool {
    true
}

fn default_case_owner() -> String {
    "securitySolution".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Casebridge configuration
///
/// Immutable once loaded; every component receives the pieces it needs from
/// this value rather than reading ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub kibana: KibanaConfig,

    pub gitea: GiteaConfig,

    pub sync: SyncSettings,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl RelayConfig {
    /// Load and validate configuration from a specific path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config = Self::load_unvalidated(path)?;
        validate_config(&config).map_err(RelayError::Validation)?;
        Ok(config)
    }

    /// Parse a configuration file without running validation
    pub fn load_unvalidated(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(RelayError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        tracing::info!(path = %path.display(), "Loading Casebridge configuration");

        let content = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;

        tracing::debug!(
            kibana = %config.kibana.url,
            gitea = %config.gitea.url,
            severities = config.sync.severity_labels.len(),
            "Configuration parsed"
        );

        Ok(config)
    }

    /// Resolve the config path when none was given on the command line.
    ///
    /// Prefers `./config.yml`, falling back to `~/.config/casebridge/config.yml`.
    pub fn default_path() -> PathBuf {
        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return local;
        }

        match dirs::home_dir() {
            Some(mut path) => {
                path.push(".config");
                path.push("casebridge");
                path.push(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    path
                } else {
                    local
                }
            }
            None => local,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.sync.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.sync.request_timeout_secs)
    }
}

impl KibanaConfig {
    /// The API key, read from the environment when configured that way
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_key(self.api_key.as_deref(), self.api_key_env.as_deref())
    }
}

impl GiteaConfig {
    /// The access token, read from the environment when configured that way
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_key(self.api_key.as_deref(), self.api_key_env.as_deref())
    }
}

fn resolve_key(inline: Option<&str>, env_var: Option<&str>) -> Option<String> {
    if let Some(key) = inline.filter(|k| !k.trim().is_empty()) {
        return Some(key.to_string());
    }
    env_var
        .and_then(|var| std::env::var(var.trim_start_matches('$')).ok())
        .filter(|k| !k.trim().is_empty())
}
