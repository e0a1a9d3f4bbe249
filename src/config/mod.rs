//! Configuration system
//!
//! Loads the YAML configuration file with support for:
//! - Kibana and Gitea connection settings (inline or env-provided keys)
//! - The search/success tag protocol and poll cadence
//! - The severity -> label table
//! - Logging and metrics export settings

mod relay_config;
pub mod validation;

pub use relay_config::{
    GiteaConfig, KibanaConfig, LoggingConfig, MetricsConfig, RelayConfig, SyncSettings,
    DEFAULT_CONFIG_FILE,
};
pub use validation::{validate_config, ValidationError};
