//! casebridge - forwards escalated Kibana Security cases to Gitea issues
//!
//! The relay polls Kibana for cases carrying a configured tag, opens one
//! Gitea issue per case, and writes the outcome back onto the case so it is
//! never forwarded twice.
//!
//! # Architecture
//!
//! - **model**: Case and issue data types
//! - **config**: YAML configuration and validation
//! - **integrations**: Kibana and Gitea HTTP adapters
//! - **relay**: Label mapping, sync engine, poll loop, metrics
//! - **logging**: tracing subscriber setup

pub mod config;
pub mod error;
pub mod integrations;
pub mod logging;
pub mod model;
pub mod relay;

// Re-exports
pub use error::{RelayError, Result};
