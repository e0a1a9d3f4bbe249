//! Relay: the synchronization core
//!
//! # Architecture
//!
//! - **labels**: maps case tags and severity to Gitea label ids
//! - **sync**: per-case state machine (discover, create, acknowledge, retry)
//! - **daemon**: startup probes and the poll loop
//! - **metrics**: Prometheus collectors and textfile export
//!
//! ## Cycle
//!
//! 1. **Discover**: search Kibana for cases carrying the search tag
//! 2. **Skip**: cases already carrying the success tag are left alone
//! 3. **Create**: open a Gitea issue with mapped labels and a link back
//! 4. **Acknowledge**: swap search tag for success tag, set in-progress,
//!    retrying once with a refreshed version token
//! 5. **Comment**: post the issue URL on the case
//!
//! # Example
//!
//! ```ignore
//! use casebridge::config::RelayConfig;
//! use casebridge::relay::{shutdown_signal, Relay};
//!
//! #[tokio::main]
//! async fn main() -> casebridge::Result<()> {
//!     let config = RelayConfig::load("config.yml")?;
//!     let mut relay = Relay::from_config(&config)?;
//!     let shutdown = shutdown_signal()?;
//!
//!     if !relay.check_connectivity().await.is_ok() {
//!         std::process::exit(1);
//!     }
//!
//!     relay.run_until(shutdown).await;
//!     Ok(())
//! }
//! ```

mod daemon;
pub mod labels;
pub mod metrics;
mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use daemon::{shutdown_signal, ConnectivityReport, Relay, RelayStats};
pub use labels::{map_labels, SeverityTable};
pub use sync::{CaseReport, CycleReport, SyncEngine, SyncOutcome, SyncRules};
