//! Relay poll loop
//!
//! Checks connectivity to both systems once at startup, then runs a sync
//! cycle, sleeps for the poll interval, and repeats until SIGTERM/SIGINT.
//! The interval is measured from the end of a cycle, so a slow cycle delays
//! the next one rather than overlapping it. A signal that arrives mid-cycle
//! takes effect once that cycle has finished.

use super::metrics;
use super::sync::{CycleReport, SyncEngine, SyncOutcome, SyncRules};
use crate::config::RelayConfig;
use crate::integrations::{CaseSource, GiteaAdapter, IssueSink, KibanaAdapter, ProbeOutcome};
use crate::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of the startup connectivity probes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectivityReport {
    pub kibana: ProbeOutcome,
    pub gitea: ProbeOutcome,
}

impl ConnectivityReport {
    pub fn is_ok(&self) -> bool {
        self.kibana.is_ok() && self.gitea.is_ok()
    }
}

/// Cumulative counters across cycles
#[derive(Debug, Clone, Default)]
pub struct RelayStats {
    /// Cycles run since start
    pub cycles_completed: u64,

    /// Cases per outcome since start
    pub outcomes: HashMap<SyncOutcome, u64>,

    /// When the most recent cycle finished
    pub last_cycle_finished: Option<DateTime<Utc>>,
}

impl RelayStats {
    pub fn count(&self, outcome: SyncOutcome) -> u64 {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    fn record(&mut self, report: &CycleReport) {
        self.cycles_completed += 1;
        self.last_cycle_finished = Some(report.finished_at);
        for case in &report.cases {
            *self.outcomes.entry(case.outcome).or_insert(0) += 1;
        }
    }
}

/// Relay daemon
///
/// Owns the sync engine and drives it on a fixed pause between cycles.
pub struct Relay<C, I> {
    engine: SyncEngine<C, I>,
    poll_interval: Duration,
    metrics_textfile: Option<PathBuf>,
    stats: RelayStats,
}

impl Relay<KibanaAdapter, GiteaAdapter> {
    /// Build the adapters and engine described by `config`
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        let timeout = config.request_timeout();
        let kibana = KibanaAdapter::new(&config.kibana, timeout)?;
        let gitea = GiteaAdapter::new(&config.gitea, timeout)?;
        let engine = SyncEngine::new(
            Arc::new(kibana),
            Arc::new(gitea),
            SyncRules::from_config(config),
        );

        let mut relay = Relay::new(engine, config.poll_interval());
        if let Some(ref path) = config.metrics.textfile_path {
            relay = relay.with_metrics_textfile(path.clone());
        }
        Ok(relay)
    }
}

impl<C: CaseSource, I: IssueSink> Relay<C, I> {
    pub fn new(engine: SyncEngine<C, I>, poll_interval: Duration) -> Self {
        Self {
            engine,
            poll_interval,
            metrics_textfile: None,
            stats: RelayStats::default(),
        }
    }

    /// Export metrics to this file after every cycle
    pub fn with_metrics_textfile(mut self, path: impl Into<PathBuf>) -> Self {
        self.metrics_textfile = Some(path.into());
        self
    }

    pub fn engine(&self) -> &SyncEngine<C, I> {
        &self.engine
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn stats(&self) -> &RelayStats {
        &self.stats
    }

    /// Probe both systems
    pub async fn check_connectivity(&self) -> ConnectivityReport {
        let kibana = self.engine.case_source().probe().await;
        let gitea = self.engine.issue_sink().probe().await;
        let report = ConnectivityReport { kibana, gitea };
        metrics::set_health_status(report.is_ok());
        report
    }

    /// Run exactly one sync cycle
    pub async fn run_once(&mut self) -> CycleReport {
        let report = self.engine.run_cycle().await;

        self.stats.record(&report);
        metrics::record_cycle(report.duration_secs(), report.finished_at.timestamp());
        self.export_metrics();

        report
    }

    /// Poll until `shutdown` resolves.
    ///
    /// `shutdown` is only observed between cycles.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        metrics::set_health_status(true);
        // Export every outcome series from the first cycle on, zeros included
        for outcome in SyncOutcome::ALL {
            metrics::CASES.with_label_values(&[outcome.as_str()]);
        }
        tracing::info!(
            interval_secs = self.poll_interval.as_secs(),
            search_tag = %self.engine.rules().search_tag,
            "Relay started"
        );

        loop {
            self.run_once().await;

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, stopping poll loop");
                    break;
                }
            }
        }

        metrics::set_health_status(false);
        self.export_metrics();
        tracing::info!(
            cycles = self.stats.cycles_completed,
            created = self.stats.count(SyncOutcome::Created)
                + self.stats.count(SyncOutcome::WritebackRetriedOk),
            "Relay shutdown complete"
        );
    }

    fn export_metrics(&self) {
        if let Some(ref path) = self.metrics_textfile {
            if let Err(e) = metrics::write_textfile(path) {
                tracing::warn!(path = %path.display(), error = %e, "Failed to write metrics file");
            }
        }
    }
}

/// Resolves on the first SIGTERM or SIGINT.
///
/// The handlers are installed when this is called, so signals arriving before
/// the future is first polled are not lost and do not terminate the process.
#[cfg(unix)]
pub fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).map_err(|e| {
        crate::RelayError::Other(format!("Failed to set up SIGTERM handler: {}", e))
    })?;
    let mut sigint = signal(SignalKind::interrupt()).map_err(|e| {
        crate::RelayError::Other(format!("Failed to set up SIGINT handler: {}", e))
    })?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => tracing::info!("Received SIGTERM, initiating graceful shutdown"),
            _ = sigint.recv() => tracing::info!("Received SIGINT, initiating graceful shutdown"),
        }
    })
}

/// Resolves on Ctrl-C
#[cfg(not(unix))]
pub fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    Ok(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl-C, initiating graceful shutdown");
        }
    })
}
