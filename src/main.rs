//! casebridge - Kibana Security case to Gitea issue relay
//!
//! Main entry point for the relay daemon.

use casebridge::config::RelayConfig;
use casebridge::relay::{shutdown_signal, Relay};
use clap::Parser;
use std::path::PathBuf;
use std::process;

/// Exit status for a failed connectivity check
const EXIT_UNREACHABLE: i32 = 1;

/// Exit status for configuration and other startup errors
const EXIT_STARTUP: i32 = 2;

/// Forward escalated Kibana Security cases to Gitea issues
#[derive(Parser, Debug)]
#[command(name = "casebridge")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: ./config.yml, then ~/.config/casebridge/config.yml)
    #[arg(short, long, env = "CASEBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Run a single sync cycle and exit
    #[arg(long, conflicts_with = "check")]
    once: bool,

    /// Only check connectivity to Kibana and Gitea, then exit
    #[arg(long)]
    check: bool,
}

fn main() {
    let cli = Cli::parse();
    process::exit(run(cli));
}

fn run(cli: Cli) -> i32 {
    let path = cli.config.unwrap_or_else(RelayConfig::default_path);

    let config = match RelayConfig::load(&path) {
        Ok(config) => config,
        Err(e) => {
            if let Err(log_err) = casebridge::logging::init_default() {
                eprintln!("Failed to initialize logging: {}", log_err);
            }
            tracing::error!(path = %path.display(), error = %e, "Failed to load configuration");
            return EXIT_STARTUP;
        }
    };

    if let Err(e) = casebridge::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start async runtime");
            return EXIT_STARTUP;
        }
    };

    runtime.block_on(serve(config, cli.once, cli.check))
}

async fn serve(config: RelayConfig, once: bool, check: bool) -> i32 {
    let mut relay = match Relay::from_config(&config) {
        Ok(relay) => relay,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build API clients");
            return EXIT_STARTUP;
        }
    };

    // Handlers must exist before the first network call
    let shutdown = match shutdown_signal() {
        Ok(shutdown) => shutdown,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install signal handlers");
            return EXIT_STARTUP;
        }
    };
    tokio::pin!(shutdown);

    let connectivity = tokio::select! {
        report = relay.check_connectivity() => report,
        _ = &mut shutdown => {
            tracing::info!("Interrupted during connectivity check");
            return 0;
        }
    };
    if !connectivity.is_ok() {
        tracing::error!(
            kibana = %connectivity.kibana,
            gitea = %connectivity.gitea,
            "Connectivity check failed"
        );
        return EXIT_UNREACHABLE;
    }
    tracing::info!(
        kibana = %config.kibana.url,
        gitea = %config.gitea.url,
        repository = %format!("{}/{}", config.gitea.organization, config.gitea.repository),
        "Connected to Kibana and Gitea"
    );

    if check {
        return 0;
    }

    if once {
        // A signal received during the cycle is honoured once it completes
        let report = relay.run_once().await;
        tracing::info!(
            cases = report.cases.len(),
            created = report.issues_created(),
            "Single cycle complete"
        );
        return 0;
    }

    relay.run_until(&mut shutdown).await;
    0
}
