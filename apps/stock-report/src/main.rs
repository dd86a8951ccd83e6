//! # Tally Stock Report
//!
//! Daily reorder-point reconciliation.
//!
//! ## Usage
//! ```bash
//! # Run on schedule (default 21:00 at UTC+05:30)
//! tally-report --config /etc/tally/report.toml
//!
//! # Single run, then exit
//! tally-report --once
//! ```
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  load config → init tracing → open database (migrations run)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──► sleep until next run ──► run_once ──┐                            │
//! │  └────────────────────────────────────────┘   until Ctrl+C / SIGTERM   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod report;
mod schedule;

use chrono::Utc;
use std::path::PathBuf;
use tally_db::{Database, DbConfig};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::ReportConfig;
use crate::error::ReportResult;

struct Args {
    config_path: Option<PathBuf>,
    once: bool,
}

fn parse_args() -> Option<Args> {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args {
        config_path: None,
        once: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" if i + 1 < args.len() => {
                parsed.config_path = Some(PathBuf::from(&args[i + 1]));
                i += 1;
            }
            "--once" => parsed.once = true,
            "--help" | "-h" => {
                println!("Tally stock report");
                println!();
                println!("Usage: tally-report [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>  TOML config file (default: ./tally-report.toml)");
                println!("      --once           Run one reconciliation and exit");
                println!("  -h, --help           Show this help message");
                return None;
            }
            other => eprintln!("Ignoring unknown argument: {}", other),
        }
        i += 1;
    }

    Some(parsed)
}

#[tokio::main]
async fn main() -> ReportResult<()> {
    let Some(args) = parse_args() else {
        return Ok(());
    };

    let config = ReportConfig::load(args.config_path)?;

    // RUST_LOG wins over the configured level
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    match &config.source {
        Some(path) => info!(path = %path.display(), "Loaded report config from file"),
        None => info!("No config file found, using defaults and environment"),
    }

    info!(
        database = %config.database_path.display(),
        run_at = %format!("{:02}:{:02}", config.run_hour, config.run_minute),
        utc_offset_minutes = config.utc_offset_minutes,
        "Starting Tally stock report"
    );

    let db = Database::new(
        DbConfig::new(&config.database_path).max_connections(config.max_connections),
    )
    .await?;

    if args.once {
        report::run_once(&db, config.output_path.as_deref()).await?;
        db.close().await;
        return Ok(());
    }

    let offset = config.utc_offset()?;

    loop {
        let next = schedule::next_run(Utc::now(), offset, config.run_hour, config.run_minute)?;
        let wait = (next - Utc::now()).to_std().unwrap_or_default();
        info!(next_run = %next.with_timezone(&offset), "Waiting for next reconciliation");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                // A failed run is retried at the next scheduled time
                if let Err(e) = report::run_once(&db, config.output_path.as_deref()).await {
                    error!(error = %e, "Stock reconciliation failed");
                }
            }
            _ = shutdown_signal() => break,
        }
    }

    db.close().await;
    info!("Stock report stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
