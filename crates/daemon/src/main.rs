//! ushare Daemon
//!
//! Serves password-gated, use-limited file and directory downloads.

use std::path::PathBuf;

use clap::Parser;
use daemon::config::Config;
use tracing_subscriber::EnvFilter;

/// ushare daemon - password-gated file and directory sharing over HTTP.
#[derive(Parser, Debug)]
#[command(name = "ushare-daemon")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file (YAML, or TOML with a .toml extension)
    #[arg(value_name = "FILE")]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            init_tracing("info");
            tracing::error!("{:#}", e);
            std::process::exit(1);
        }
    };

    // Apply environment variable overrides
    config.apply_env_overrides();

    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.log_level.to_lowercase()
    };
    init_tracing(&level);

    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration {:?}: {}", cli.config, e);
        std::process::exit(1);
    }

    tracing::info!("ushare daemon starting with config {:?}", cli.config);

    daemon::http::serve(&config, wait_for_shutdown_signal()).await?;

    tracing::info!("ushare daemon stopped");
    Ok(())
}

/// Initialize tracing, letting `RUST_LOG` take precedence over `level`.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        _ => {
            tracing::warn!("Failed to register signal handlers; falling back to Ctrl-C");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Received Ctrl-C");
}
