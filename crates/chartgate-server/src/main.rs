//! Chartgate - chart repository registry and deployment service
//!
//! Usage:
//!   chartgate                          # Serve with default configuration
//!   chartgate --config chartgate.toml  # Serve with a TOML configuration file
//!   chartgate --listen 0.0.0.0:8080    # Override the listen address

use std::path::PathBuf;

use anyhow::Result;
use chartgate_core::config::ServerConfig;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Fallback for `--config`.
const ENV_CONFIG: &str = "CHARTGATE_CONFIG";

#[derive(Parser)]
#[command(name = "chartgate")]
#[command(about = "Chart repository registry and deployment service", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML); defaults to $CHARTGATE_CONFIG
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:9090
    #[arg(long, short)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .or_else(|| std::env::var_os(ENV_CONFIG).map(PathBuf::from));
    let mut config = ServerConfig::load(config_path.as_deref())?;
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }

    init_tracing(&config);
    if let Some(path) = &config_path {
        tracing::debug!(path = %path.display(), "configuration loaded");
    }

    chartgate_server::serve(config).await
}

/// `RUST_LOG`, then `LOG_LEVEL`, then the configured filter.
fn init_tracing(config: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .ok()
        .or_else(|| EnvFilter::try_from_env("LOG_LEVEL").ok())
        .or_else(|| {
            config
                .log_filter
                .as_deref()
                .and_then(|directives| EnvFilter::try_new(directives).ok())
        })
        .unwrap_or_else(|| "chartgate=debug,info".into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
