//! Scribe Daemon
//!
//! # Usage
//!
//! ```bash
//! # Start with the default config file ($XDG_CONFIG_HOME/scribe/scribe.toml)
//! scribe-daemon
//!
//! # Custom config and port
//! scribe-daemon --config ./scribe.toml --port 8080
//!
//! # With verbose logging
//! RUST_LOG=debug scribe-daemon
//! ```
//!
//! # Environment Variables
//!
//! - `SCRIBE_CONFIG`: Config file path
//! - `SCRIBE_HOST` / `SCRIBE_PORT`: Bind address
//! - `SCRIBE_PROVIDER_URL` / `SCRIBE_MODEL`: Standard provider
//! - `SCRIBE_MATURE_PROVIDER_URL` / `SCRIBE_MATURE_MODEL`: Mature provider
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)
//!
//! A `.env` file in the working directory is loaded first.
//!
//! # Signals
//!
//! - SIGTERM/SIGINT: Graceful shutdown

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use scribe_core::config::{default_config_path, load_config_from_path, ConfigOverrides};

/// HTTP backend that streams LLM creative-writing output
#[derive(Debug, Parser)]
#[command(name = "scribe-daemon", version, about)]
struct Args {
    /// Config file path
    #[arg(short, long, env = "SCRIBE_CONFIG")]
    config: Option<PathBuf>,

    /// Bind host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Standard provider model (overrides config)
    #[arg(short, long)]
    model: Option<String>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(host) = &self.host {
            overrides = overrides.with_host(host.clone());
        }
        if let Some(port) = self.port {
            overrides = overrides.with_port(port);
        }
        if let Some(model) = &self.model {
            overrides = overrides.with_model(model.clone());
        }
        overrides
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is fine
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("scribe_daemon=info".parse()?)
                .add_directive("scribe_core=info".parse()?),
        )
        .with_target(true)
        .init();

    if let Ok(path) = dotenv {
        info!(path = ?path, "Loaded .env");
    }

    let args = Args::parse();
    let path = args.config.clone().or_else(default_config_path);

    let mut config = load_config_from_path(path).map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;
    args.overrides().apply(&mut config);

    info!(
        source = ?config.source(),
        provider = %config.provider.base_url,
        model = %config.provider.model,
        mature_provider = config.mature_provider.is_some(),
        "Starting Scribe Daemon"
    );

    scribe_daemon::serve(&config).await
}
