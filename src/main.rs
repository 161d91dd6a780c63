//! Pitwall Server
//!
//! Run with: cargo run -- serve
//!
//! # Configuration
//!
//! Settings come from a TOML file (`--config`, or the first of
//! `$XDG_CONFIG_HOME/pitwall/config.toml`, `/etc/pitwall/config.toml`,
//! `./config.toml`), then environment overrides, then command-line flags.
//!
//! Environment variables:
//! - `PITWALL_HOST` / `PITWALL_PORT` (or `PORT`): Bind address (default: 0.0.0.0:5000)
//! - `PITWALL_BUFFER_CAPACITY`: Frames a viewer may lag before it is dropped (default: 100)
//! - `PITWALL_KEEP_ALIVE_SECS`: Idle seconds before a keep-alive (default: 30)
//! - `PITWALL_LOG_LEVEL` / `PITWALL_LOG_FORMAT`: Logging (default: info / pretty)
//! - `RUST_LOG`: Full tracing filter, overrides the log level

use anyhow::Context;
use clap::{Parser, Subcommand};
use pitwall::api::{serve, AppState};
use pitwall::config::{generate_default_config, Config, LogFormat, LoggingConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "pitwall")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Real-time telemetry broadcast hub")]
#[command(long_about = "Pitwall accepts telemetry from field devices on POST /data and streams it\nto live dashboards on GET /events (Server-Sent Events).")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the hub server
    Serve {
        /// Config file (default: search standard locations)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, host, port } => {
            let mut config = match config {
                Some(path) => Config::load_with_env(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => Config::load_default(),
            };
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;

            init_tracing(&config.logging);
            run(config).await
        }
        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Wrote default config to {}", path.display());
                }
                None => print!("{}", content),
            }
            Ok(())
        }
    }
}

/// Initialize tracing
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("pitwall={},tower_http=info", logging.level))
    });

    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init(),
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting Pitwall telemetry hub v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        buffer_capacity = config.hub.buffer_capacity,
        keep_alive_secs = config.hub.keep_alive_secs,
        "Hub configured"
    );

    let state = AppState::new(config.server, config.hub);
    serve(state).await?;

    tracing::info!("Pitwall stopped");
    Ok(())
}
