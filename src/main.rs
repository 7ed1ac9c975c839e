//! replay-proxy
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ replay orchestrator ──cache hit──────────────┐
//!                                          │                                      │
//!                                          ▼ miss / bypass                         │
//!                                      authority (fly-replay?) ──no──▶ response    │
//!                                          │ yes                                   │
//!                                          ▼                                      ▼
//!                                      routing cache (store / invalidate) ──▶ forward to app
//!
//!     Cross-cutting: config + hot reload, cache sweeper, admin API, tracing, metrics
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use replay_proxy::config::loader::load_config;
use replay_proxy::config::watcher::ConfigWatcher;
use replay_proxy::config::ProxyConfig;
use replay_proxy::lifecycle::signals::spawn_signal_handler;
use replay_proxy::observability::{logging, metrics};
use replay_proxy::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "replay-proxy", version, about = "fly-replay routing proxy")]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long, env = "REPLAY_PROXY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!("replay-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        authority = %config.authority.address,
        apps = config.replay.apps.len(),
        enable_cache = config.replay.enable_cache,
        debug = config.replay.debug,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    // Keep the watcher alive for the lifetime of the server.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            match watcher.run() {
                Ok(handle) => (Some(handle), updates),
                Err(e) => {
                    tracing::warn!(error = %e, "Config watcher unavailable, hot reload disabled");
                    (None, updates)
                }
            }
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let server = HttpServer::new(config);
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
