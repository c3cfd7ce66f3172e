//! `keyroll-svc` — sealing service binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (JSON logs, optional OTLP export).
//! 3. Build the [`KeyProfileRegistry`](keyroll::KeyProfileRegistry) from the
//!    configured key profiles.
//! 4. Build the Axum router and start the HTTP server.

mod config;
mod server;
mod telemetry;

use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use config::Config;
use server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.listen_port,
        "keyroll-svc starting"
    );

    // -----------------------------------------------------------------------
    // 3. Key profiles
    // -----------------------------------------------------------------------
    let registry = cfg.build_registry()?;
    let rolled = registry
        .profiles()
        .iter()
        .filter(|p| p.should_be_rolled())
        .count();
    let default_profile = registry.default_name();
    info!(
        profiles = registry.len(),
        rolled,
        default_profile = default_profile.as_deref().unwrap_or("-"),
        "key profiles loaded"
    );
    if rolled == registry.len() {
        warn!("every key profile is marked to be rolled; sealed values cannot settle");
    }

    // -----------------------------------------------------------------------
    // 4. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(registry);
    let router = server::router::build(state, Duration::from_secs(cfg.request_timeout_secs));

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
