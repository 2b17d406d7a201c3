//! # telemedx-server
//!
//! Token service for TeleMedX video consultations.
//!
//! This binary provides:
//! - **Connection details** (`POST /api/connection-details`): a fresh room,
//!   participant identity and signed access token with agent dispatch
//! - **Room tokens** (`POST /api/agent/token`) for a named room and participant
//! - **Health check** (`GET /health`)

mod api;
mod config;
mod error;
mod token;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use telemedx_shared::constants::APP_NAME;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,telemedx_server=debug")),
        )
        .init();

    info!("Starting {} token server v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    for (name, value) in [
        ("LIVEKIT_URL", &config.livekit_url),
        ("LIVEKIT_API_KEY", &config.api_key),
        ("LIVEKIT_API_SECRET", &config.api_secret),
    ] {
        if value.is_none() {
            warn!(var = name, "Not set; token endpoints will answer 500");
        }
    }

    let http_addr = config.http_addr;
    let app_state = AppState {
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 3. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
