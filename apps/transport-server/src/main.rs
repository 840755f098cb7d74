//! PQ Transport Server
//!
//! HTTP front for the post-quantum transport layer: exposes the server's
//! ML-KEM public key, accepts handshakes from authenticated callers, and
//! decrypts message/document submissions before storing them.

mod auth;
mod config;
mod error;
mod records;
mod routes;
mod state;

use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("transport_server=debug".parse()?)
                .add_directive("crypto_session=debug".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    info!("Starting PQ Transport Server");

    let config = ServerConfig::from_env()?;

    // Without a working KEM there is nothing to protect payloads with
    let state = AppState::new(&config.transport)
        .context("post-quantum key generation failed, refusing to start")?;

    if let Some(ttl) = config.transport.session_ttl {
        spawn_session_sweeper(state.clone(), ttl);
    }

    let app = routes::router(state);

    info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped; all session keys discarded");
    Ok(())
}

/// Periodically evict expired session keys
fn spawn_session_sweeper(state: AppState, ttl: Duration) {
    let period = (ttl / 2).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let evicted = state.store.purge_expired();
            if evicted > 0 {
                debug!("Evicted {} expired session keys", evicted);
            }
        }
    });
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}
