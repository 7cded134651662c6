//! Application setup and initialization

pub mod routes;
pub mod server;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use vitrine_core::Config;

use crate::state::AppState;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry().context("Failed to initialize telemetry")?;

    tracing::info!(
        environment = %config.environment,
        media_root = %config.media_root.display(),
        staging_dir = %config.staging_dir.display(),
        "Configuration loaded and validated successfully"
    );

    let state = AppState::new(config.clone());
    spawn_session_sweeper(state.clone());
    let router = routes::setup_routes(&config, state.clone()).await?;

    Ok((state, router))
}

/// Periodically evict upload sessions that stopped receiving chunks.
pub fn spawn_session_sweeper(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    let max_idle = state.config.session_idle_timeout;
    let period = (max_idle / 4).max(Duration::from_secs(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let evicted = state.assembler.evict_idle(max_idle).await;
            if evicted > 0 {
                tracing::info!(
                    evicted = evicted,
                    active_sessions = state.assembler.active_sessions(),
                    "Idle upload sessions evicted"
                );
            }
        }
    })
}
