// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod auth;
pub mod booking;
pub mod config;
pub mod domain;
pub mod error;
pub mod introductions;
pub mod matching;
pub mod seed;
pub mod store;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::AppConfig;
pub use crate::error::RouterError;

use anyhow::Context;
use axum::Router;
use tokio::task::JoinHandle;
use tracing::info;

/// Build the shared state from config and load the seed file if one is set.
pub async fn build_state(cfg: &AppConfig) -> anyhow::Result<AppState> {
    let state = AppState::from_config(cfg)?;
    if let Some(path) = &cfg.seed_path {
        seed::SeedFile::load_from(path)?
            .apply(&state.investors, &state.clients)
            .await
            .context("applying seed")?;
    }
    info!(
        target: "lead_router",
        meeting_store = ?cfg.meeting_store.mode,
        calendar_source = %cfg.calendar.source,
        pending_ttl_secs = cfg.booking.pending_ttl_secs,
        "state ready"
    );
    Ok(state)
}

/// Start the pending-session expiry sweeper unless expiry is disabled.
pub fn spawn_background(state: &AppState, cfg: &AppConfig) -> Option<JoinHandle<()>> {
    let policy = state.expiry?;
    Some(booking::spawn_expiry_sweeper(
        state.bookings.clone(),
        policy,
        std::time::Duration::from_secs(cfg.booking.sweep_interval_secs),
    ))
}

/// Full service router: installs the Prometheus recorder first so the expiry
/// sweeper and every handler report into it, then builds state, starts the
/// sweeper and merges `/metrics`. Installs a global recorder; call once per process.
pub async fn app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let metrics = telemetry::Metrics::init(cfg.booking.pending_ttl_secs)?;
    let state = build_state(cfg).await?;

    // Age out stale pending booking sessions in the background.
    if spawn_background(&state, cfg).is_none() {
        info!(target: "booking", "booking session expiry disabled");
    }

    Ok(router(state).merge(metrics.router()))
}
