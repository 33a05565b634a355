//! Lead Router: Binary Entrypoint
//! Boots the Axum HTTP server: config, metrics, shared state, expiry sweeper.

use lead_router::{app, telemetry, AppConfig};
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    telemetry::enable_dev_tracing();

    let cfg = AppConfig::load_default()?;
    let router = app(&cfg).await?;

    Ok(router.into())
}
