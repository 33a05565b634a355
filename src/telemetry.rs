//! Logging and metrics plumbing: dev tracing gate, Prometheus exporter,
//! metric names, and the anonymised id helper used in log lines.

use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const MATCH_QUERIES: &str = "matches_queries_total";
pub const INTRODUCTIONS_CREATED: &str = "introductions_created_total";
pub const BOOKINGS_CREATED: &str = "booking_sessions_created_total";
pub const BOOKINGS_COMPLETED: &str = "booking_sessions_completed_total";
pub const BOOKINGS_EXPIRED: &str = "booking_sessions_expired_total";
pub const MEETINGS_MATERIALIZED: &str = "meetings_materialized_total";
pub const MATERIALIZATION_FAILURES: &str = "meeting_materialization_failures_total";

pub const ENV_DEV_LOG: &str = "LEAD_ROUTER_DEV_LOG";

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(MATCH_QUERIES, "Match queries answered.");
        describe_counter!(INTRODUCTIONS_CREATED, "Introductions recorded.");
        describe_counter!(BOOKINGS_CREATED, "Booking sessions opened.");
        describe_counter!(BOOKINGS_COMPLETED, "Booking sessions completed.");
        describe_counter!(BOOKINGS_EXPIRED, "Pending booking sessions aged out.");
        describe_counter!(
            MEETINGS_MATERIALIZED,
            "Meetings created from completed booking sessions."
        );
        describe_counter!(
            MATERIALIZATION_FAILURES,
            "Meeting store failures or timeouts during materialization."
        );
    });
}

/// Compact tracing in development only.
/// Activation requires BOTH a dev environment (debug build OR SHUTTLE_ENV in
/// {local, development, dev}) and `LEAD_ROUTER_DEV_LOG=1`.
pub fn enable_dev_tracing() {
    let dev_flag = std::env::var(ENV_DEV_LOG).ok().is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("lead_router=debug,booking=info,matching=info,warn"));

    // The runtime may already have installed a subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Call once per process.
    pub fn init(pending_ttl_secs: u64) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        ensure_described();
        gauge!("booking_session_pending_ttl_secs").set(pending_ttl_secs as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// Short, stable digest for identifiers that must not appear raw in logs
/// (prospect emails).
pub fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    use std::fmt::Write as _;

    let digest = Sha256::digest(text.trim().to_ascii_lowercase().as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
