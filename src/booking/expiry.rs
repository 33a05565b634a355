//! TTL policy for pending booking sessions and the background sweeper.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use super::BookingService;
use crate::domain::{BookingSession, BookingStatus};

/// A pending session older than `pending_ttl` is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    pending_ttl: chrono::Duration,
}

impl ExpiryPolicy {
    /// `None` when `ttl_secs` is 0 (expiry disabled).
    pub fn from_secs(ttl_secs: u64) -> Option<Self> {
        if ttl_secs == 0 {
            return None;
        }
        let secs = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        Some(Self {
            pending_ttl: chrono::Duration::try_seconds(secs).unwrap_or(chrono::Duration::MAX),
        })
    }

    pub fn ttl_secs(&self) -> i64 {
        self.pending_ttl.num_seconds()
    }

    pub fn is_stale(&self, session: &BookingSession, now: DateTime<Utc>) -> bool {
        session.status == BookingStatus::Pending
            && now.signed_duration_since(session.created_at) >= self.pending_ttl
    }
}

/// Run `BookingService::expire_stale` every `interval`. Errors are logged and
/// the loop keeps going.
pub fn spawn_expiry_sweeper(
    service: BookingService,
    policy: ExpiryPolicy,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match service.expire_stale(&policy, Utc::now()).await {
                Ok(expired) if !expired.is_empty() => {
                    tracing::info!(target: "booking", expired = expired.len(), "expiry sweep");
                }
                Ok(_) => tracing::trace!(target: "booking", "expiry sweep: nothing stale"),
                Err(e) => tracing::warn!(target: "booking", error = %e, "expiry sweep failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewBookingSession;

    fn session_at(created: DateTime<Utc>) -> BookingSession {
        NewBookingSession {
            session_id: Some("s".into()),
            ..Default::default()
        }
        .into_session(created)
        .unwrap()
    }

    #[test]
    fn zero_ttl_disables_expiry() {
        assert!(ExpiryPolicy::from_secs(0).is_none());
    }

    #[test]
    fn stale_only_after_ttl_and_only_pending() {
        let policy = ExpiryPolicy::from_secs(3600).unwrap();
        let t0 = Utc::now();
        let s = session_at(t0);
        assert!(!policy.is_stale(&s, t0 + chrono::Duration::seconds(3599)));
        assert!(policy.is_stale(&s, t0 + chrono::Duration::seconds(3600)));

        let mut done = session_at(t0);
        done.status = BookingStatus::Completed;
        assert!(!policy.is_stale(&done, t0 + chrono::Duration::days(30)));
    }
}
