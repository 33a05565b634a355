//! Booking session lifecycle: create, inspect, complete (and materialize a
//! Meeting), expire.
//!
//! Completion is two separate writes with no atomicity between them:
//! 1. the session moves `pending -> completed` (compare-and-set on status),
//! 2. the materializer submits a Meeting to the Meeting Store.
//!
//! Step 2 only runs for the caller whose step 1 won, so a session produces at
//! most one Meeting. A failure in step 2 leaves step 1 in place.

pub mod expiry;
pub mod materializer;
pub mod meeting_store;
pub mod webhook;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{BookingSession, Meeting, MeetingData, NewBookingSession};
use crate::error::{Result, RouterError};
use crate::store::SharedCollection;
use crate::telemetry::{self, anon_hash};

pub use expiry::{spawn_expiry_sweeper, ExpiryPolicy};
pub use materializer::{Materialization, MeetingMaterializer};
pub use meeting_store::{HttpMeetingStore, LocalMeetingStore, MeetingStore};

/// Result of `BookingService::complete`. `meeting` is absent when the
/// Meeting Store failed; `materialization_error` then says why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionOutcome {
    pub booking_session: BookingSession,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting: Option<Meeting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub materialization_error: Option<String>,
}

impl CompletionOutcome {
    fn new(booking_session: BookingSession, m: Materialization) -> Self {
        let (meeting, materialization_error) = match m {
            Materialization::Created { meeting } => (Some(meeting), None),
            Materialization::Failed { reason } => (None, Some(reason)),
        };
        Self {
            booking_session,
            meeting,
            materialization_error,
        }
    }

    pub fn is_partial(&self) -> bool {
        self.meeting.is_none()
    }
}

#[derive(Clone)]
pub struct BookingService {
    sessions: SharedCollection<BookingSession>,
    materializer: MeetingMaterializer,
}

impl BookingService {
    pub fn new(sessions: SharedCollection<BookingSession>, materializer: MeetingMaterializer) -> Self {
        Self {
            sessions,
            materializer,
        }
    }

    pub fn materializer(&self) -> &MeetingMaterializer {
        &self.materializer
    }

    /// Open a pending session. Duplicate `session_id` is a conflict.
    pub async fn create(&self, fields: NewBookingSession) -> Result<BookingSession> {
        let session = fields.into_session(Utc::now())?;
        let session = self.sessions.insert(session).await?;

        telemetry::ensure_described();
        metrics::counter!(telemetry::BOOKINGS_CREATED).increment(1);
        tracing::info!(
            target: "booking",
            session_id = %session.session_id,
            utm_source = session.provenance.utm_source.as_deref().unwrap_or("-"),
            prospect = %session
                .provenance
                .prospect_email
                .as_deref()
                .map(anon_hash)
                .unwrap_or_default(),
            "booking session opened"
        );
        Ok(session)
    }

    pub async fn get(&self, session_id: &str) -> Result<BookingSession> {
        self.sessions
            .get(session_id)
            .await?
            .ok_or_else(|| RouterError::not_found("booking session", session_id))
    }

    pub async fn list(&self) -> Result<Vec<BookingSession>> {
        self.sessions.list().await
    }

    /// Complete a pending session, then materialize its Meeting.
    ///
    /// A session that is already completed or expired is rejected with
    /// `Conflict` and nothing is materialized.
    pub async fn complete(&self, session_id: &str, data: MeetingData) -> Result<CompletionOutcome> {
        data.validate()?;

        let now = Utc::now();
        let stamp = data.clone();
        let session = self
            .sessions
            .update(
                session_id,
                Box::new(move |s: &mut BookingSession| s.complete(&stamp, now)),
            )
            .await?;

        telemetry::ensure_described();
        metrics::counter!(telemetry::BOOKINGS_COMPLETED).increment(1);
        tracing::info!(target: "booking", session_id, "booking session completed");

        let outcome = self.materializer.materialize(&session, &data).await;
        Ok(CompletionOutcome::new(session, outcome))
    }

    /// pending -> expired.
    pub async fn expire(&self, session_id: &str) -> Result<BookingSession> {
        self.expire_at(session_id, Utc::now()).await
    }

    /// pending -> expired, stamped with `now` as `updated_at`.
    async fn expire_at(&self, session_id: &str, now: DateTime<Utc>) -> Result<BookingSession> {
        let s = self
            .sessions
            .update(
                session_id,
                Box::new(move |s: &mut BookingSession| s.expire(now)),
            )
            .await?;

        telemetry::ensure_described();
        metrics::counter!(telemetry::BOOKINGS_EXPIRED).increment(1);
        tracing::debug!(target: "booking", session_id, "booking session expired");
        Ok(s)
    }

    /// Expire every pending session that `policy` deems stale at `now`.
    /// Sessions that leave `pending` concurrently are skipped.
    pub async fn expire_stale(&self, policy: &ExpiryPolicy, now: DateTime<Utc>) -> Result<Vec<String>> {
        let stale: Vec<String> = self
            .sessions
            .list()
            .await?
            .into_iter()
            .filter(|s| policy.is_stale(s, now))
            .map(|s| s.session_id)
            .collect();

        let mut expired = Vec::with_capacity(stale.len());
        for id in stale {
            match self.expire_at(&id, now).await {
                Ok(_) => expired.push(id),
                Err(RouterError::Conflict(_)) => {
                    tracing::debug!(target: "booking", session_id = %id, "left pending before expiry");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(expired)
    }
}
