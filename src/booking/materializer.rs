//! Turns a completed booking session into a Meeting record.
//!
//! The booking session is the authoritative record. Materialization is a
//! best-effort second write: a failed or timed-out Meeting Store call is
//! reported as `Materialization::Failed` and never propagates as an error.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::meeting_store::MeetingStore;
use crate::domain::{BookingSession, Meeting, MeetingData, MeetingDraft, MeetingStatus};
use crate::telemetry;

pub const DEFAULT_ATTENDEE: &str = "Unknown";

/// Outcome of the second phase of a completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Materialization {
    Created { meeting: Meeting },
    Failed { reason: String },
}

impl Materialization {
    pub fn meeting(&self) -> Option<&Meeting> {
        match self {
            Materialization::Created { meeting } => Some(meeting),
            Materialization::Failed { .. } => None,
        }
    }
}

#[derive(Clone)]
pub struct MeetingMaterializer {
    store: Arc<dyn MeetingStore>,
    /// Channel recorded as the meeting's source.
    source: String,
    /// Placeholder owner when nobody else is attributed.
    owner: String,
    timeout: Duration,
}

impl MeetingMaterializer {
    pub fn new(
        store: Arc<dyn MeetingStore>,
        source: impl Into<String>,
        owner: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            source: source.into(),
            owner: owner.into(),
            timeout,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Meeting payload built from the session's provenance and the calendar's
    /// meeting details. UTM fields are copied verbatim.
    pub fn draft(&self, session: &BookingSession, data: &MeetingData) -> MeetingDraft {
        let p = &session.provenance;
        let attendee = data
            .attendee
            .clone()
            .or_else(|| p.prospect_name.clone())
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ATTENDEE.to_string());

        MeetingDraft {
            title: data.title.clone(),
            date: data.date.clone(),
            time: data.time.clone(),
            attendee,
            status: MeetingStatus::Scheduled,
            source: self.source.clone(),
            owner: self.owner.clone(),
            utm_source: p.utm_source.clone(),
            utm_medium: p.utm_medium.clone(),
            utm_campaign: p.utm_campaign.clone(),
            utm_content: p.utm_content.clone(),
            booking_session_id: Some(session.session_id.clone()),
            external_id: data.id.clone(),
        }
    }

    pub async fn materialize(&self, session: &BookingSession, data: &MeetingData) -> Materialization {
        let draft = self.draft(session, data);

        let reason = match tokio::time::timeout(self.timeout, self.store.create(draft)).await {
            Ok(Ok(meeting)) => {
                metrics::counter!(telemetry::MEETINGS_MATERIALIZED).increment(1);
                tracing::info!(
                    target: "booking",
                    session_id = %session.session_id,
                    meeting_id = %meeting.id,
                    "meeting materialized"
                );
                return Materialization::Created { meeting };
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("meeting store timed out after {} ms", self.timeout.as_millis()),
        };

        metrics::counter!(telemetry::MATERIALIZATION_FAILURES).increment(1);
        tracing::warn!(
            target: "booking",
            session_id = %session.session_id,
            %reason,
            "meeting materialization failed; booking session stays completed"
        );
        Materialization::Failed { reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::meeting_store::LocalMeetingStore;
    use crate::domain::{NewBookingSession, Provenance};
    use crate::store::in_memory;
    use chrono::Utc;

    fn session(prospect: Option<&str>) -> BookingSession {
        NewBookingSession {
            session_id: Some("s1".into()),
            provenance: Provenance {
                utm_source: Some("newsletter".into()),
                utm_campaign: Some("q1-raise".into()),
                prospect_name: prospect.map(str::to_string),
                ..Default::default()
            },
            ..Default::default()
        }
        .into_session(Utc::now())
        .unwrap()
    }

    fn data() -> MeetingData {
        MeetingData {
            id: Some("m1".into()),
            title: "Discovery Call".into(),
            date: "2025-01-01".into(),
            time: "10:00 AM".into(),
            attendee: None,
        }
    }

    fn materializer() -> MeetingMaterializer {
        MeetingMaterializer::new(
            Arc::new(LocalMeetingStore::new(in_memory())),
            "calendly",
            "system",
            Duration::from_secs(1),
        )
    }

    #[test]
    fn draft_propagates_provenance() {
        let d = materializer().draft(&session(Some("Jane Doe")), &data());
        assert_eq!(d.attendee, "Jane Doe");
        assert_eq!(d.source, "calendly");
        assert_eq!(d.owner, "system");
        assert_eq!(d.utm_source.as_deref(), Some("newsletter"));
        assert_eq!(d.utm_campaign.as_deref(), Some("q1-raise"));
        assert_eq!(d.utm_medium, None);
        assert_eq!(d.booking_session_id.as_deref(), Some("s1"));
        assert_eq!(d.external_id.as_deref(), Some("m1"));
    }

    #[test]
    fn attendee_falls_back_to_placeholder() {
        let d = materializer().draft(&session(None), &data());
        assert_eq!(d.attendee, DEFAULT_ATTENDEE);

        let mut explicit = data();
        explicit.attendee = Some("Bob".into());
        let d = materializer().draft(&session(Some("Jane")), &explicit);
        assert_eq!(d.attendee, "Bob");
    }

    #[tokio::test]
    async fn materialize_creates_meeting() {
        let out = materializer().materialize(&session(None), &data()).await;
        let m = out.meeting().expect("meeting created");
        assert_eq!(m.draft.title, "Discovery Call");
        assert_eq!(m.draft.source, "calendly");
    }
}
