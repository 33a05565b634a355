//! Calendar webhook: completion events pushed by the scheduling provider.
//!
//! Signature cryptography lives outside this service; the router only asks a
//! `WebhookVerifier` for a yes/no before parsing the body.

use axum::http::HeaderMap;
use serde::Deserialize;

use crate::auth::SecretDigest;
use crate::domain::MeetingData;

pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

pub trait WebhookVerifier: Send + Sync {
    fn verify(&self, headers: &HeaderMap, body: &[u8]) -> bool;
}

/// Compares a shared secret header against the configured secret.
/// With no secret configured every delivery is refused.
pub struct SharedSecretVerifier {
    secret: Option<SecretDigest>,
}

impl SharedSecretVerifier {
    pub fn new(secret: Option<&str>) -> Self {
        let secret = secret.filter(|s| !s.is_empty()).map(SecretDigest::new);
        if secret.is_none() {
            tracing::warn!(target: "booking", "no webhook secret configured; calendar webhooks will be refused");
        }
        Self { secret }
    }
}

impl WebhookVerifier for SharedSecretVerifier {
    fn verify(&self, headers: &HeaderMap, _body: &[u8]) -> bool {
        let Some(expected) = &self.secret else {
            return false;
        };
        headers
            .get(WEBHOOK_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| expected.matches(v))
    }
}

/// Body of a calendar completion event.
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarEvent {
    /// Only completion events are acted upon.
    #[serde(default = "default_event")]
    pub event: String,
    pub session_id: String,
    /// Absent on cancellations; required (and validated) for bookings.
    #[serde(default)]
    pub meeting: MeetingData,
}

fn default_event() -> String {
    EVENT_BOOKED.to_string()
}

pub const EVENT_BOOKED: &str = "invitee.created";

impl CalendarEvent {
    pub fn is_booking(&self) -> bool {
        self.event.eq_ignore_ascii_case(EVENT_BOOKED)
    }
}
