//! Booking session: one external calendar scheduling attempt.
//!
//! State machine: `pending -> completed` and `pending -> expired`. Both targets
//! are terminal; every transition checks the current status first so the
//! store's atomic `update` acts as a compare-and-set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RouterError};
use crate::store::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Completed,
    Expired,
}

impl BookingStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, BookingStatus::Pending)
    }
}

/// Where the prospect came from. Propagated verbatim onto the Meeting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_medium: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_campaign: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prospect_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prospect_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    /// Caller-side timestamp as sent by the landing page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingSession {
    pub session_id: String,
    #[serde(flatten)]
    pub provenance: Provenance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_url: Option<String>,
    pub status: BookingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_time: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for BookingSession {
    const KIND: &'static str = "booking session";

    fn id(&self) -> &str {
        &self.session_id
    }
}

/// Creation payload. `session_id` is optional here only so a missing id is
/// reported as a bad request instead of a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBookingSession {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(flatten)]
    pub provenance: Provenance,
    #[serde(default)]
    pub calendar_url: Option<String>,
    #[serde(default)]
    pub status: Option<BookingStatus>,
}

impl NewBookingSession {
    pub fn into_session(self, now: DateTime<Utc>) -> Result<BookingSession> {
        let session_id = self
            .session_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| RouterError::bad_request("session_id is required"))?;

        let status = self.status.unwrap_or_default();
        if status != BookingStatus::Pending {
            return Err(RouterError::bad_request(format!(
                "a booking session must start pending, got {status:?}"
            )));
        }

        Ok(BookingSession {
            session_id,
            provenance: self.provenance,
            calendar_url: self.calendar_url,
            status,
            meeting_id: None,
            meeting_title: None,
            meeting_date: None,
            meeting_time: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Meeting details reported by the calendar on completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingData {
    /// Calendar-side event id.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    /// Overrides the session's prospect name as attendee.
    #[serde(default)]
    pub attendee: Option<String>,
}

impl MeetingData {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("title", &self.title),
            ("date", &self.date),
            ("time", &self.time),
        ] {
            if value.trim().is_empty() {
                return Err(RouterError::bad_request(format!(
                    "meeting {field} is required"
                )));
            }
        }
        Ok(())
    }
}

impl BookingSession {
    fn ensure_pending(&self, action: &str) -> Result<()> {
        if self.status.is_terminal() {
            return Err(RouterError::conflict(format!(
                "cannot {action} booking session '{}': already {:?}",
                self.session_id, self.status
            )));
        }
        Ok(())
    }

    pub fn complete(&mut self, data: &MeetingData, now: DateTime<Utc>) -> Result<()> {
        self.ensure_pending("complete")?;
        self.status = BookingStatus::Completed;
        self.meeting_id = data.id.clone();
        self.meeting_title = Some(data.title.clone());
        self.meeting_date = Some(data.date.clone());
        self.meeting_time = Some(data.time.clone());
        self.updated_at = now;
        Ok(())
    }

    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_pending("expire")?;
        self.status = BookingStatus::Expired;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> BookingSession {
        NewBookingSession {
            session_id: Some("s1".into()),
            calendar_url: Some("https://example.com/book".into()),
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

    #[test]
    fn missing_or_blank_session_id_is_bad_request() {
        for id in [None, Some("   ".to_string())] {
            let n = NewBookingSession {
                session_id: id,
                ..Default::default()
            };
            assert!(matches!(
                n.into_session(Utc::now()),
                Err(RouterError::BadRequest(_))
            ));
        }
    }

    #[test]
    fn complete_stamps_meeting_fields() {
        let mut s = session();
        s.complete(&data(), Utc::now()).unwrap();
        assert_eq!(s.status, BookingStatus::Completed);
        assert_eq!(s.meeting_id.as_deref(), Some("m1"));
        assert_eq!(s.meeting_title.as_deref(), Some("Discovery Call"));
    }

    #[test]
    fn terminal_states_reject_further_transitions() {
        let mut s = session();
        s.complete(&data(), Utc::now()).unwrap();
        assert!(matches!(
            s.complete(&data(), Utc::now()),
            Err(RouterError::Conflict(_))
        ));
        assert!(matches!(s.expire(Utc::now()), Err(RouterError::Conflict(_))));

        let mut e = session();
        e.expire(Utc::now()).unwrap();
        assert!(matches!(
            e.complete(&data(), Utc::now()),
            Err(RouterError::Conflict(_))
        ));
    }

    #[test]
    fn serializes_flat_snake_case() {
        let v = serde_json::to_value(session()).unwrap();
        assert_eq!(v["session_id"], "s1");
        assert_eq!(v["status"], "pending");
        assert!(v.get("provenance").is_none());
    }
}
