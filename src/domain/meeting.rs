use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::new_id;
use crate::error::{Result, RouterError};
use crate::store::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeetingStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: String,
    #[serde(flatten)]
    pub draft: MeetingDraft,
    pub created_at: DateTime<Utc>,
}

impl Record for Meeting {
    const KIND: &'static str = "meeting";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Meeting payload before the store assigns an identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingDraft {
    pub title: String,
    pub date: String,
    pub time: String,
    /// Display string, e.g. the prospect's name.
    #[serde(default)]
    pub attendee: String,
    #[serde(default)]
    pub status: MeetingStatus,
    /// Channel the meeting came from ("calendly", "manual", ...).
    #[serde(default = "default_source")]
    pub source: String,
    /// User the meeting is attributed to.
    #[serde(default)]
    pub owner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_medium: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_campaign: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_session_id: Option<String>,
    /// Calendar-side event id when materialized from a booking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

fn default_source() -> String {
    "manual".to_string()
}

impl MeetingDraft {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(RouterError::bad_request("meeting title is required"));
        }
        Ok(())
    }

    pub fn into_meeting(self, now: DateTime<Utc>) -> Meeting {
        Meeting {
            id: new_id(),
            draft: self,
            created_at: now,
        }
    }
}
