use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::new_id;
use crate::error::{Result, RouterError};
use crate::store::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntroductionStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
}

/// Append-only record of a proposed investor/client pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Introduction {
    pub id: String,
    pub investor_id: String,
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: IntroductionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Introduction {
    const KIND: &'static str = "introduction";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Introduction {
    pub fn new(
        investor_id: String,
        client_id: String,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_id(),
            investor_id,
            client_id,
            notes: notes.filter(|n| !n.trim().is_empty()),
            status: IntroductionStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Only a pending introduction may be accepted or declined.
    pub fn set_status(&mut self, to: IntroductionStatus, now: DateTime<Utc>) -> Result<()> {
        if self.status == to {
            return Ok(());
        }
        if self.status != IntroductionStatus::Pending || to == IntroductionStatus::Pending {
            return Err(RouterError::conflict(format!(
                "introduction '{}' cannot move from {:?} to {:?}",
                self.id, self.status, to
            )));
        }
        self.status = to;
        self.updated_at = now;
        Ok(())
    }
}
