use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::new_id;
use crate::error::{Result, RouterError};
use crate::store::Record;

/// Only `Raising` clients are eligible for matching; the other two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    #[default]
    Raising,
    Funded,
    Closed,
}

impl ClientStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ClientStatus::Raising)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub sector: String,
    pub stage: String,
    pub geography: String,
    pub funding_needed: u64,
    pub status: ClientStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Client {
    const KIND: &'static str = "client";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Client {
    /// raising -> funded | closed. Anything else is a conflict.
    pub fn transition(&mut self, to: ClientStatus, now: DateTime<Utc>) -> Result<()> {
        if self.status == to {
            return Ok(());
        }
        if self.status.is_terminal() || to == ClientStatus::Raising {
            return Err(RouterError::conflict(format!(
                "client '{}' cannot move from {:?} to {:?}",
                self.id, self.status, to
            )));
        }
        self.status = to;
        self.updated_at = now;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClient {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub sector: String,
    pub stage: String,
    pub geography: String,
    pub funding_needed: u64,
    #[serde(default)]
    pub status: ClientStatus,
}

impl NewClient {
    pub fn into_client(self, now: DateTime<Utc>) -> Result<Client> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(RouterError::bad_request("client name is required"));
        }
        Ok(Client {
            id: self
                .id
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(new_id),
            name,
            company: self.company,
            email: self.email,
            sector: self.sector.trim().to_string(),
            stage: self.stage.trim().to_string(),
            geography: self.geography.trim().to_string(),
            funding_needed: self.funding_needed,
            status: self.status,
            created_at: now,
            updated_at: now,
        })
    }
}
