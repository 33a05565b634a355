use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{clean_set, new_id};
use crate::error::{Result, RouterError};
use crate::store::Record;

/// Inclusive amount range in whole currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeRange {
    #[serde(default)]
    pub min: u64,
    #[serde(default = "unbounded")]
    pub max: u64,
}

fn unbounded() -> u64 {
    u64::MAX
}

impl Default for SizeRange {
    fn default() -> Self {
        Self {
            min: 0,
            max: u64::MAX,
        }
    }
}

impl SizeRange {
    /// Build a range, rejecting `min > max`.
    pub fn new(min: u64, max: u64) -> Result<Self> {
        let r = Self { min, max };
        r.validate()?;
        Ok(r)
    }

    /// Absent bounds default to `[0, +inf)`.
    pub fn from_bounds(min: Option<u64>, max: Option<u64>) -> Result<Self> {
        Self::new(min.unwrap_or(0), max.unwrap_or(u64::MAX))
    }

    pub fn validate(&self) -> Result<()> {
        if self.min > self.max {
            return Err(RouterError::bad_request(format!(
                "investment range min ({}) exceeds max ({})",
                self.min, self.max
            )));
        }
        Ok(())
    }

    pub fn contains(&self, amount: u64) -> bool {
        self.min <= amount && amount <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvestorStatus {
    #[default]
    Active,
    Inactive,
    Prospect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Investor {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub investment_size: SizeRange,
    pub preferred_sectors: BTreeSet<String>,
    pub preferred_stages: BTreeSet<String>,
    pub preferred_geographies: BTreeSet<String>,
    pub status: InvestorStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Investor {
    const KIND: &'static str = "investor";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Intake payload for a new investor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInvestor {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub firm: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub investment_size: SizeRange,
    #[serde(default)]
    pub preferred_sectors: Vec<String>,
    #[serde(default)]
    pub preferred_stages: Vec<String>,
    #[serde(default)]
    pub preferred_geographies: Vec<String>,
    #[serde(default)]
    pub status: InvestorStatus,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewInvestor {
    pub fn into_investor(self, now: DateTime<Utc>) -> Result<Investor> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(RouterError::bad_request("investor name is required"));
        }
        self.investment_size.validate()?;

        Ok(Investor {
            id: self
                .id
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(new_id),
            name,
            firm: self.firm,
            email: self.email,
            phone: self.phone,
            investment_size: self.investment_size,
            preferred_sectors: clean_set(self.preferred_sectors),
            preferred_stages: clean_set(self.preferred_stages),
            preferred_geographies: clean_set(self.preferred_geographies),
            status: self.status,
            tags: self.tags,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial field update. Investors are never deleted; set `status` instead.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestorPatch {
    pub name: Option<String>,
    pub firm: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub investment_size: Option<SizeRange>,
    pub preferred_sectors: Option<Vec<String>>,
    pub preferred_stages: Option<Vec<String>>,
    pub preferred_geographies: Option<Vec<String>>,
    pub status: Option<InvestorStatus>,
    pub tags: Option<Vec<String>>,
}

impl InvestorPatch {
    /// Apply onto `inv`; the size range is validated before anything changes.
    pub fn apply(self, inv: &mut Investor, now: DateTime<Utc>) -> Result<()> {
        if let Some(range) = &self.investment_size {
            range.validate()?;
        }
        if let Some(name) = self.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(RouterError::bad_request("investor name cannot be blank"));
            }
            inv.name = name;
        }
        if self.firm.is_some() {
            inv.firm = self.firm;
        }
        if self.email.is_some() {
            inv.email = self.email;
        }
        if self.phone.is_some() {
            inv.phone = self.phone;
        }
        if let Some(range) = self.investment_size {
            inv.investment_size = range;
        }
        if let Some(v) = self.preferred_sectors {
            inv.preferred_sectors = clean_set(v);
        }
        if let Some(v) = self.preferred_stages {
            inv.preferred_stages = clean_set(v);
        }
        if let Some(v) = self.preferred_geographies {
            inv.preferred_geographies = clean_set(v);
        }
        if let Some(s) = self.status {
            inv.status = s;
        }
        if let Some(t) = self.tags {
            inv.tags = t;
        }
        inv.updated_at = now;
        Ok(())
    }
}
