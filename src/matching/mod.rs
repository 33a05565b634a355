//! Matching engine: runs the criteria evaluator over the client collection,
//! either for an investor's stored preferences or for ad-hoc criteria.
//!
//! Results are recomputed on every call and keep the client collection's
//! natural order. The engine never writes.

pub mod criteria;

use serde::{Deserialize, Serialize};

use crate::domain::{Client, Investor, SizeRange};
use crate::error::{Result, RouterError};
use crate::store::SharedCollection;
use crate::telemetry;

pub use criteria::{evaluate, is_match, Constraint, Criteria, Evaluation};

/// Incoming match query (query string or JSON body).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequest {
    #[serde(default)]
    pub investor_id: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub geography: Option<String>,
    #[serde(default)]
    pub investment_min: Option<u64>,
    #[serde(default)]
    pub investment_max: Option<u64>,
}

fn present(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Validated form of a `MatchRequest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchMode {
    ByInvestor(String),
    AdHoc(Criteria),
}

impl MatchRequest {
    fn has_criteria(&self) -> bool {
        present(&self.sector).is_some()
            || present(&self.stage).is_some()
            || present(&self.geography).is_some()
            || self.investment_min.is_some()
            || self.investment_max.is_some()
    }

    /// Exactly one of investor id or criteria must be given.
    pub fn mode(&self) -> Result<MatchMode> {
        match (present(&self.investor_id), self.has_criteria()) {
            (Some(id), false) => Ok(MatchMode::ByInvestor(id.to_string())),
            (None, true) => {
                let range = SizeRange::from_bounds(self.investment_min, self.investment_max)?;
                Ok(MatchMode::AdHoc(Criteria::single(
                    present(&self.sector),
                    present(&self.stage),
                    present(&self.geography),
                    range,
                )))
            }
            (Some(_), true) => Err(RouterError::bad_request(
                "give either investorId or criteria, not both",
            )),
            (None, false) => Err(RouterError::bad_request(
                "investorId or at least one criterion (sector, stage, geography, investmentMin, investmentMax) is required",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub matches: Vec<Client>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub investor: Option<Investor>,
    pub criteria: Criteria,
}

#[derive(Clone)]
pub struct MatchingEngine {
    investors: SharedCollection<Investor>,
    clients: SharedCollection<Client>,
}

impl MatchingEngine {
    pub fn new(investors: SharedCollection<Investor>, clients: SharedCollection<Client>) -> Self {
        Self { investors, clients }
    }

    pub async fn find_matches(&self, req: &MatchRequest) -> Result<MatchResult> {
        // Reject malformed requests before touching any collection.
        let mode = req.mode()?;
        telemetry::ensure_described();

        let (criteria, investor) = match mode {
            MatchMode::ByInvestor(id) => {
                let inv = self
                    .investors
                    .get(&id)
                    .await?
                    .ok_or_else(|| RouterError::not_found("investor", id))?;
                (Criteria::from_investor(&inv), Some(inv))
            }
            MatchMode::AdHoc(c) => (c, None),
        };

        let matches = self.filter(&criteria).await?;
        let total = matches.len();

        metrics::counter!(telemetry::MATCH_QUERIES).increment(1);
        tracing::debug!(
            target: "matching",
            investor = investor.as_ref().map(|i| i.id.as_str()),
            total,
            "match query evaluated"
        );

        Ok(MatchResult {
            matches,
            total,
            investor,
            criteria,
        })
    }

    /// Every raising client satisfying `criteria`, in collection order.
    pub async fn filter(&self, criteria: &Criteria) -> Result<Vec<Client>> {
        Ok(self
            .clients
            .list()
            .await?
            .into_iter()
            .filter(|c| is_match(c, criteria))
            .collect())
    }
}
