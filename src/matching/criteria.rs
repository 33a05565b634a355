//! Criteria evaluator: a pure hard filter over a single client.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::{clean_set, Client, ClientStatus, Investor, SizeRange};

/// Ephemeral filter. An empty set places no constraint on that dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Criteria {
    pub sectors: BTreeSet<String>,
    pub stages: BTreeSet<String>,
    pub geographies: BTreeSet<String>,
    pub investment: SizeRange,
}

impl Criteria {
    /// The investor's stored preferences become the constraint sets.
    pub fn from_investor(inv: &Investor) -> Self {
        Self {
            sectors: inv.preferred_sectors.clone(),
            stages: inv.preferred_stages.clone(),
            geographies: inv.preferred_geographies.clone(),
            investment: inv.investment_size,
        }
    }

    /// Ad-hoc criteria: each present value becomes a one-element set.
    pub fn single(
        sector: Option<&str>,
        stage: Option<&str>,
        geography: Option<&str>,
        investment: SizeRange,
    ) -> Self {
        Self {
            sectors: clean_set(sector),
            stages: clean_set(stage),
            geographies: clean_set(geography),
            investment,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Constraint {
    Sector,
    Stage,
    Geography,
    Size,
}

/// Per-check outcome of `evaluate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Evaluation {
    pub eligible: bool,
    pub sector: bool,
    pub stage: bool,
    pub geography: bool,
    pub size: bool,
}

impl Evaluation {
    pub fn is_match(&self) -> bool {
        self.eligible && self.sector && self.stage && self.geography && self.size
    }

    /// Constraints that passed; empty when the client was ineligible.
    pub fn passed(&self) -> Vec<Constraint> {
        [
            (self.sector, Constraint::Sector),
            (self.stage, Constraint::Stage),
            (self.geography, Constraint::Geography),
            (self.size, Constraint::Size),
        ]
        .into_iter()
        .filter_map(|(ok, c)| ok.then_some(c))
        .collect()
    }
}

fn allows(set: &BTreeSet<String>, value: &str) -> bool {
    set.is_empty() || set.contains(value)
}

/// Evaluate `client` against `criteria`. Non-raising clients short-circuit to
/// an all-false evaluation.
pub fn evaluate(client: &Client, criteria: &Criteria) -> Evaluation {
    if client.status != ClientStatus::Raising {
        return Evaluation::default();
    }
    Evaluation {
        eligible: true,
        sector: allows(&criteria.sectors, &client.sector),
        stage: allows(&criteria.stages, &client.stage),
        geography: allows(&criteria.geographies, &client.geography),
        size: criteria.investment.contains(client.funding_needed),
    }
}

pub fn is_match(client: &Client, criteria: &Criteria) -> bool {
    evaluate(client, criteria).is_match()
}
