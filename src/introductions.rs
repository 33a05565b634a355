//! Introduction ledger: records proposed investor/client pairings.
//!
//! Both references are checked against the investor and client collections
//! (unknown ids fail with `NotFound`). Duplicate pairs are kept;
//! callers de-duplicate through `list` with filters.

use chrono::Utc;
use serde::Deserialize;

use crate::domain::{Client, Introduction, IntroductionStatus, Investor};
use crate::error::{Result, RouterError};
use crate::store::SharedCollection;
use crate::telemetry;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIntroduction {
    #[serde(default)]
    pub investor_id: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntroductionFilter {
    pub investor_id: Option<String>,
    pub client_id: Option<String>,
}

impl IntroductionFilter {
    fn accepts(&self, intro: &Introduction) -> bool {
        self.investor_id
            .as_deref()
            .map_or(true, |id| intro.investor_id == id)
            && self
                .client_id
                .as_deref()
                .map_or(true, |id| intro.client_id == id)
    }
}

#[derive(Clone)]
pub struct IntroductionLedger {
    introductions: SharedCollection<Introduction>,
    investors: SharedCollection<Investor>,
    clients: SharedCollection<Client>,
}

impl IntroductionLedger {
    pub fn new(
        introductions: SharedCollection<Introduction>,
        investors: SharedCollection<Investor>,
        clients: SharedCollection<Client>,
    ) -> Self {
        Self {
            introductions,
            investors,
            clients,
        }
    }

    pub async fn create(&self, req: NewIntroduction) -> Result<Introduction> {
        let investor_id = req.investor_id.trim().to_string();
        let client_id = req.client_id.trim().to_string();
        if investor_id.is_empty() || client_id.is_empty() {
            return Err(RouterError::bad_request(
                "investorId and clientId are required",
            ));
        }

        if self.investors.get(&investor_id).await?.is_none() {
            return Err(RouterError::not_found("investor", investor_id));
        }
        if self.clients.get(&client_id).await?.is_none() {
            return Err(RouterError::not_found("client", client_id));
        }

        let intro = Introduction::new(investor_id, client_id, req.notes, Utc::now());
        let intro = self.introductions.insert(intro).await?;

        telemetry::ensure_described();
        metrics::counter!(telemetry::INTRODUCTIONS_CREATED).increment(1);
        tracing::info!(
            target: "introductions",
            id = %intro.id,
            investor = %intro.investor_id,
            client = %intro.client_id,
            "introduction recorded"
        );
        Ok(intro)
    }

    pub async fn get(&self, id: &str) -> Result<Introduction> {
        self.introductions
            .get(id)
            .await?
            .ok_or_else(|| RouterError::not_found("introduction", id))
    }

    /// All introductions in creation order, narrowed by `filter`.
    pub async fn list(&self, filter: &IntroductionFilter) -> Result<Vec<Introduction>> {
        Ok(self
            .introductions
            .list()
            .await?
            .into_iter()
            .filter(|i| filter.accepts(i))
            .collect())
    }

    pub async fn set_status(&self, id: &str, to: IntroductionStatus) -> Result<Introduction> {
        let now = Utc::now();
        self.introductions
            .update(id, Box::new(move |i: &mut Introduction| i.set_status(to, now)))
            .await
    }
}
