//! Optional boot-time fixture of investors and clients (`seed_path` in config).

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Deserialize;
use std::path::Path;

use crate::domain::{Client, Investor, NewClient, NewInvestor};
use crate::store::SharedCollection;

#[derive(Debug, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub investors: Vec<NewInvestor>,
    #[serde(default)]
    pub clients: Vec<NewClient>,
}

impl SeedFile {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading seed from {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing seed {}", path.display()))
    }

    /// Insert every record in file order. Returns (investors, clients) counts.
    pub async fn apply(
        self,
        investors: &SharedCollection<Investor>,
        clients: &SharedCollection<Client>,
    ) -> Result<(usize, usize)> {
        let now = Utc::now();
        let (mut ni, mut nc) = (0, 0);
        for inv in self.investors {
            let inv = inv.into_investor(now)?;
            investors
                .insert(inv)
                .await
                .context("seeding investor")?;
            ni += 1;
        }
        for cl in self.clients {
            clients
                .insert(cl.into_client(now)?)
                .await
                .context("seeding client")?;
            nc += 1;
        }
        tracing::info!(target: "lead_router", investors = ni, clients = nc, "seed loaded");
        Ok((ni, nc))
    }
}
