// Venue registry
// Canonical candidate book per (token_in, token_out) pair. Candidates are
// served in registration order, which is the allocation priority order the
// route optimizer walks. A JSON snapshot can seed the book at startup.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::venues::adapter::{LiquiditySource, Token, VenueCandidate, VenueId};

#[derive(Default)]
pub struct VenueRegistry {
    pairs: RwLock<HashMap<(Token, Token), Vec<VenueCandidate>>>,
}

impl VenueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a candidate for its pair. A venue already present for the
    /// pair is refreshed in place so its priority position is stable across
    /// liquidity updates.
    pub async fn register(&self, candidate: VenueCandidate) {
        let mut pairs = self.pairs.write().await;
        let key = (candidate.token_in.clone(), candidate.token_out.clone());
        let book = pairs.entry(key).or_default();
        match book.iter_mut().find(|c| c.venue == candidate.venue) {
            Some(existing) => {
                debug!(venue = %candidate.venue, liquidity = candidate.liquidity, "venue refreshed");
                *existing = candidate;
            }
            None => {
                debug!(venue = %candidate.venue, token_in = %candidate.token_in, token_out = %candidate.token_out, "venue registered");
                book.push(candidate);
            }
        }
    }

    /// Seed the registry from a JSON snapshot: a flat array of candidates.
    /// Returns the number of entries loaded.
    pub async fn load_snapshot(&self, path: &Path) -> anyhow::Result<usize> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read venue snapshot {}", path.display()))?;
        let candidates: Vec<VenueCandidate> =
            serde_json::from_str(&raw).context("parse venue snapshot")?;
        let count = candidates.len();
        for candidate in candidates {
            self.register(candidate).await;
        }
        info!(path = %path.display(), venues = count, "venue snapshot loaded");
        Ok(count)
    }

    pub async fn candidate_for(
        &self,
        token_in: &Token,
        token_out: &Token,
        venue: &VenueId,
    ) -> Option<VenueCandidate> {
        self.pairs
            .read()
            .await
            .get(&(token_in.clone(), token_out.clone()))
            .and_then(|book| book.iter().find(|c| c.venue == *venue).cloned())
    }
}

#[async_trait]
impl LiquiditySource for VenueRegistry {
    async fn candidate_venues(&self, token_in: &Token, token_out: &Token) -> Vec<VenueCandidate> {
        self.pairs
            .read()
            .await
            .get(&(token_in.clone(), token_out.clone()))
            .cloned()
            .unwrap_or_default()
    }
}
