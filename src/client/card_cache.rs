//! Caller-side agent card cache.
//!
//! Cards are keyed by target id and expire after the target's TTL. The raw
//! body hash from [`CardFetchResult`](super::CardFetchResult) is kept with each
//! entry so a refresh can report whether the agent changed its card.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{A2AError, A2AResult};
use crate::types::AgentCard;

use super::card_resolver::{CardFetchOptions, CardResolver};

/// A registered agent, as handed out by a target registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    /// Registry identifier; the cache key.
    pub id: String,
    /// Agent base URL.
    pub url: String,
    /// How long a fetched card stays fresh.
    pub ttl_seconds: u64,
    /// Permit loopback/private agent URLs.
    pub allow_local: bool,
}

/// One cached card.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedCard {
    /// The validated card.
    pub card: AgentCard,
    /// Hex SHA-256 of the body it was parsed from.
    pub hash: String,
    /// When the card was fetched.
    pub fetched_at: DateTime<Utc>,
    /// When the entry stops being served.
    pub expires_at: DateTime<Utc>,
}

impl CachedCard {
    /// Whether the entry is still fresh at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Result of [`CardCache::refresh`].
#[derive(Debug, Clone, PartialEq)]
pub struct CardRefresh {
    /// The entry now in the cache.
    pub entry: CachedCard,
    /// True when a previous entry existed and its hash differs.
    pub changed: bool,
}

/// TTL cache of agent cards keyed by target id.
#[derive(Debug, Clone, Default)]
pub struct CardCache {
    resolver: CardResolver,
    entries: Arc<RwLock<HashMap<String, CachedCard>>>,
}

impl CardCache {
    /// Create an empty cache using a default [`CardResolver`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache fetching through `resolver`.
    pub fn with_resolver(resolver: CardResolver) -> Self {
        Self {
            resolver,
            entries: Arc::default(),
        }
    }

    /// The fresh entry for `target_id`, if any.
    pub async fn get(&self, target_id: &str) -> Option<CachedCard> {
        let entries = self.entries.read().await;
        entries
            .get(target_id)
            .filter(|entry| entry.is_fresh(Utc::now()))
            .cloned()
    }

    /// Store a card directly, e.g. one obtained out of band.
    pub async fn insert(
        &self,
        target_id: &str,
        card: AgentCard,
        hash: String,
        ttl_seconds: u64,
    ) -> CachedCard {
        let fetched_at = Utc::now();
        let entry = CachedCard {
            card,
            hash,
            fetched_at,
            expires_at: fetched_at
                .checked_add_signed(ttl(ttl_seconds))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        self.entries
            .write()
            .await
            .insert(target_id.to_string(), entry.clone());
        entry
    }

    /// Drop the entry for `target_id`.
    pub async fn invalidate(&self, target_id: &str) {
        if self.entries.write().await.remove(target_id).is_some() {
            debug!(target_id = %target_id, "agent card invalidated");
        }
    }

    /// Serve the fresh entry, fetching the card when missing or expired.
    pub async fn get_or_fetch(&self, target: &Target) -> A2AResult<CachedCard> {
        if let Some(entry) = self.get(&target.id).await {
            return Ok(entry);
        }
        self.refresh(target).await.map(|refresh| refresh.entry)
    }

    /// Fetch the card now and replace the entry.
    ///
    /// On failure the previous entry, stale or not, is left untouched.
    pub async fn refresh(&self, target: &Target) -> A2AResult<CardRefresh> {
        let options = CardFetchOptions::default().with_allow_local(target.allow_local);
        let result = self.resolver.fetch(&target.url, &options).await;

        let card = result.card?;
        let hash = result
            .hash
            .ok_or_else(|| A2AError::Transport("agent card fetched without a body".to_string()))?;

        let previous_hash = self
            .entries
            .read()
            .await
            .get(&target.id)
            .map(|entry| entry.hash.clone());
        let changed = previous_hash.as_deref().is_some_and(|prev| prev != hash);
        if changed {
            info!(target_id = %target.id, "agent card changed");
        }

        let entry = self.insert(&target.id, card, hash, target.ttl_seconds).await;
        Ok(CardRefresh { entry, changed })
    }
}

/// Longest TTL honoured; larger values are clamped (100 years).
const MAX_TTL_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

fn ttl(seconds: u64) -> Duration {
    Duration::seconds(seconds.min(MAX_TTL_SECONDS) as i64)
}
