use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::StoreError;
use crate::token::{expiry_after, TokenId};

/// Server-side bookkeeping entry backing a live credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedTokenRecord {
    pub identity: TokenId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Result of looking an identity up in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Record present and not yet expired.
    Live,
    /// Record was present but expired; this lookup removed it.
    Evicted,
    /// No record (never issued, revoked, or already evicted).
    Unknown,
}

impl Liveness {
    pub fn is_live(self) -> bool {
        matches!(self, Liveness::Live)
    }
}

/// Trait for token registries.
///
/// Implementations must be thread-safe (`Send + Sync`) and must make the
/// expiry check and its eviction a single atomic step per identity.
pub trait TokenStore: Send + Sync {
    /// Insert a record expiring at `expires_at`. Fails on identity collision.
    fn register_until(&self, identity: TokenId, expires_at: DateTime<Utc>)
        -> Result<(), StoreError>;

    /// Look up `identity`, lazily evicting it if it has expired.
    fn probe(&self, identity: &TokenId) -> Liveness;

    /// Remove a record regardless of expiry. Returns `true` if one existed.
    fn revoke(&self, identity: &TokenId) -> bool;

    /// Insert a record expiring `ttl` from now.
    fn register(&self, identity: TokenId, ttl: Duration) -> Result<(), StoreError> {
        self.register_until(identity, expiry_after(ttl))
    }

    /// `true` iff a record exists and its expiry is strictly after now.
    fn check_live(&self, identity: &TokenId) -> bool {
        self.probe(identity).is_live()
    }
}

/// In-memory token store backed by DashMap. Lost on restart; expired
/// records stay until their next lookup.
pub struct InMemoryTokenStore {
    records: DashMap<TokenId, IssuedTokenRecord>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Number of records held, expired ones included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, identity: &TokenId) -> Option<IssuedTokenRecord> {
        self.records.get(identity).map(|r| r.value().clone())
    }
}

impl Default for InMemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for InMemoryTokenStore {
    fn register_until(
        &self,
        identity: TokenId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        match self.records.entry(identity) {
            Entry::Occupied(o) => {
                tracing::error!(token_id = %o.key(), "token identity collision");
                Err(StoreError::Collision(o.key().to_string()))
            }
            Entry::Vacant(v) => {
                let record = IssuedTokenRecord {
                    identity: v.key().clone(),
                    created_at: Utc::now(),
                    expires_at,
                };
                v.insert(record);
                Ok(())
            }
        }
    }

    fn probe(&self, identity: &TokenId) -> Liveness {
        // The entry holds the shard write lock, so the expiry check and the
        // removal cannot interleave with another lookup of the same identity.
        match self.records.entry(identity.clone()) {
            Entry::Vacant(_) => Liveness::Unknown,
            Entry::Occupied(o) => {
                if o.get().expires_at > Utc::now() {
                    Liveness::Live
                } else {
                    tracing::debug!(token_id = %identity, "evicting expired token record");
                    o.remove();
                    Liveness::Evicted
                }
            }
        }
    }

    fn revoke(&self, identity: &TokenId) -> bool {
        self.records.remove(identity).is_some()
    }
}
