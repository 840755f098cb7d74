//! In-memory session key store
//!
//! One entry per identity, overwritten on every successful handshake. Keys
//! live only in process memory and are lost on restart.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use shared_protocol::Identity;
use tracing::{debug, info};

use crate::SessionKey;

/// Established session key and when it was established
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub key: SessionKey,
    pub established_at: Instant,
}

impl SessionEntry {
    fn is_expired(&self, ttl: Option<Duration>, now: Instant) -> bool {
        ttl.is_some_and(|ttl| now.saturating_duration_since(self.established_at) >= ttl)
    }
}

/// Concurrent map from identity to its current session key
#[derive(Debug, Default)]
pub struct SessionKeyStore {
    entries: DashMap<Identity, SessionEntry>,
    ttl: Option<Duration>,
}

impl SessionKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries older than `ttl` are treated as absent and evicted on access
    pub fn with_ttl(ttl: Option<Duration>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Store a key, replacing any previous key for the identity
    pub fn put(&self, identity: Identity, key: SessionKey) {
        let entry = SessionEntry {
            key,
            established_at: Instant::now(),
        };
        if self.entries.insert(identity.clone(), entry).is_some() {
            debug!("Rotated session key for {}", identity);
        }
    }

    /// Current key for the identity; `None` means no protected channel yet
    pub fn get(&self, identity: &Identity) -> Option<SessionKey> {
        self.entry(identity).map(|entry| entry.key)
    }

    pub fn entry(&self, identity: &Identity) -> Option<SessionEntry> {
        let now = Instant::now();
        let entry = self.entries.get(identity)?.clone();
        if entry.is_expired(self.ttl, now) {
            self.entries
                .remove_if(identity, |_, current| current.is_expired(self.ttl, now));
            debug!("Session key for {} expired", identity);
            return None;
        }
        Some(entry)
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.entry(identity).is_some()
    }

    /// Drop the identity's key (logout)
    pub fn remove(&self, identity: &Identity) -> bool {
        let removed = self.entries.remove(identity).is_some();
        if removed {
            info!("Cleared session key for {}", identity);
        }
        removed
    }

    /// Evict every expired entry, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let Some(ttl) = self.ttl else {
            return 0;
        };
        let now = Instant::now();
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !entry.is_expired(Some(ttl), now));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
