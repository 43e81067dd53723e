//! In-memory GET response cache
//!
//! Entries are partitioned by the transport that produced them so a
//! direct/proxy switch can drop the other side wholesale. Ages are measured
//! against an injectable [`Clock`].

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::Value;
use sha2::{Digest, Sha256};
use stockbridge_core::Params;
use stockbridge_domain::{HttpMethod, TransportKind};
use tracing::debug;

use crate::time::{Clock, SystemClock};

/// `lowercase(method)|endpoint|hex(sha256(k=v&...))`.
pub fn cache_key(method: HttpMethod, endpoint: &str, params: &Params) -> String {
    let canonical =
        params.iter().map(|(key, value)| format!("{key}={value}")).collect::<Vec<_>>().join("&");
    let digest = Sha256::digest(canonical.as_bytes());
    format!("{}|{}|{}", method.as_str(), endpoint, hex::encode(digest))
}

#[derive(Debug)]
struct CacheEntry {
    body: Value,
    stored_at: Instant,
    hits: u64,
}

pub struct ResponseCache<C: Clock = SystemClock> {
    entries: Mutex<HashMap<(TransportKind, String), CacheEntry>>,
    clock: C,
}

impl ResponseCache<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for ResponseCache<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> ResponseCache<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { entries: Mutex::new(HashMap::new()), clock }
    }

    /// Body stored under `key` if it is younger than `ttl`.
    pub fn get(&self, partition: TransportKind, key: &str, ttl: Duration) -> Option<Value> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let slot = (partition, key.to_string());
        let fresh =
            entries.get(&slot).map(|entry| now.saturating_duration_since(entry.stored_at) < ttl)?;
        if !fresh {
            entries.remove(&slot);
            return None;
        }
        let entry = entries.get_mut(&slot)?;
        entry.hits += 1;
        Some(entry.body.clone())
    }

    /// Store `body`, keeping at most `max_size` entries.
    ///
    /// When full, expired entries go first, then the oldest ones.
    pub fn insert(
        &self,
        partition: TransportKind,
        key: String,
        body: Value,
        ttl: Duration,
        max_size: usize,
    ) {
        if max_size == 0 {
            return;
        }
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let slot = (partition, key);

        if !entries.contains_key(&slot) && entries.len() >= max_size {
            let before = entries.len();
            entries.retain(|_, entry| now.saturating_duration_since(entry.stored_at) < ttl);
            if before != entries.len() {
                debug!(pruned = before - entries.len(), "pruned expired cache entries");
            }
            while entries.len() >= max_size {
                let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.stored_at)
                    .map(|(slot, _)| slot.clone())
                else {
                    break;
                };
                entries.remove(&oldest);
            }
        }

        entries.insert(slot, CacheEntry { body, stored_at: now, hits: 0 });
    }

    /// Drop every entry whose key starts with `prefix`, in every partition.
    pub fn purge_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(_, key), _| !key.starts_with(prefix));
        before - entries.len()
    }

    pub fn purge_partition(&self, partition: TransportKind) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(kind, _), _| *kind != partition);
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hits served by the entry under `key`, if it is still stored.
    pub fn hits(&self, partition: TransportKind, key: &str) -> Option<u64> {
        self.entries.lock().get(&(partition, key.to_string())).map(|entry| entry.hits)
    }
}
