//! Process-local cache for listing reads.
//!
//! Handlers receive the cache through `AppState` as a `ListingCache` and only
//! ever address it by key or key prefix.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

pub const VEHICLES_PREFIX: &str = "vehicles:";
pub const VEHICLE_LIST_KEY: &str = "vehicles:list";

pub fn vehicle_key(id: &uuid::Uuid) -> String {
    format!("{VEHICLES_PREFIX}{id}")
}

pub trait ListingCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&self, key: &str, value: Value);

    /// Drops every entry whose key starts with `prefix`, returning how many
    /// were removed.
    fn invalidate_prefix(&self, prefix: &str) -> usize;
}

struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

pub struct TtlCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl TtlCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ListingCache for TtlCache {
    fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        let hit = self.entries.get(key).and_then(|entry| {
            if entry.expires_at > now {
                Some(entry.value.clone())
            } else {
                None
            }
        });

        if hit.is_none() {
            // lazy eviction; guard released above
            self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        }

        hit
    }

    fn set(&self, key: &str, value: Value) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    fn invalidate_prefix(&self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before.saturating_sub(self.entries.len());
        debug!(prefix, removed, "listing cache invalidated");
        removed
    }
}
