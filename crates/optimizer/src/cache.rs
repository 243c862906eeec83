//! Time-bounded result cache.
//!
//! Entries expire lazily: a read that finds an entry older than its
//! category's `cache_duration` removes it and reports a miss. There is no
//! background sweep.

use codemap_core::{CacheEntry, Category, Coordinates, OperationId, OperationOutcome, RuleTable, Time};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Operation results keyed by operation id.
///
/// Backed by a sharded map, so reads and writes lock per key; the
/// evict-on-read in [`get`](Self::get) happens under that lock.
pub struct ResultCache {
    entries: DashMap<OperationId, CacheEntry>,
    rules: Arc<RuleTable>,
}

impl ResultCache {
    /// Create an empty cache using `rules` for expiry.
    pub fn new(rules: Arc<RuleTable>) -> Self {
        Self {
            entries: DashMap::new(),
            rules,
        }
    }

    /// Fresh entry for `id` at `now`, evicting it if it has expired.
    pub fn get(&self, id: &OperationId, now: Time) -> Option<CacheEntry> {
        match self.entries.entry(id.clone()) {
            Entry::Occupied(entry) => {
                let ttl = self.rules.policy_for(entry.get().category).cache_ttl();
                if entry.get().is_expired(ttl, now) {
                    debug!("Evicting expired cache entry for {}", id);
                    entry.remove();
                    None
                } else {
                    Some(entry.get().clone())
                }
            }
            Entry::Vacant(_) => None,
        }
    }

    /// Store a result, replacing any previous entry.
    ///
    /// The cache does not check the category's policy; callers only store
    /// results of cacheable categories.
    pub fn put(
        &self,
        id: OperationId,
        category: Category,
        result: OperationOutcome,
        coordinates: Coordinates,
        now: Time,
    ) {
        let entry = CacheEntry {
            operation: id.clone(),
            category,
            result,
            created_at: now,
            coordinates,
        };
        self.entries.insert(id, entry);
    }

    /// Drop the entry for `id`. Returns whether one existed.
    pub fn invalidate(&self, id: &OperationId) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rule table used for expiry.
    pub fn rules(&self) -> &Arc<RuleTable> {
        &self.rules
    }
}
