//! Local Cache - Unit-of-Work Tier
//!
//! In-memory memo of every physical key resolved during one unit of work,
//! including memoized misses. It is the only storage for non-persistent
//! groups. No eviction: its size is bounded by the keys one unit of work
//! touches.

use std::collections::HashMap;

use crate::value::CacheEntry;

/// Physical key -> `(value, found)` memo
#[derive(Debug, Default)]
pub struct LocalCache {
    entries: HashMap<String, CacheEntry>,
}

impl LocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` means the key has not been resolved in this unit of work
    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Whether `key` holds a real value (not a memoized miss)
    pub fn contains_value(&self, key: &str) -> bool {
        self.entries.get(key).is_some_and(|entry| entry.found)
    }

    pub fn put(&mut self, key: impl Into<String>, entry: CacheEntry) {
        self.entries.insert(key.into(), entry);
    }

    pub fn forget(&mut self, key: &str) -> Option<CacheEntry> {
        self.entries.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
