//! Index Module
//!
//! In-memory map from each live key to the offset of its latest Put record.
//!
//! ## Responsibilities
//! - O(1) key → offset lookups for reads
//! - Decide record liveness during merge
//! - Never reference tombstones: deleted keys are simply absent
//!
//! The index is owned by the engine and only touched inside its lock, after
//! the corresponding append has succeeded.

use std::collections::HashMap;

/// Key → offset of the key's current Put record
#[derive(Debug, Default, Clone)]
pub struct Index {
    entries: HashMap<Vec<u8>, u64>,
}

impl Index {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset of the key's live record
    pub fn get(&self, key: &[u8]) -> Option<u64> {
        self.entries.get(key).copied()
    }

    /// Point the key at a new record, returning the previous offset
    pub fn insert(&mut self, key: Vec<u8>, offset: u64) -> Option<u64> {
        self.entries.insert(key, offset)
    }

    /// Drop the key (no-op if absent)
    pub fn remove(&mut self, key: &[u8]) -> Option<u64> {
        self.entries.remove(key)
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    /// True if the record at `offset` is the key's current value
    pub fn is_live(&self, key: &[u8], offset: u64) -> bool {
        self.get(key) == Some(offset)
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
