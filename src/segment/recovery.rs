//! Segment Recovery
//!
//! Rebuilds the index by replaying a segment from offset 0.

use crate::error::Result;
use crate::index::Index;

use super::record::Mark;
use super::store::LogStore;

/// Rebuilds the in-memory index after a restart
pub struct Recovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of records replayed
    pub records_replayed: u64,

    /// Put records seen
    pub puts: u64,

    /// Tombstones seen
    pub deletes: u64,

    /// Keys live once replay finished
    pub live_keys: usize,

    /// Length of the readable prefix of the segment
    pub valid_len: u64,

    /// Whether unreadable bytes follow `valid_len` (partial header,
    /// truncated record or zero-filled space left by a crash mid-append)
    pub was_truncated: bool,
}

impl Recovery {
    /// Replay every record in `store` in append order
    ///
    /// Puts point the key at their offset, tombstones drop the key. A
    /// truncated or zero-filled tail ends the replay without error;
    /// everything before it stays indexed. Corrupt headers are propagated.
    ///
    /// The store is not modified; callers decide what to do with the tail.
    pub fn rebuild(store: &LogStore) -> Result<(Index, RecoveryResult)> {
        let mut index = Index::new();
        let mut result = RecoveryResult::default();

        let mut records = store.iter();
        for item in records.by_ref() {
            let (offset, record) = item?;

            match record.mark {
                Mark::Put => {
                    index.insert(record.key, offset);
                    result.puts += 1;
                }
                Mark::Delete => {
                    index.remove(&record.key);
                    result.deletes += 1;
                }
            }
            result.records_replayed += 1;
        }

        result.valid_len = records.position();
        result.was_truncated = result.valid_len < store.len();
        result.live_keys = index.len();

        if let Some(at) = records.truncated_at() {
            tracing::debug!(offset = at, "replay stopped at incomplete record");
        }

        Ok((index, result))
    }
}
