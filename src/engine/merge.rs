//! Merge: rewrites the live records into a fresh segment.
//!
//! A record is live iff the index still points at its offset. Tombstones
//! never match (they are never indexed) and neither do superseded Puts, so
//! both disappear. The rewrite goes to a scratch file which only replaces the
//! canonical segment once it is complete and synced.
use std::fs;
use std::io;
use std::path::Path;

use crate::config::SyncStrategy;
use crate::error::Result;
use crate::index::Index;
use crate::segment::{LogStore, Record};

use super::{Engine, EngineState};

/// Summary of a merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Records read from the old segment
    pub records_scanned: u64,

    /// Records carried over into the new segment
    pub live_records: u64,

    /// Segment size before the merge
    pub bytes_before: u64,

    /// Segment size after the merge
    pub bytes_after: u64,
}

impl MergeStats {
    /// Bytes freed by the merge
    pub fn reclaimed(&self) -> u64 {
        self.bytes_before.saturating_sub(self.bytes_after)
    }
}

impl Engine {
    /// Compact the segment down to its live records.
    ///
    /// Holds the exclusive lock for the whole call: a put slipping in after
    /// the scan would land in a file that is about to be replaced.
    ///
    /// # Segment states
    ///
    /// `Active(old)` → `RewritingInto(scratch)` → either
    /// - failed: scratch removed, old segment and index untouched, or
    /// - committed: scratch renamed over the old segment and adopted, index
    ///   switched to the new offsets.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or on a corrupt record in the old
    /// segment. The engine is unchanged in either case.
    pub fn merge(&self) -> Result<MergeStats> {
        let mut state = self.state.write();

        if state.store.is_empty() {
            return Ok(MergeStats::default());
        }

        let bytes_before = state.store.len();
        let (live, records_scanned) = collect_live(&state)?;
        let live_records = live.len() as u64;

        tracing::debug!(
            records_scanned,
            live_records,
            bytes_before,
            "merge started"
        );

        let (mut scratch, index) = match self.rewrite(live) {
            Ok(rewritten) => rewritten,
            Err(e) => {
                self.discard_scratch();
                return Err(e);
            }
        };

        if let Err(e) = scratch.rename(&self.segment_path) {
            drop(scratch);
            self.discard_scratch();
            return Err(e);
        }
        sync_dir(&self.config.data_dir);

        scratch.set_sync_strategy(self.config.sync_strategy);

        // Commit: the old handle is released here, after the rename.
        let old = std::mem::replace(&mut state.store, scratch);
        drop(old);
        state.index = index;

        let stats = MergeStats {
            records_scanned,
            live_records,
            bytes_before,
            bytes_after: state.store.len(),
        };

        tracing::info!(
            records_scanned,
            live_records,
            bytes_before,
            bytes_after = stats.bytes_after,
            "merge committed"
        );

        Ok(stats)
    }

    /// Write `live` into a new scratch segment and index it
    fn rewrite(&self, live: Vec<Record>) -> Result<(LogStore, Index)> {
        // Synced once at the end instead of per record
        let mut scratch = LogStore::create(&self.merge_path, SyncStrategy::OsBuffered)?;
        let mut index = Index::new();

        for record in live {
            let offset = scratch.append(&record)?;
            index.insert(record.key, offset);
        }

        scratch.sync()?;
        Ok((scratch, index))
    }

    fn discard_scratch(&self) {
        match fs::remove_file(&self.merge_path) {
            Ok(()) => {
                tracing::warn!(path = %self.merge_path.display(), "merge failed, scratch segment discarded")
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.merge_path.display(),
                error = %e,
                "failed to remove scratch segment"
            ),
        }
    }
}

/// Scan the segment and keep the records the index still points at
fn collect_live(state: &EngineState) -> Result<(Vec<Record>, u64)> {
    let mut live = Vec::with_capacity(state.index.len());
    let mut scanned = 0u64;

    for item in state.store.iter() {
        let (offset, record) = item?;
        scanned += 1;

        if state.index.is_live(&record.key, offset) {
            live.push(record);
        }
    }

    if live.len() != state.index.len() {
        tracing::warn!(
            indexed = state.index.len(),
            found = live.len(),
            "index entries without a matching record were dropped by merge"
        );
    }

    Ok((live, scanned))
}

/// Make a rename durable (best effort; not supported on every platform)
fn sync_dir(dir: &Path) {
    if let Ok(handle) = fs::File::open(dir) {
        if let Err(e) = handle.sync_all() {
            tracing::debug!(dir = %dir.display(), error = %e, "directory fsync failed");
        }
    }
}
