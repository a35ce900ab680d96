//! Engine Module
//!
//! The storage engine that ties the segment and the index together.
//!
//! ## Responsibilities
//! - Open the data directory and rebuild the index from the segment
//! - Serve get/put/delete under a single reader-writer lock
//! - Compact the segment (see [`merge`](Engine::merge))

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::config::Config;
use crate::error::{BitlogError, Result};
use crate::index::Index;
use crate::segment::{LogStore, Mark, Record, Recovery, RecoveryResult};

mod merge;

pub use merge::MergeStats;

/// The main storage engine
///
/// ## Concurrency Model
///
/// One `RwLock` guards the segment and the index as a single unit, since an
/// offset capture, an append and an index update must be observed together.
///
/// - **Writes** (put/delete/merge): exclusive lock, held for the whole call
/// - **Reads** (get): shared lock; positional reads do not move any shared
///   file cursor, so concurrent gets run in parallel
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Canonical segment file
    segment_path: PathBuf,

    /// Scratch segment written during merge
    merge_path: PathBuf,

    /// Segment + index, always changed together
    state: RwLock<EngineState>,

    /// What replay found when the engine was opened
    recovery: RecoveryResult,
}

struct EngineState {
    store: LogStore,
    index: Index,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const SEGMENT_FILENAME: &'static str = "bitlog.data";
    const MERGE_FILENAME: &'static str = "bitlog.data.merge";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Create the data directory if needed
    /// 2. Remove a scratch segment left by an interrupted merge
    /// 3. Open the segment and replay it into a fresh index
    /// 4. Cut off any unreadable tail so appends resume on a clean boundary
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        fs::create_dir_all(&config.data_dir)?;

        let segment_path = config.data_dir.join(Self::SEGMENT_FILENAME);
        let merge_path = config.data_dir.join(Self::MERGE_FILENAME);

        if merge_path.exists() {
            tracing::warn!(
                path = %merge_path.display(),
                "removing scratch segment from interrupted merge"
            );
            fs::remove_file(&merge_path)?;
        }

        let mut store = LogStore::open(&segment_path, config.sync_strategy)?;
        let (index, recovery) = Recovery::rebuild(&store)?;

        if recovery.was_truncated {
            tracing::warn!(
                path = %segment_path.display(),
                valid_len = recovery.valid_len,
                dropped = store.len() - recovery.valid_len,
                "dropping incomplete record at end of segment"
            );
            store.truncate(recovery.valid_len)?;
        }

        tracing::info!(
            path = %segment_path.display(),
            records = recovery.records_replayed,
            live_keys = recovery.live_keys,
            size = store.len(),
            "engine opened"
        );

        Ok(Self {
            config,
            segment_path,
            merge_path,
            state: RwLock::new(EngineState { store, index }),
            recovery,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let config = Config::builder().data_dir(path.as_ref()).build();
        Self::open(config)
    }

    /// Get a value by key
    ///
    /// Returns `Ok(None)` for empty or unknown keys. An index entry that no
    /// longer resolves to this key's Put record is reported as `StaleIndex`.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if key.is_empty() {
            return Ok(None);
        }

        let state = self.state.read();

        let offset = match state.index.get(key) {
            Some(offset) => offset,
            None => return Ok(None),
        };

        let stale = || BitlogError::StaleIndex {
            key: key.to_vec(),
            offset,
        };

        match state.store.read(offset) {
            Ok(Some(record)) if record.mark == Mark::Put && record.key == key => {
                Ok(Some(record.value))
            }
            Ok(_) => Err(stale()),
            Err(e) if e.is_truncated() => Err(stale()),
            Err(e) => Err(e),
        }
    }

    /// Put a key-value pair
    ///
    /// An empty key is accepted and ignored. The index only learns about
    /// the record once the append has succeeded.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Ok(());
        }

        let mut state = self.state.write();

        let offset = state.store.append(&Record::put(key, value))?;
        state.index.insert(key.to_vec(), offset);

        Ok(())
    }

    /// Delete a key
    ///
    /// Writes a tombstone only if the key is currently live.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Ok(());
        }

        let mut state = self.state.write();

        if !state.index.contains(key) {
            return Ok(());
        }

        state.store.append(&Record::delete(key))?;
        state.index.remove(key);

        Ok(())
    }

    /// Force the segment to disk
    pub fn sync(&self) -> Result<()> {
        self.state.write().store.sync()
    }

    /// Close the engine gracefully
    ///
    /// Syncs the segment so every acknowledged write is on disk.
    pub fn close(self) -> Result<()> {
        let mut state = self.state.into_inner();
        state.store.sync()?;

        tracing::debug!(path = %self.segment_path.display(), "engine closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.state.read().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current segment size in bytes
    pub fn segment_size(&self) -> u64 {
        self.state.read().store.len()
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Path of the canonical segment file
    pub fn segment_path(&self) -> &Path {
        &self.segment_path
    }

    /// What replay found when the engine was opened
    pub fn recovery_result(&self) -> &RecoveryResult {
        &self.recovery
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
