//! Configuration for bitlog
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{BitlogError, Result};

/// Main configuration for a bitlog instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding the segment files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── bitlog.data          (active segment)
    ///     └── bitlog.data.merge    (scratch segment, only during merge)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Durability Configuration
    // -------------------------------------------------------------------------
    /// How often appends are fsynced
    pub sync_strategy: SyncStrategy,
}

/// Segment sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every append (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced appends (balanced durability/performance)
    EveryNWrites { count: usize },

    /// Never fsync on append; leave flushing to the OS
    OsBuffered,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./bitlog_data"),
            sync_strategy: SyncStrategy::EveryNWrites { count: 100 },
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the config for values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(BitlogError::Config("data_dir must not be empty".to_string()));
        }

        if let SyncStrategy::EveryNWrites { count: 0 } = self.sync_strategy {
            return Err(BitlogError::Config(
                "EveryNWrites count must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
