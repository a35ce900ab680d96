//! Error types for bitlog
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using BitlogError
pub type Result<T> = std::result::Result<T, BitlogError>;

/// Unified error type for bitlog operations
#[derive(Debug, Error)]
pub enum BitlogError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Segment Errors
    // -------------------------------------------------------------------------
    /// A record header that can never have been written by this engine
    #[error("Corrupt record at offset {offset}: {reason}")]
    Corruption { offset: u64, reason: String },

    /// A record whose declared size runs past the end of the segment
    #[error("Truncated record at offset {offset}: needs {needed} bytes, {available} available")]
    TruncatedRecord {
        offset: u64,
        needed: u64,
        available: u64,
    },

    /// A header with a zero key size: space the file grew into but whose
    /// bytes never reached disk (a zero-filled tail after a crash)
    #[error("Unwritten record at offset {offset}: zero key size")]
    UnwrittenRecord { offset: u64 },

    #[error("Record key must not be empty")]
    EmptyKey,

    #[error("Record too large: key {key_size} bytes, value {value_size} bytes")]
    RecordTooLarge { key_size: usize, value_size: usize },

    // -------------------------------------------------------------------------
    // Index Errors
    // -------------------------------------------------------------------------
    /// The index points at an offset that no longer holds the key's Put record
    #[error("Stale index entry for key {key:?} at offset {offset}")]
    StaleIndex { key: Vec<u8>, offset: u64 },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BitlogError {
    /// Build a corruption error for the record starting at `offset`
    pub(crate) fn corruption(offset: u64, reason: impl Into<String>) -> Self {
        BitlogError::Corruption {
            offset,
            reason: reason.into(),
        }
    }

    /// True if this is a truncated-tail condition rather than a hard failure
    ///
    /// Covers records cut short by a crash and zero-filled space that was
    /// allocated but never written.
    pub fn is_truncated(&self) -> bool {
        matches!(
            self,
            BitlogError::TruncatedRecord { .. } | BitlogError::UnwrittenRecord { .. }
        )
    }
}
