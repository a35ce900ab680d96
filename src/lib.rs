//! # bitlog
//!
//! A single-file, append-only key-value store with:
//! - One log segment of length-prefixed records
//! - An in-memory index from each live key to its latest record
//! - Crash recovery by replaying the segment
//! - Merge (compaction) that rewrites only live records
//! - Single-writer/multi-reader concurrency model
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Engine                             │
//! │        put / delete / merge (write)   get (read)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  one RwLock
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  LogStore   │          │    Index    │
//!   │  (append)   │          │ key→offset  │
//!   └──────┬──────┘          └─────────────┘
//!          │
//!          ▼
//!   ┌─────────────┐
//!   │   Record    │
//!   │   codec     │
//!   └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod segment;
pub mod index;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{BitlogError, Result};
pub use config::{Config, SyncStrategy};
pub use engine::{Engine, MergeStats};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of bitlog
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
