//! Segment Module
//!
//! The append-only log file and everything needed to read it back.
//!
//! ## Responsibilities
//! - Encode/decode individual records
//! - Append records at a monotonically increasing cursor
//! - Positional reads for point lookups
//! - Sequential replay for recovery and merge
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ Record 1 (offset 0)                                  │
//! │ ┌──────────┬────────────┬──────────┬─────┬─────────┐ │
//! │ │KeySize(4)│ValueSize(4)│ Mark (2) │ Key │  Value  │ │
//! │ └──────────┴────────────┴──────────┴─────┴─────────┘ │
//! ├──────────────────────────────────────────────────────┤
//! │ Record 2 (offset = encoded size of record 1)         │
//! │ ...                                                  │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are big-endian. Mark is 0 for Put, 1 for Delete; tombstones
//! have an empty value. There is no checksum.

mod record;
mod store;
mod recovery;

pub use record::{Mark, Record, RecordHeader, HEADER_SIZE};
pub use store::{LogStore, SegmentIter};
pub use recovery::{Recovery, RecoveryResult};
