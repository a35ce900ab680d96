//! Log Store
//!
//! Owns one segment file: positional reads and append-only writes.

use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::SyncStrategy;
use crate::error::{BitlogError, Result};

use super::record::{Record, RecordHeader, HEADER_SIZE};

/// Append-only segment file with a write cursor
///
/// The cursor always equals the file length: it starts at the file size on
/// open and only moves forward by whole records. Reads never look past it.
pub struct LogStore {
    /// Segment file handle (read + write, never opened in append mode)
    file: File,

    /// Where the segment lives
    path: PathBuf,

    /// Bytes written so far == start offset of the next record
    offset: u64,

    /// When appends are fsynced
    sync_strategy: SyncStrategy,

    /// Appends since the last fsync
    unsynced: usize,
}

impl LogStore {
    /// Open or create a segment, resuming at its current length
    pub fn open(path: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;

        let offset = file.metadata()?.len();

        tracing::debug!(path = %path.display(), size = offset, "opened segment");

        Ok(Self {
            file,
            path: path.to_path_buf(),
            offset,
            sync_strategy,
            unsynced: 0,
        })
    }

    /// Create an empty segment, discarding anything already at `path`
    pub fn create(path: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            offset: 0,
            sync_strategy,
            unsynced: 0,
        })
    }

    /// Read the record starting at `offset`
    ///
    /// Returns:
    /// - `Ok(Some(record))` — a complete record
    /// - `Ok(None)` — end of log: fewer than `HEADER_SIZE` bytes remain
    /// - `Err(TruncatedRecord)` — the header promises more bytes than exist
    /// - `Err(UnwrittenRecord)` — the header is zero-filled (zero key size)
    /// - `Err(Corruption)` — the header itself is invalid
    pub fn read(&self, offset: u64) -> Result<Option<Record>> {
        if offset.saturating_add(HEADER_SIZE as u64) > self.offset {
            return Ok(None);
        }

        let mut header_buf = [0u8; HEADER_SIZE];
        match read_exact_at(&self.file, &mut header_buf, offset) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let header = RecordHeader::decode(&header_buf, offset)?;

        let available = self.offset - offset;
        let needed = header.encoded_size();
        if needed > available {
            return Err(BitlogError::TruncatedRecord {
                offset,
                needed,
                available,
            });
        }

        let mut payload = vec![0u8; header.payload_size() as usize];
        match read_exact_at(&self.file, &mut payload, offset + HEADER_SIZE as u64) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(BitlogError::TruncatedRecord {
                    offset,
                    needed,
                    available,
                });
            }
            Err(e) => return Err(e.into()),
        }

        let value = payload.split_off(header.key_size as usize);

        Ok(Some(Record {
            key: payload,
            value,
            mark: header.mark,
        }))
    }

    /// Append a record at the cursor, returning the offset it was written at
    ///
    /// The cursor only advances once the whole record is written (and synced,
    /// if the strategy asks for it). On failure the file is cut back to the
    /// old cursor so no partial bytes are left behind.
    pub fn append(&mut self, record: &Record) -> Result<u64> {
        let buf = record.encode()?;
        let offset = self.offset;

        if let Err(e) = self.write_at(offset, &buf) {
            self.rollback(offset);
            return Err(e.into());
        }

        self.offset += buf.len() as u64;
        Ok(offset)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Cut the segment back to `len` bytes (drops an unreadable tail)
    pub fn truncate(&mut self, len: u64) -> Result<()> {
        self.file.set_len(len)?;
        self.file.sync_all()?;
        self.offset = len;
        self.unsynced = 0;
        Ok(())
    }

    /// Move the segment file to `to`, replacing whatever is there
    ///
    /// The open handle keeps pointing at the same file, so the store stays
    /// usable under its new name.
    pub fn rename(&mut self, to: &Path) -> Result<()> {
        std::fs::rename(&self.path, to)?;
        self.path = to.to_path_buf();
        Ok(())
    }

    pub fn set_sync_strategy(&mut self, sync_strategy: SyncStrategy) {
        self.sync_strategy = sync_strategy;
    }

    /// Iterate over all records from offset 0
    pub fn iter(&self) -> SegmentIter<'_> {
        SegmentIter {
            store: self,
            offset: 0,
            truncated_at: None,
            done: false,
        }
    }

    /// Current write cursor (== segment length)
    pub fn len(&self) -> u64 {
        self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.offset == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)?;
        self.unsynced += 1;

        let due = match self.sync_strategy {
            SyncStrategy::EveryWrite => true,
            SyncStrategy::EveryNWrites { count } => self.unsynced >= count,
            SyncStrategy::OsBuffered => false,
        };
        if due {
            self.file.sync_all()?;
            self.unsynced = 0;
        }

        Ok(())
    }

    fn rollback(&mut self, offset: u64) {
        if let Err(e) = self.file.set_len(offset) {
            tracing::warn!(
                path = %self.path.display(),
                offset,
                error = %e,
                "failed to cut back partial append"
            );
        }
    }
}

/// Sequential scan over a segment
///
/// Stops cleanly at the end of the log or at a truncated or unwritten
/// record; the latter is remembered in `truncated_at` instead of being
/// yielded as an error.
pub struct SegmentIter<'a> {
    store: &'a LogStore,
    offset: u64,
    truncated_at: Option<u64>,
    done: bool,
}

impl<'a> SegmentIter<'a> {
    /// Offset just past the last record yielded so far
    pub fn position(&self) -> u64 {
        self.offset
    }

    /// Offset of a truncated record that ended the scan, if any
    pub fn truncated_at(&self) -> Option<u64> {
        self.truncated_at
    }
}

impl<'a> Iterator for SegmentIter<'a> {
    type Item = Result<(u64, Record)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.store.read(self.offset) {
            Ok(Some(record)) => {
                let at = self.offset;
                self.offset += record.encoded_size();
                Some(Ok((at, record)))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) if e.is_truncated() => {
                self.truncated_at = Some(self.offset);
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;

    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ))
            }
            Ok(n) => {
                buf = &mut std::mem::take(&mut buf)[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
