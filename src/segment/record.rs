//! Segment record definitions
//!
//! Defines the structure of individual log records and their byte layout.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{BitlogError, Result};

/// Size of the fixed record header: key size (4) + value size (4) + mark (2)
pub const HEADER_SIZE: usize = 10;

/// What a record means for its key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Mark {
    /// The record carries the key's current value
    Put = 0,

    /// Tombstone: the key was deleted
    Delete = 1,
}

impl Mark {
    /// Convert a raw mark, `None` for anything outside {Put, Delete}
    pub fn from_u16(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(Mark::Put),
            1 => Some(Mark::Delete),
            _ => None,
        }
    }
}

/// Decoded record header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub key_size: u32,
    pub value_size: u32,
    pub mark: Mark,
}

impl RecordHeader {
    /// Decode a header without touching the payload.
    ///
    /// `offset` is only used to locate the record in error messages.
    pub fn decode(mut buf: &[u8], offset: u64) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(BitlogError::TruncatedRecord {
                offset,
                needed: HEADER_SIZE as u64,
                available: buf.len() as u64,
            });
        }

        let key_size = buf.get_u32();
        let value_size = buf.get_u32();
        let raw_mark = buf.get_u16();

        // Empty keys are never appended; a zero key size means the bytes
        // were never written, which ends the readable log
        if key_size == 0 {
            return Err(BitlogError::UnwrittenRecord { offset });
        }

        let mark = Mark::from_u16(raw_mark)
            .ok_or_else(|| BitlogError::corruption(offset, format!("invalid mark {}", raw_mark)))?;

        // Tombstones never carry a value
        if mark == Mark::Delete && value_size != 0 {
            return Err(BitlogError::corruption(
                offset,
                format!("tombstone with value size {}", value_size),
            ));
        }

        Ok(Self {
            key_size,
            value_size,
            mark,
        })
    }

    /// Payload length (key + value) following the header
    pub fn payload_size(&self) -> u64 {
        self.key_size as u64 + self.value_size as u64
    }

    /// Total on-disk size of the record this header starts
    pub fn encoded_size(&self) -> u64 {
        HEADER_SIZE as u64 + self.payload_size()
    }
}

/// A single record in the segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Vec<u8>,

    /// Empty for tombstones
    pub value: Vec<u8>,

    pub mark: Mark,
}

impl Record {
    /// Create a Put record
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            mark: Mark::Put,
        }
    }

    /// Create a Delete tombstone
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: Vec::new(),
            mark: Mark::Delete,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.mark == Mark::Delete
    }

    pub fn key_size(&self) -> u32 {
        self.key.len() as u32
    }

    pub fn value_size(&self) -> u32 {
        self.value.len() as u32
    }

    /// On-disk size: header + key + value
    pub fn encoded_size(&self) -> u64 {
        (HEADER_SIZE + self.key.len() + self.value.len()) as u64
    }

    /// Header describing this record
    pub fn header(&self) -> RecordHeader {
        RecordHeader {
            key_size: self.key_size(),
            value_size: self.value_size(),
            mark: self.mark,
        }
    }

    /// Serialize to `[key_size][value_size][mark][key][value]`, big-endian
    pub fn encode(&self) -> Result<Bytes> {
        if self.key.is_empty() {
            return Err(BitlogError::EmptyKey);
        }
        if self.key.len() > u32::MAX as usize || self.value.len() > u32::MAX as usize {
            return Err(BitlogError::RecordTooLarge {
                key_size: self.key.len(),
                value_size: self.value.len(),
            });
        }

        let mut buf = BytesMut::with_capacity(self.encoded_size() as usize);
        buf.put_u32(self.key_size());
        buf.put_u32(self.value_size());
        buf.put_u16(self.mark as u16);
        buf.put_slice(&self.key);
        buf.put_slice(&self.value);

        Ok(buf.freeze())
    }

    /// Deserialize one record from the front of `buf`
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let header = RecordHeader::decode(buf, 0)?;

        let total = header.encoded_size();
        if (buf.len() as u64) < total {
            return Err(BitlogError::TruncatedRecord {
                offset: 0,
                needed: total,
                available: buf.len() as u64,
            });
        }

        let key_end = HEADER_SIZE + header.key_size as usize;
        let value_end = key_end + header.value_size as usize;

        Ok(Self {
            key: buf[HEADER_SIZE..key_end].to_vec(),
            value: buf[key_end..value_end].to_vec(),
            mark: header.mark,
        })
    }
}
