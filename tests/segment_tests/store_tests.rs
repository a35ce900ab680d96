//! Tests for the LogStore
//!
//! These tests verify:
//! - Open/create behavior and cursor resumption
//! - Contiguous, monotonically increasing append offsets
//! - Positional reads, end-of-log and truncated records
//! - Sequential iteration and truncation handling
//! - Sync strategies and renaming

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use bitlog::config::SyncStrategy;
use bitlog::segment::{LogStore, Record, HEADER_SIZE};
use bitlog::BitlogError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_segment() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.data");
    (temp_dir, path)
}

fn append_raw(path: &PathBuf, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
    file.sync_all().unwrap();
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_creates_file() {
    let (_temp, path) = setup_temp_segment();

    let store = LogStore::open(&path, SyncStrategy::EveryWrite).unwrap();

    assert!(path.exists());
    assert_eq!(store.len(), 0);
    assert!(store.is_empty());
    assert_eq!(store.path(), path.as_path());
}

#[test]
fn test_open_resumes_at_file_size() {
    let (_temp, path) = setup_temp_segment();

    {
        let mut store = LogStore::open(&path, SyncStrategy::EveryWrite).unwrap();
        store.append(&Record::put(b"a".to_vec(), b"1".to_vec())).unwrap();
        store.append(&Record::put(b"b".to_vec(), b"2".to_vec())).unwrap();
    }

    let mut store = LogStore::open(&path, SyncStrategy::EveryWrite).unwrap();
    assert_eq!(store.len(), 24);

    let offset = store.append(&Record::put(b"c".to_vec(), b"3".to_vec())).unwrap();
    assert_eq!(offset, 24);
    assert_eq!(fs::metadata(&path).unwrap().len(), 36);
}

#[test]
fn test_create_discards_existing_contents() {
    let (_temp, path) = setup_temp_segment();
    fs::write(&path, b"leftover scratch bytes").unwrap();

    let store = LogStore::create(&path, SyncStrategy::OsBuffered).unwrap();

    assert_eq!(store.len(), 0);
    assert_eq!(fs::metadata(&path).unwrap().len(), 0);
}

// =============================================================================
// Append Tests
// =============================================================================

#[test]
fn test_append_offsets_are_contiguous() {
    let (_temp, path) = setup_temp_segment();
    let mut store = LogStore::open(&path, SyncStrategy::EveryWrite).unwrap();

    let records = vec![
        Record::put(b"k1".to_vec(), b"v".to_vec()),
        Record::put(b"key2".to_vec(), vec![0u8; 100]),
        Record::delete(b"k1".to_vec()),
        Record::put(b"k3".to_vec(), Vec::<u8>::new()),
    ];

    let mut expected = 0u64;
    for record in &records {
        let offset = store.append(record).unwrap();
        assert_eq!(offset, expected);
        expected += record.encoded_size();
    }

    assert_eq!(store.len(), expected);
    assert_eq!(fs::metadata(&path).unwrap().len(), expected);
}

#[test]
fn test_append_then_read_back() {
    let (_temp, path) = setup_temp_segment();
    let mut store = LogStore::open(&path, SyncStrategy::EveryWrite).unwrap();

    let put = Record::put(b"hello".to_vec(), b"world".to_vec());
    let del = Record::delete(b"hello".to_vec());

    let put_at = store.append(&put).unwrap();
    let del_at = store.append(&del).unwrap();

    assert_eq!(store.read(put_at).unwrap(), Some(put));
    assert_eq!(store.read(del_at).unwrap(), Some(del));
}

#[test]
fn test_failed_append_leaves_cursor_unchanged() {
    let (_temp, path) = setup_temp_segment();
    let mut store = LogStore::open(&path, SyncStrategy::EveryWrite).unwrap();
    store.append(&Record::put(b"k".to_vec(), b"v".to_vec())).unwrap();

    let err = store.append(&Record::put(Vec::<u8>::new(), b"v".to_vec())).unwrap_err();

    assert!(matches!(err, BitlogError::EmptyKey));
    assert_eq!(store.len(), 12);
    assert_eq!(fs::metadata(&path).unwrap().len(), 12);
}

#[test]
fn test_append_with_every_n_writes() {
    let (_temp, path) = setup_temp_segment();
    let mut store = LogStore::open(&path, SyncStrategy::EveryNWrites { count: 3 }).unwrap();

    for i in 0..10 {
        store
            .append(&Record::put(format!("k{}", i).into_bytes(), b"v".to_vec()))
            .unwrap();
    }
    store.sync().unwrap();

    assert_eq!(store.iter().count(), 10);
}

#[test]
fn test_append_with_os_buffered() {
    let (_temp, path) = setup_temp_segment();
    let mut store = LogStore::open(&path, SyncStrategy::OsBuffered).unwrap();

    store.append(&Record::put(b"k".to_vec(), b"v".to_vec())).unwrap();

    assert_eq!(
        store.read(0).unwrap(),
        Some(Record::put(b"k".to_vec(), b"v".to_vec()))
    );
}

// =============================================================================
// Read Tests
// =============================================================================

#[test]
fn test_read_empty_is_end_of_log() {
    let (_temp, path) = setup_temp_segment();
    let store = LogStore::open(&path, SyncStrategy::EveryWrite).unwrap();

    assert_eq!(store.read(0).unwrap(), None);
}

#[test]
fn test_read_past_end_is_end_of_log() {
    let (_temp, path) = setup_temp_segment();
    let mut store = LogStore::open(&path, SyncStrategy::EveryWrite).unwrap();
    store.append(&Record::put(b"k".to_vec(), b"v".to_vec())).unwrap();
    let size = store.len();

    assert_eq!(store.read(size).unwrap(), None);
    assert_eq!(store.read(size + 1000).unwrap(), None);
}

#[test]
fn test_read_partial_header_is_end_of_log() {
    let (_temp, path) = setup_temp_segment();
    {
        let mut store = LogStore::open(&path, SyncStrategy::EveryWrite).unwrap();
        store.append(&Record::put(b"k".to_vec(), b"v".to_vec())).unwrap();
    }
    append_raw(&path, &[0, 0, 0]);

    let store = LogStore::open(&path, SyncStrategy::EveryWrite).unwrap();
    assert_eq!(store.read(12).unwrap(), None);
}

#[test]
fn test_read_truncated_payload() {
    let (_temp, path) = setup_temp_segment();
    let bytes = Record::put(b"key".to_vec(), b"a long value".to_vec())
        .encode()
        .unwrap();
    fs::write(&path, &bytes[..HEADER_SIZE + 5]).unwrap();

    let store = LogStore::open(&path, SyncStrategy::EveryWrite).unwrap();

    match store.read(0) {
        Err(BitlogError::TruncatedRecord {
            offset,
            needed,
            available,
        }) => {
            assert_eq!(offset, 0);
            assert_eq!(needed, bytes.len() as u64);
            assert_eq!(available, (HEADER_SIZE + 5) as u64);
        }
        other => panic!("expected truncated record, got {:?}", other),
    }
}

#[test]
fn test_read_invalid_mark_is_corruption() {
    let (_temp, path) = setup_temp_segment();
    let mut bytes = Record::put(b"k".to_vec(), b"v".to_vec()).encode().unwrap().to_vec();
    bytes[8] = 0x12;
    fs::write(&path, &bytes).unwrap();

    let store = LogStore::open(&path, SyncStrategy::EveryWrite).unwrap();

    assert!(matches!(
        store.read(0),
        Err(BitlogError::Corruption { offset: 0, .. })
    ));
}

// =============================================================================
// Iterator Tests
// =============================================================================

#[test]
fn test_iter_yields_records_in_order() {
    let (_temp, path) = setup_temp_segment();
    let mut store = LogStore::open(&path, SyncStrategy::EveryWrite).unwrap();

    let mut expected = Vec::new();
    for i in 0..5 {
        let record = Record::put(format!("key{}", i).into_bytes(), vec![i as u8; i]);
        let offset = store.append(&record).unwrap();
        expected.push((offset, record));
    }

    let scanned: Vec<_> = store.iter().map(|item| item.unwrap()).collect();
    assert_eq!(scanned, expected);
}

#[test]
fn test_iter_stops_at_truncated_tail() {
    let (_temp, path) = setup_temp_segment();
    {
        let mut store = LogStore::open(&path, SyncStrategy::EveryWrite).unwrap();
        store.append(&Record::put(b"a".to_vec(), b"1".to_vec())).unwrap();
        store.append(&Record::put(b"b".to_vec(), b"2".to_vec())).unwrap();
    }
    let tail = Record::put(b"c".to_vec(), b"333333".to_vec()).encode().unwrap();
    append_raw(&path, &tail[..tail.len() - 3]);

    let store = LogStore::open(&path, SyncStrategy::EveryWrite).unwrap();
    let mut iter = store.iter();

    assert!(iter.next().unwrap().is_ok());
    assert!(iter.next().unwrap().is_ok());
    assert!(iter.next().is_none());
    assert_eq!(iter.truncated_at(), Some(24));
    assert_eq!(iter.position(), 24);
}

#[test]
fn test_iter_stops_at_zero_filled_tail() {
    let (_temp, path) = setup_temp_segment();
    {
        let mut store = LogStore::open(&path, SyncStrategy::EveryWrite).unwrap();
        store.append(&Record::put(b"a".to_vec(), b"1".to_vec())).unwrap();
    }
    append_raw(&path, &[0u8; 16]);

    let store = LogStore::open(&path, SyncStrategy::EveryWrite).unwrap();
    assert!(matches!(
        store.read(12),
        Err(BitlogError::UnwrittenRecord { offset: 12 })
    ));

    let mut iter = store.iter();
    assert!(iter.next().unwrap().is_ok());
    assert!(iter.next().is_none());
    assert_eq!(iter.truncated_at(), Some(12));
    assert_eq!(iter.position(), 12);
}

#[test]
fn test_iter_surfaces_corruption() {
    let (_temp, path) = setup_temp_segment();
    {
        let mut store = LogStore::open(&path, SyncStrategy::EveryWrite).unwrap();
        store.append(&Record::put(b"a".to_vec(), b"1".to_vec())).unwrap();
    }
    append_raw(&path, &[0, 0, 0, 1, 0, 0, 0, 0, 0, 9, b'x']);

    let store = LogStore::open(&path, SyncStrategy::EveryWrite).unwrap();
    let items: Vec<_> = store.iter().collect();

    assert_eq!(items.len(), 2);
    assert!(items[0].is_ok());
    assert!(matches!(
        items[1],
        Err(BitlogError::Corruption { offset: 12, .. })
    ));
}

// =============================================================================
// Truncate / Rename Tests
// =============================================================================

#[test]
fn test_truncate_drops_tail_and_resumes() {
    let (_temp, path) = setup_temp_segment();
    let mut store = LogStore::open(&path, SyncStrategy::EveryWrite).unwrap();
    store.append(&Record::put(b"a".to_vec(), b"1".to_vec())).unwrap();
    store.append(&Record::put(b"b".to_vec(), b"2".to_vec())).unwrap();

    store.truncate(12).unwrap();

    assert_eq!(store.len(), 12);
    assert_eq!(fs::metadata(&path).unwrap().len(), 12);
    assert_eq!(store.read(12).unwrap(), None);
    assert_eq!(
        store.append(&Record::put(b"c".to_vec(), b"3".to_vec())).unwrap(),
        12
    );
}

#[test]
fn test_rename_keeps_store_usable() {
    let temp = TempDir::new().unwrap();
    let from = temp.path().join("scratch.data");
    let to = temp.path().join("final.data");

    let mut store = LogStore::create(&from, SyncStrategy::OsBuffered).unwrap();
    store.append(&Record::put(b"a".to_vec(), b"1".to_vec())).unwrap();

    store.rename(&to).unwrap();

    assert!(!from.exists());
    assert!(to.exists());
    assert_eq!(store.path(), to.as_path());

    let offset = store.append(&Record::put(b"b".to_vec(), b"2".to_vec())).unwrap();
    store.sync().unwrap();
    assert_eq!(offset, 12);
    assert_eq!(fs::metadata(&to).unwrap().len(), 24);
    assert_eq!(
        store.read(offset).unwrap(),
        Some(Record::put(b"b".to_vec(), b"2".to_vec()))
    );
}
