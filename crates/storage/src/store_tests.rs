// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write as _;
use tempfile::TempDir;

const HEADER_LEN_WITH_META: u64 = crate::header::HEADER_LEN + 4;

fn paths(dir: &TempDir) -> StorePaths {
    StorePaths::for_data(dir.path().join("source.evl"))
}

fn dense(dir: &TempDir) -> EventStore {
    EventStore::new(paths(dir), StoreOptions::default())
}

fn sparse(dir: &TempDir) -> EventStore {
    EventStore::new(paths(dir), StoreOptions::new(Layout::Sparse))
}

#[test]
fn new_store_touches_no_files() {
    let dir = TempDir::new().unwrap();
    let store = dense(&dir);

    assert!(!store.paths().exists());
    assert_eq!(store.size().unwrap(), 0);
    assert_eq!(store.get(0).unwrap(), None);
    assert!(!store.paths().data.exists());
}

#[test]
fn append_numbers_records_densely() {
    let dir = TempDir::new().unwrap();
    let store = dense(&dir);

    assert_eq!(store.append(b"first").unwrap(), 0);
    assert_eq!(store.append(b"").unwrap(), 1);
    assert_eq!(store.append(b"third").unwrap(), 2);

    assert_eq!(store.size().unwrap(), 3);
    assert_eq!(store.get(0).unwrap(), Some(b"first".to_vec()));
    assert_eq!(store.get(1).unwrap(), Some(Vec::new()));
    assert_eq!(store.get(2).unwrap(), Some(b"third".to_vec()));
    assert_eq!(store.get(3).unwrap(), None);
}

#[test]
fn first_record_starts_at_data_offset() {
    let dir = TempDir::new().unwrap();
    let store = EventStore::new(
        paths(&dir),
        StoreOptions::default().with_metadata(b"meta".to_vec()),
    );
    store.append(b"x").unwrap();

    let header = store.header().unwrap();
    assert_eq!(header.data_offset, HEADER_LEN_WITH_META);
    assert_eq!(header.metadata, b"meta");

    let mut index = IndexFile::open_read_only(&store.paths().index).unwrap();
    assert_eq!(index.get(0).unwrap(), Some(HEADER_LEN_WITH_META));
}

#[test]
fn append_records_writes_batch_in_order() {
    let dir = TempDir::new().unwrap();
    let store = dense(&dir);
    let batch: Vec<(Option<u64>, &[u8])> = vec![(None, b"a"), (None, b"b"), (None, b"c")];

    assert_eq!(store.append_records(batch).unwrap(), 2);
    let payloads: Vec<_> = (0..3).map(|n| store.get(n).unwrap().unwrap()).collect();
    assert_eq!(payloads, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
}

#[test]
fn dense_store_rejects_explicit_sequence() {
    let dir = TempDir::new().unwrap();
    let store = dense(&dir);

    assert!(matches!(
        store.append_with_sequence(5, b"x"),
        Err(StorageError::LayoutMismatch)
    ));
}

#[test]
fn sparse_store_leaves_gaps() {
    let dir = TempDir::new().unwrap();
    let store = sparse(&dir);

    store.append_with_sequence(1, b"one").unwrap();
    store.append_with_sequence(4, b"four").unwrap();

    assert_eq!(store.size().unwrap(), 5);
    assert_eq!(store.get(0).unwrap(), None);
    assert_eq!(store.get(1).unwrap(), Some(b"one".to_vec()));
    assert_eq!(store.get(2).unwrap(), None);
    assert_eq!(store.get(4).unwrap(), Some(b"four".to_vec()));
}

#[test]
fn sequence_beyond_cap_is_rejected_without_writing() {
    let dir = TempDir::new().unwrap();
    let store = EventStore::new(
        paths(&dir),
        StoreOptions::new(Layout::Sparse).with_max_sequence(100),
    );
    let batch: Vec<(Option<u64>, &[u8])> = vec![(Some(1), b"ok"), (Some(101), b"far")];

    let err = store.append_records(batch).unwrap_err();
    assert!(matches!(
        err,
        StorageError::SequenceOutOfRange { number: 101, max: 100 }
    ));
    // nothing from the rejected batch reached the files
    assert_eq!(store.size().unwrap(), 0);
    assert_eq!(store.get(1).unwrap(), None);

    assert_eq!(store.append_with_sequence(100, b"edge").unwrap(), 100);
}

#[test]
fn largest_sequence_does_not_overflow() {
    let dir = TempDir::new().unwrap();
    let store = sparse(&dir);

    let err = store.append_with_sequence(i64::MAX as u64, b"x").unwrap_err();
    assert!(matches!(err, StorageError::SequenceOutOfRange { .. }));
    assert!(!err.is_transient());

    let max = StoreOptions::default().with_max_sequence(u64::MAX).max_sequence;
    assert_eq!(max, MAX_RECORD_NUMBER);
}

#[test]
fn sparse_append_without_sequence_follows_highest() {
    let dir = TempDir::new().unwrap();
    let store = sparse(&dir);

    store.append_with_sequence(3, b"three").unwrap();
    assert_eq!(store.append(b"next").unwrap(), 4);
}

#[test]
fn reopen_continues_numbering() {
    let dir = TempDir::new().unwrap();
    {
        let store = dense(&dir);
        store.append(b"a").unwrap();
        store.append(b"b").unwrap();
    }

    let store = dense(&dir);
    assert_eq!(store.append(b"c").unwrap(), 2);
    assert_eq!(store.get(0).unwrap(), Some(b"a".to_vec()));
    assert_eq!(store.get(2).unwrap(), Some(b"c".to_vec()));
}

#[test]
fn reopen_after_torn_write_truncates_tail() {
    let dir = TempDir::new().unwrap();
    {
        let store = dense(&dir);
        store.append(b"kept").unwrap();
    }
    // Length prefix promising 10 bytes, followed by 3
    let mut file = OpenOptions::new()
        .append(true)
        .open(dir.path().join("source.evl"))
        .unwrap();
    file.write_all(&[0, 0, 0, 10, 1, 2, 3]).unwrap();
    drop(file);

    let store = dense(&dir);
    assert_eq!(store.append(b"after").unwrap(), 1);
    assert_eq!(store.get(0).unwrap(), Some(b"kept".to_vec()));
    assert_eq!(store.get(1).unwrap(), Some(b"after".to_vec()));
}

#[test]
fn reader_sees_writer_appends() {
    let dir = TempDir::new().unwrap();
    let writer = dense(&dir);
    let reader = dense(&dir);

    writer.append(b"a").unwrap();
    assert_eq!(reader.size().unwrap(), 1);

    writer.append(b"b").unwrap();
    assert_eq!(reader.size().unwrap(), 2);
    assert_eq!(reader.get(1).unwrap(), Some(b"b".to_vec()));
}

#[test]
fn missing_index_is_rebuilt_on_open() {
    let dir = TempDir::new().unwrap();
    {
        let store = dense(&dir);
        store.append(b"a").unwrap();
        store.append(b"bb").unwrap();
    }
    std::fs::remove_file(dir.path().join("source.idx")).unwrap();

    let reader = dense(&dir);
    assert_eq!(reader.size().unwrap(), 2);
    assert_eq!(reader.get(1).unwrap(), Some(b"bb".to_vec()));
}

#[test]
fn refresh_rebuilds_index_for_reader() {
    let dir = TempDir::new().unwrap();
    let writer = dense(&dir);
    writer.append(b"a").unwrap();

    let reader = dense(&dir);
    assert_eq!(reader.size().unwrap(), 1);
    assert!(!reader.refresh().unwrap());

    std::fs::remove_file(dir.path().join("source.idx")).unwrap();
    assert!(reader.refresh().unwrap());
    assert_eq!(reader.size().unwrap(), 1);
    assert_eq!(reader.get(0).unwrap(), Some(b"a".to_vec()));
}

#[test]
fn refresh_skips_writable_store() {
    let dir = TempDir::new().unwrap();
    let writer = dense(&dir);
    writer.append(b"a").unwrap();
    std::fs::remove_file(dir.path().join("source.idx")).unwrap();

    assert!(!writer.refresh().unwrap());
}

#[test]
fn disposed_store_rejects_appends() {
    let dir = TempDir::new().unwrap();
    let store = dense(&dir);
    store.append(b"a").unwrap();
    store.dispose();

    assert!(store.is_disposed());
    assert!(matches!(store.append(b"b"), Err(StorageError::Disposed)));
    assert!(matches!(store.get(0), Err(StorageError::Disposed)));
    assert_eq!(store.size().unwrap(), 1);
}

#[test]
fn delete_files_removes_data_and_index() {
    let dir = TempDir::new().unwrap();
    let store = dense(&dir);
    store.append(b"a").unwrap();
    assert!(store.paths().exists());

    store.delete_files().unwrap();
    assert!(!store.paths().data.exists());
    assert!(!store.paths().index.exists());
    assert!(store.is_disposed());
}

#[test]
fn event_sequence_view() {
    let dir = TempDir::new().unwrap();
    let store = dense(&dir);
    store.append(b"a").unwrap();

    let sequence: &dyn EventSequence<Vec<u8>> = &store;
    assert_eq!(sequence.len(), 1);
    assert_eq!(sequence.get(0), Some(b"a".to_vec()));
    assert_eq!(sequence.get(1), None);
    assert!(!sequence.is_disposed());
}

#[test]
fn torn_record_is_unreadable_not_a_gap() {
    let dir = TempDir::new().unwrap();
    let store = dense(&dir);
    store.append(b"a").unwrap();
    store.append(b"bbbbbbbb").unwrap();

    let reader = dense(&dir);
    assert_eq!(reader.get(0).unwrap(), Some(b"a".to_vec()));
    let data = std::fs::OpenOptions::new()
        .write(true)
        .open(dir.path().join("source.evl"))
        .unwrap();
    let len = data.metadata().unwrap().len();
    data.set_len(len - 3).unwrap();

    let err = EventSequence::try_get(&reader, 1).unwrap_err();
    assert_eq!(err.index, 1);
    assert_eq!(EventSequence::get(&reader, 1), None);
    assert_eq!(EventSequence::try_get(&reader, 0).unwrap(), Some(b"a".to_vec()));
    assert_eq!(EventSequence::try_get(&reader, 7).unwrap(), None);
}

#[test]
fn event_sequence_len_survives_corrupt_file() {
    let dir = TempDir::new().unwrap();
    let store = dense(&dir);
    store.append(b"a").unwrap();
    store.append(b"b").unwrap();

    let reader = dense(&dir);
    assert_eq!(EventSequence::len(&reader), 2);

    std::fs::write(dir.path().join("source.evl"), b"garbage").unwrap();
    std::fs::remove_file(dir.path().join("source.idx")).unwrap();
    assert!(reader.refresh().is_err());
    assert_eq!(EventSequence::len(&reader), 2);
}

#[test]
fn oversized_record_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = dense(&dir);
    let payload = vec![0u8; MAX_RECORD_LEN as usize + 1];

    assert!(matches!(
        store.append(&payload),
        Err(StorageError::RecordTooLarge(_))
    ));
}
