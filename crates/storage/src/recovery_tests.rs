// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::header::Layout;
use proptest::prelude::*;
use std::io::Write;
use tempfile::TempDir;

struct Files {
    _dir: TempDir,
    data: std::path::PathBuf,
    index: std::path::PathBuf,
}

fn files() -> Files {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("source.evl");
    let index = dir.path().join("source.idx");
    Files {
        _dir: dir,
        data,
        index,
    }
}

/// Write a data file by hand, without maintaining an index
fn write_data(path: &Path, layout: Layout, records: &[(u64, &[u8])]) {
    let mut file = File::create(path).unwrap();
    file.write_all(&FileHeader::new(layout).to_bytes()).unwrap();
    for (sequence, payload) in records {
        file.write_all(&record::encode(layout, *sequence, payload))
            .unwrap();
    }
}

fn slots(path: &Path) -> Vec<Option<u64>> {
    let mut index = IndexFile::open_read_only(path).unwrap();
    let len = index.len().unwrap();
    (0..len).map(|n| index.get(n).unwrap()).collect()
}

#[test]
fn rebuild_records_dense_offsets() {
    let f = files();
    let payloads: [&[u8]; 3] = [b"aaaaa", b"", b"cccccccccccc"];
    let records: Vec<_> = payloads.iter().map(|p| (0, *p)).collect();
    write_data(&f.data, Layout::Dense, &records);

    assert_eq!(rebuild_index(&f.data, &f.index).unwrap(), 3);
    assert_eq!(slots(&f.index), vec![Some(16), Some(25), Some(29)]);
}

#[test]
fn rebuild_is_idempotent() {
    let f = files();
    write_data(&f.data, Layout::Dense, &[(0, b"one"), (0, b"two")]);

    rebuild_index(&f.data, &f.index).unwrap();
    let first = std::fs::read(&f.index).unwrap();
    rebuild_index(&f.data, &f.index).unwrap();
    let second = std::fs::read(&f.index).unwrap();

    assert_eq!(first, second);
}

#[test]
fn rebuild_of_empty_store_has_no_slots() {
    let f = files();
    write_data(&f.data, Layout::Dense, &[]);

    assert_eq!(rebuild_index(&f.data, &f.index).unwrap(), 0);
    assert!(slots(&f.index).is_empty());
}

#[test]
fn rebuild_places_sparse_records_by_sequence() {
    let f = files();
    write_data(&f.data, Layout::Sparse, &[(1, b"x"), (3, b"y")]);

    assert_eq!(rebuild_index(&f.data, &f.index).unwrap(), 2);
    // 16 header, then [len 4][seq 8][1 byte] per record
    assert_eq!(slots(&f.index), vec![None, Some(16), None, Some(29)]);
}

#[test]
fn torn_tail_aborts_rebuild_and_removes_index() {
    let f = files();
    write_data(&f.data, Layout::Dense, &[(0, b"whole")]);
    let mut file = OpenOptions::new().append(true).open(&f.data).unwrap();
    file.write_all(&[0, 0, 0, 8, b'p']).unwrap();
    drop(file);

    let err = rebuild_index(&f.data, &f.index).unwrap_err();
    assert!(matches!(err, StorageError::ShortRead { .. }));
    assert!(err.is_transient());
    assert!(!f.index.exists());
}

#[test]
fn torn_length_prefix_is_a_short_read() {
    let f = files();
    write_data(&f.data, Layout::Dense, &[(0, b"whole")]);
    let mut file = OpenOptions::new().append(true).open(&f.data).unwrap();
    file.write_all(&[0, 0]).unwrap();
    drop(file);

    assert!(matches!(
        rebuild_index(&f.data, &f.index),
        Err(StorageError::ShortRead { .. })
    ));
}

#[test]
fn repair_tail_truncates_to_last_complete_record() {
    let f = files();
    write_data(&f.data, Layout::Dense, &[(0, b"whole")]);
    let complete = std::fs::metadata(&f.data).unwrap().len();
    let mut file = OpenOptions::new().append(true).open(&f.data).unwrap();
    file.write_all(&[0, 0, 0, 8, b'p']).unwrap();
    drop(file);

    assert_eq!(repair_tail(&f.data).unwrap(), Some(complete));
    assert_eq!(std::fs::metadata(&f.data).unwrap().len(), complete);
    assert_eq!(repair_tail(&f.data).unwrap(), None);
    assert_eq!(rebuild_index(&f.data, &f.index).unwrap(), 1);
}

#[test]
fn corrupt_header_fails_rebuild() {
    let f = files();
    std::fs::write(&f.data, b"NOPE\0\0\0\0\0\0\0\0\0\0\0\x10").unwrap();

    assert!(matches!(
        rebuild_index(&f.data, &f.index),
        Err(StorageError::CorruptHeader(_))
    ));
    assert!(!f.index.exists());
}

#[test]
fn oversized_length_is_corrupt_record() {
    let f = files();
    write_data(&f.data, Layout::Dense, &[]);
    let mut file = OpenOptions::new().append(true).open(&f.data).unwrap();
    file.write_all(&u32::MAX.to_be_bytes()).unwrap();
    drop(file);

    let err = rebuild_index(&f.data, &f.index).unwrap_err();
    assert!(matches!(err, StorageError::CorruptRecord { .. }));
    assert!(!err.is_transient());
}

#[test]
fn unaddressable_sequence_is_corrupt_record() {
    let f = files();
    write_data(&f.data, Layout::Sparse, &[(0, b"a"), (u64::MAX, b"b")]);

    let err = rebuild_index(&f.data, &f.index).unwrap_err();
    assert!(matches!(err, StorageError::CorruptRecord { .. }));
    assert!(!f.index.exists());
}

#[test]
fn stale_when_index_missing() {
    let f = files();
    assert!(!index_is_stale(&f.data, &f.index).unwrap());

    write_data(&f.data, Layout::Dense, &[(0, b"a")]);
    assert!(index_is_stale(&f.data, &f.index).unwrap());

    rebuild_index(&f.data, &f.index).unwrap();
    assert!(!index_is_stale(&f.data, &f.index).unwrap());
}

proptest! {
    #[test]
    fn rebuilt_index_matches_live_index(
        payloads in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..64), 0..32)
    ) {
        let dir = TempDir::new().unwrap();
        let paths = crate::layout::StorePaths::for_data(dir.path().join("live.evl"));
        let store = crate::store::EventStore::new(paths.clone(), Default::default());
        for payload in &payloads {
            store.append(payload).unwrap();
        }
        let live = if payloads.is_empty() {
            Vec::new()
        } else {
            std::fs::read(&paths.index).unwrap()
        };

        let rebuilt_path = dir.path().join("rebuilt.idx");
        if !payloads.is_empty() {
            prop_assert_eq!(rebuild_index(&paths.data, &rebuilt_path).unwrap(), payloads.len() as u64);
            prop_assert_eq!(std::fs::read(&rebuilt_path).unwrap(), live);
        }
    }
}
