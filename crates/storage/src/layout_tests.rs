// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn paths_are_deterministic() {
    let layout = FileLayout::new("/var/lib/evl/logging");
    let id = SourceIdentifier::with_secondary("10.0.0.7", "app");

    assert_eq!(layout.paths_for(&id), layout.paths_for(&id.clone()));
}

#[test]
fn data_and_index_share_stem() {
    let layout = FileLayout::new("/tmp/evl");
    let paths = layout.paths_for(&SourceIdentifier::new("host"));

    assert_eq!(paths.data.extension().unwrap(), "evl");
    assert_eq!(paths.index.extension().unwrap(), "idx");
    assert_eq!(paths.data.file_stem(), paths.index.file_stem());
    assert!(paths.data.starts_with("/tmp/evl"));
}

#[test]
fn unsafe_characters_are_replaced() {
    let stem = file_stem(&SourceIdentifier::new("../etc/passwd"));
    assert!(stem.starts_with(".._etc_passwd-"));
    assert!(!stem.contains('/'));
}

#[test]
fn colliding_sanitised_names_get_distinct_stems() {
    let a = file_stem(&SourceIdentifier::new("a/b"));
    let b = file_stem(&SourceIdentifier::new("a:b"));
    assert_ne!(a, b);
}

#[test]
fn secondary_is_part_of_identity() {
    let joined = file_stem(&SourceIdentifier::new("a-b"));
    let split = file_stem(&SourceIdentifier::with_secondary("a", "b"));
    assert_ne!(joined, split);
}

#[test]
fn remove_tolerates_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let paths = StorePaths::for_data(dir.path().join("gone.evl"));
    paths.remove().unwrap();

    std::fs::write(&paths.data, b"x").unwrap();
    paths.remove().unwrap();
    assert!(!paths.exists());
}
