// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn add_then_remove() {
    let registry = MemoryRegistry::new();
    let id = SourceIdentifier::new("a");

    registry.add_source(&id, Arc::new(1u32));
    assert_eq!(registry.sources(), vec![id.clone()]);
    assert_eq!(registry.get(&id).map(|s| *s), Some(1));

    registry.remove_source(&id);
    assert!(registry.is_empty());
}

#[test]
fn removing_unknown_source_is_noop() {
    let registry: MemoryRegistry<u32> = MemoryRegistry::new();
    registry.remove_source(&SourceIdentifier::new("missing"));
    assert!(registry.is_empty());
}

#[test]
fn sources_are_sorted() {
    let registry = MemoryRegistry::new();
    registry.add_source(&SourceIdentifier::new("b"), Arc::new(()));
    registry.add_source(&SourceIdentifier::new("a"), Arc::new(()));

    assert_eq!(
        registry.sources(),
        vec![SourceIdentifier::new("a"), SourceIdentifier::new("b")]
    );
}
