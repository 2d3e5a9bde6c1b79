// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use evl_core::{Decoder, Encoder, FakeRegistry, JsonCodec, MemoryRegistry, RegistryCall};
use proptest::prelude::*;
use tempfile::TempDir;

type TestCodec = JsonCodec<EventWrapper<String>>;

fn router(dir: &TempDir) -> SourceRouter<String, TestCodec, FakeRegistry> {
    SourceRouter::new(
        FileLayout::new(dir.path()),
        StoreOptions::default(),
        Arc::new(JsonCodec::new()),
        FakeRegistry::new(),
    )
}

fn id(name: &str) -> SourceIdentifier {
    SourceIdentifier::new(name)
}

fn event(source: &str, local_id: i64) -> EventWrapper<String> {
    EventWrapper::new(id(source), local_id, format!("{source}-{local_id}"))
}

fn end(source: &str, local_id: i64) -> EventWrapper<String> {
    EventWrapper::end_of_stream(id(source), local_id)
}

fn stored(router: &SourceRouter<String, TestCodec, FakeRegistry>, source: &str) -> Vec<EventWrapper<String>> {
    let store = router.store(&id(source)).unwrap();
    let len = store.size().unwrap();
    (0..len).filter_map(|n| store.get(n).unwrap()).collect()
}

#[test]
fn events_land_in_their_source_store() {
    let dir = TempDir::new().unwrap();
    let router = router(&dir);

    let report = router.route(vec![event("a", 1), event("b", 1), event("a", 2)]);

    assert!(report.is_ok());
    assert_eq!(report.appended, 3);
    assert_eq!(report.created, 2);
    assert_eq!(stored(&router, "a"), vec![event("a", 1), event("a", 2)]);
    assert_eq!(stored(&router, "b"), vec![event("b", 1)]);
    assert_eq!(router.active_sources(), vec![id("a"), id("b")]);
}

#[test]
fn registry_hears_about_new_sources_once() {
    let dir = TempDir::new().unwrap();
    let router = router(&dir);

    router.route(vec![event("a", 1)]);
    router.route(vec![event("a", 2)]);

    assert_eq!(router.registry().added(), vec![id("a")]);
}

#[test]
fn later_batches_append_to_existing_store() {
    let dir = TempDir::new().unwrap();
    let router = router(&dir);

    router.route(vec![event("a", 1)]);
    let report = router.route(vec![event("a", 2)]);

    assert_eq!(report.created, 0);
    assert_eq!(stored(&router, "a"), vec![event("a", 1), event("a", 2)]);
}

#[test]
fn immediate_close_creates_no_file() {
    let dir = TempDir::new().unwrap();
    let router = router(&dir);
    let paths = FileLayout::new(dir.path()).paths_for(&id("a"));

    let report = router.route(vec![end("a", 1)]);

    assert_eq!(report.created, 0);
    assert_eq!(report.retired, 1);
    assert!(!paths.data.exists());
    assert!(!paths.index.exists());
    assert_eq!(router.registry().removed(), vec![id("a")]);
    assert!(router.active_sources().is_empty());
}

#[test]
fn mixed_batch_with_closing_source() {
    let dir = TempDir::new().unwrap();
    let router = router(&dir);
    let layout = FileLayout::new(dir.path());

    let report = router.route(vec![event("a", 1), event("b", 1), end("a", 2)]);

    // A is created, written, then retired within the same batch
    assert!(report.is_ok());
    assert_eq!(report.retired, 1);
    assert!(!layout.paths_for(&id("a")).data.exists());
    assert!(layout.paths_for(&id("b")).data.exists());
    assert_eq!(router.active_sources(), vec![id("b")]);
    assert_eq!(router.registry().removed(), vec![id("a")]);
}

#[test]
fn unseen_source_closing_alone_is_never_created() {
    let dir = TempDir::new().unwrap();
    let router = router(&dir);
    let layout = FileLayout::new(dir.path());

    router.route(vec![event("b", 1), end("a", 1)]);

    assert_eq!(router.active_sources(), vec![id("b")]);
    assert!(!layout.paths_for(&id("a")).data.exists());
    assert_eq!(
        router.registry().calls(),
        vec![RegistryCall::Add(id("b")), RegistryCall::Remove(id("a"))]
    );
}

#[test]
fn closing_existing_source_deletes_its_files() {
    let dir = TempDir::new().unwrap();
    let router = router(&dir);
    router.route(vec![event("a", 1)]);
    let store = router.store(&id("a")).unwrap();
    assert!(store.store().paths().exists());

    let report = router.route(vec![end("a", 2)]);

    assert_eq!(report.retired, 1);
    assert!(store.is_disposed());
    assert!(!store.store().paths().data.exists());
    assert!(!store.store().paths().index.exists());
    assert!(router.store(&id("a")).is_none());
}

#[test]
fn source_can_return_after_retirement() {
    let dir = TempDir::new().unwrap();
    let router = router(&dir);
    router.route(vec![event("a", 1), end("a", 2)]);

    let report = router.route(vec![event("a", 3)]);

    assert_eq!(report.created, 1);
    assert_eq!(stored(&router, "a"), vec![event("a", 3)]);
}

#[test]
fn events_without_identifier_are_skipped() {
    let dir = TempDir::new().unwrap();
    let router = router(&dir);
    let anonymous = EventWrapper {
        identifier: None,
        payload: Some("lost".to_string()),
    };

    let report = router.route(vec![anonymous, event("a", 1)]);

    assert_eq!(report.skipped, 1);
    assert_eq!(report.appended, 1);
}

#[test]
fn sparse_router_stores_by_local_id() {
    let dir = TempDir::new().unwrap();
    let router: SourceRouter<String, TestCodec, FakeRegistry> = SourceRouter::new(
        FileLayout::new(dir.path()),
        StoreOptions::new(Layout::Sparse),
        Arc::new(JsonCodec::new()),
        FakeRegistry::new(),
    );

    router.route(vec![event("a", 2), event("a", 5)]);

    let store = router.store(&id("a")).unwrap();
    assert_eq!(store.size().unwrap(), 6);
    assert_eq!(store.get(2).unwrap(), Some(event("a", 2)));
    assert_eq!(store.get(3).unwrap(), None);
    assert_eq!(store.get(5).unwrap(), Some(event("a", 5)));
}

#[test]
fn sparse_local_id_beyond_cap_is_reported() {
    let dir = TempDir::new().unwrap();
    let router: SourceRouter<String, TestCodec, FakeRegistry> = SourceRouter::new(
        FileLayout::new(dir.path()),
        StoreOptions::new(Layout::Sparse),
        Arc::new(JsonCodec::new()),
        FakeRegistry::new(),
    );

    let report = router.route(vec![event("a", i64::MAX), event("b", 1)]);

    assert_eq!(report.appended, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(matches!(
        &report.errors[0],
        RouterError::Storage {
            error: evl_storage::StorageError::SequenceOutOfRange { .. },
            ..
        }
    ));
    assert_eq!(router.store(&id("a")).unwrap().size().unwrap(), 0);
    assert_eq!(stored(&router, "b"), vec![event("b", 1)]);
}

/// JSON codec that refuses payloads starting with '!'
struct PickyCodec(TestCodec);

impl Encoder<EventWrapper<String>> for PickyCodec {
    fn encode(&self, value: &EventWrapper<String>) -> Option<Vec<u8>> {
        match &value.payload {
            Some(payload) if payload.starts_with('!') => None,
            _ => self.0.encode(value),
        }
    }
}

impl Decoder<EventWrapper<String>> for PickyCodec {
    fn decode(&self, bytes: &[u8]) -> Option<EventWrapper<String>> {
        self.0.decode(bytes)
    }
}

#[test]
fn unencodable_events_are_not_counted() {
    let dir = TempDir::new().unwrap();
    let router: SourceRouter<String, PickyCodec, FakeRegistry> = SourceRouter::new(
        FileLayout::new(dir.path()),
        StoreOptions::default(),
        Arc::new(PickyCodec(JsonCodec::new())),
        FakeRegistry::new(),
    );
    let refused = EventWrapper::new(id("a"), 2, "!refused".to_string());

    let report = router.route(vec![event("a", 1), refused]);

    assert!(report.is_ok());
    assert_eq!(report.appended, 1);

    let report = router.route(vec![EventWrapper::new(id("b"), 1, "!only".to_string())]);
    assert_eq!(report.appended, 0);
    assert_eq!(report.created, 1);
}

#[test]
fn close_all_keeps_files() {
    let dir = TempDir::new().unwrap();
    let router = router(&dir);
    router.route(vec![event("a", 1), event("b", 1)]);
    let store = router.store(&id("a")).unwrap();

    assert_eq!(router.close_all(), 2);

    assert!(store.is_disposed());
    assert!(store.store().paths().data.exists());
    assert!(router.active_sources().is_empty());
}

#[test]
fn created_stores_are_watched_until_retired() {
    let dir = TempDir::new().unwrap();
    let watcher = Arc::new(IndexWatcher::new());
    let router = router(&dir).with_watcher(Arc::clone(&watcher));

    router.route(vec![event("a", 1), event("b", 1)]);
    assert_eq!(watcher.len(), 2);

    router.route(vec![end("a", 2)]);
    assert_eq!(watcher.len(), 1);
}

#[test]
fn concurrent_routes_create_one_store() {
    let dir = TempDir::new().unwrap();
    let router = Arc::new(SourceRouter::new(
        FileLayout::new(dir.path()),
        StoreOptions::default(),
        Arc::new(TestCodec::new()),
        Arc::new(MemoryRegistry::<RouterStore<String, TestCodec>>::new()),
    ));

    let handles: Vec<_> = (0..8)
        .map(|n| {
            let router = Arc::clone(&router);
            std::thread::spawn(move || router.route(vec![event("shared", n)]))
        })
        .collect();
    let created: usize = handles.into_iter().map(|h| h.join().unwrap().created).sum();

    assert_eq!(created, 1);
    assert_eq!(router.registry().len(), 1);
    let store = router.store(&id("shared")).unwrap();
    assert_eq!(store.size().unwrap(), 8);
    assert!(Arc::ptr_eq(&store, &router.registry().get(&id("shared")).unwrap()));
}

proptest! {
    #[test]
    fn routing_preserves_per_source_order(picks in proptest::collection::vec(0usize..3, 1..40)) {
        let dir = TempDir::new().unwrap();
        let router = router(&dir);
        let names = ["a", "b", "c"];
        let batch: Vec<_> = picks
            .iter()
            .enumerate()
            .map(|(n, &pick)| event(names[pick], n as i64))
            .collect();

        router.route(batch.clone());

        for name in names {
            let expected: Vec<_> = batch
                .iter()
                .filter(|e| e.source() == Some(&id(name)))
                .cloned()
                .collect();
            if expected.is_empty() {
                prop_assert!(router.store(&id(name)).is_none());
            } else {
                prop_assert_eq!(stored(&router, name), expected);
            }
        }
    }
}
