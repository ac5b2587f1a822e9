// crates/idis-object-store/tests/store.rs
// ============================================================================
// Module: Object Store Tests
// Description: Versioning, latest-pointer rewiring, and traversal defense.
// ============================================================================
//! ## Overview
//! Verifies versioned writes, latest-pointer behavior across puts and
//! deletes, tenant-shape enforcement, and the full traversal-defense key
//! matrix.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::missing_docs_in_private_items,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;

use idis_audit::MemoryAuditSink;
use idis_core::RequestId;
use idis_core::TenantId;
use idis_object_store::FilesystemObjectStore;
use idis_object_store::ObjectStoreError;

fn tenant() -> TenantId {
    TenantId::new("3f2d8c10-9a4b-4c6d-8e1f-aa00bb11cc22")
}

fn store(dir: &std::path::Path) -> (FilesystemObjectStore, Arc<MemoryAuditSink>) {
    let sink = Arc::new(MemoryAuditSink::new());
    (
        FilesystemObjectStore::new(dir, sink.clone()).unwrap(),
        sink,
    )
}

#[test]
fn put_then_get_round_trips_latest() {
    let dir = tempfile::tempdir().unwrap();
    let (store, sink) = store(dir.path());
    let request = RequestId::new("req-1");

    let first = store
        .put(&tenant(), "deals/deal-1/deck.pdf", b"v1 bytes", Some("application/pdf"), &request)
        .unwrap();
    let second = store
        .put(&tenant(), "deals/deal-1/deck.pdf", b"v2 bytes", Some("application/pdf"), &request)
        .unwrap();
    assert_ne!(first.version_id, second.version_id);

    let latest = store.get(&tenant(), "deals/deal-1/deck.pdf", None).unwrap();
    assert_eq!(latest.data, b"v2 bytes");
    assert_eq!(latest.metadata.version_id, second.version_id);

    let pinned = store
        .get(&tenant(), "deals/deal-1/deck.pdf", Some(&first.version_id))
        .unwrap();
    assert_eq!(pinned.data, b"v1 bytes");

    assert_eq!(sink.events_of_type("object.put").len(), 2);
}

#[test]
fn delete_rewires_latest_to_next_most_recent() {
    let dir = tempfile::tempdir().unwrap();
    let (store, sink) = store(dir.path());
    let request = RequestId::new("req-1");
    let key = "deals/deal-1/model.xlsx";

    let v1 = store.put(&tenant(), key, b"v1", None, &request).unwrap();
    let v2 = store.put(&tenant(), key, b"v2", None, &request).unwrap();
    let v3 = store.put(&tenant(), key, b"v3", None, &request).unwrap();

    store
        .delete(&tenant(), key, Some(&v3.version_id), &request)
        .unwrap();
    let latest = store.head(&tenant(), key, None).unwrap();
    assert_eq!(latest.version_id, v2.version_id);

    let versions = store.list_versions(&tenant(), key).unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].version_id, v2.version_id);
    assert_eq!(versions[1].version_id, v1.version_id);
    assert_eq!(sink.events_of_type("object.deleted").len(), 1);
}

#[test]
fn unsafe_keys_are_rejected_before_any_io() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _sink) = store(dir.path());
    let request = RequestId::new("req-1");

    let unsafe_keys = [
        "../escape",
        "a/../../b",
        "/absolute",
        "~home",
        "C:drive",
        "back\\slash",
        "null\0byte",
        "spaces in key",
        "",
    ];
    for key in unsafe_keys {
        let err = store.put(&tenant(), key, b"x", None, &request);
        assert!(
            matches!(err, Err(ObjectStoreError::PathTraversal)),
            "key {key:?} must be rejected"
        );
    }
}

#[test]
fn tenant_id_must_be_uuid_shaped() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _sink) = store(dir.path());
    let err = store.put(
        &TenantId::new("tenant-1"),
        "safe/key",
        b"x",
        None,
        &RequestId::new("req-1"),
    );
    assert!(matches!(err, Err(ObjectStoreError::InvalidTenant)));
}

#[test]
fn missing_objects_and_versions_are_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _sink) = store(dir.path());
    let err = store.get(&tenant(), "never/written", None);
    assert!(matches!(err, Err(ObjectStoreError::NotFound)));

    let request = RequestId::new("req-1");
    store.put(&tenant(), "some/key", b"x", None, &request).unwrap();
    let err = store.get(
        &tenant(),
        "some/key",
        Some("9e107d9d-0000-4000-8000-000000000000"),
    );
    assert!(matches!(err, Err(ObjectStoreError::NotFound)));
}

#[test]
fn meta_json_carries_required_fields() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _sink) = store(dir.path());
    let request = RequestId::new("req-1");
    let metadata = store
        .put(&tenant(), "docs/readme.md", b"hello", Some("text/markdown"), &request)
        .unwrap();
    assert_eq!(metadata.size_bytes, 5);
    assert_eq!(metadata.key, "docs/readme.md");
    assert_eq!(
        metadata.sha256,
        "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
}
