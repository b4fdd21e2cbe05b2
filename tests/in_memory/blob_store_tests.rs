//! Blob store tests for the in-memory and directory-backed stores.

use crate::in_memory::helpers::{runtime, scratch_dir};
use rstest::rstest;
use site_protocol::protocol::{
    adapters::{fs::FsBlobStore, memory::InMemoryBlobStore},
    ports::{BlobStore, BlobStoreError, PDF_CONTENT_TYPE},
};
use std::io;
use tokio::runtime::Runtime;

/// Tests that the in-memory store keeps bytes and content types per key.
#[rstest]
fn in_memory_store_round_trips_bytes_and_content_type(runtime: io::Result<Runtime>) {
    let rt = runtime.expect("runtime creation");
    let store = InMemoryBlobStore::new();

    rt.block_on(store.write("protocols/a.pdf", b"%PDF-1.7", PDF_CONTENT_TYPE))
        .expect("write");

    assert_eq!(
        rt.block_on(store.read("protocols/a.pdf")).expect("read"),
        b"%PDF-1.7".to_vec()
    );
    assert_eq!(
        store.content_type("protocols/a.pdf").expect("content type"),
        Some(PDF_CONTENT_TYPE.to_owned())
    );
    assert!(matches!(
        rt.block_on(store.read("protocols/b.pdf")),
        Err(BlobStoreError::NotFound(key)) if key == "protocols/b.pdf"
    ));
}

/// Tests that failing writes leave nothing behind.
#[rstest]
fn failing_writes_store_nothing(runtime: io::Result<Runtime>) {
    let rt = runtime.expect("runtime creation");
    let store = InMemoryBlobStore::new();
    store.fail_writes(true).expect("toggle");

    let result = rt.block_on(store.write("protocols/a.pdf", b"%PDF-1.7", PDF_CONTENT_TYPE));

    assert!(matches!(result, Err(BlobStoreError::Io(_))));
    assert!(store.keys().expect("keys").is_empty());
}

/// Tests that deleting removes only the named key and tolerates repeats.
#[rstest]
fn in_memory_delete_removes_one_key(runtime: io::Result<Runtime>) {
    let rt = runtime.expect("runtime creation");
    let store = InMemoryBlobStore::new();
    store
        .insert("blueprints/ground.pdf", b"%PDF-1.7".to_vec())
        .expect("seed");
    rt.block_on(store.write("protocols/a.pdf", b"%PDF-1.7", PDF_CONTENT_TYPE))
        .expect("write");

    rt.block_on(store.delete("protocols/a.pdf")).expect("delete");
    rt.block_on(store.delete("protocols/a.pdf"))
        .expect("delete missing key");

    assert_eq!(
        store.keys().expect("keys"),
        vec!["blueprints/ground.pdf".to_owned()]
    );
}

/// Tests that the directory store cannot be steered outside its root.
#[rstest]
#[case("../escape.pdf")]
#[case("/tmp/escape.pdf")]
#[case("")]
fn directory_store_rejects_escaping_keys(runtime: io::Result<Runtime>, #[case] key: &str) {
    let rt = runtime.expect("runtime creation");
    let dir = scratch_dir("site_protocol_keys");
    let store = FsBlobStore::open(&dir).expect("open store");

    let result = rt.block_on(store.write(key, b"%PDF-1.7", PDF_CONTENT_TYPE));

    assert!(matches!(result, Err(BlobStoreError::InvalidKey { .. })));
    std::fs::remove_dir_all(&dir).expect("clean up scratch dir");
}

/// Tests that nested keys create their directories on disk.
#[rstest]
fn directory_store_writes_nested_keys(runtime: io::Result<Runtime>) {
    let rt = runtime.expect("runtime creation");
    let dir = scratch_dir("site_protocol_nested");
    let store = FsBlobStore::open(&dir).expect("open store");

    rt.block_on(store.write("protocols/org/project/job.pdf", b"%PDF-1.7", PDF_CONTENT_TYPE))
        .expect("write");

    let on_disk = std::fs::read(dir.join("protocols/org/project/job.pdf")).expect("file exists");
    assert_eq!(on_disk, b"%PDF-1.7".to_vec());
    std::fs::remove_dir_all(&dir).expect("clean up scratch dir");
}
