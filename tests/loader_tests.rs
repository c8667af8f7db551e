//! Tests for the project loader — lazy bulk loading, idempotence, fetch
//! deduplication under concurrency, and failure containment.

mod common;

use common::*;
use syncpad::cache::ContentCache;
use syncpad::error::SyncError;
use syncpad::loader::ProjectLoader;

fn demo_loader() -> ProjectLoader<StubService> {
    ProjectLoader::new(demo_service(), ContentCache::new(), "public_room")
}

// ---------------------------------------------------------------------------
// Lazy bulk loading
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_refresh_fetches_no_bodies() {
    let loader = demo_loader();
    let tree = loader.refresh().await.expect("refresh");
    assert_eq!(tree.len(), 2);
    assert_eq!(loader.service().fetches_for(42), 0);
    assert_eq!(loader.service().fetches_for(43), 0);
}

#[tokio::test]
async fn test_ensure_loaded_pulls_every_member() {
    let loader = demo_loader();
    loader.refresh().await.expect("refresh");
    loader.ensure_loaded(1).await.expect("load");
    assert_eq!(loader.service().fetches_for(42), 1);
    assert_eq!(loader.service().fetches_for(43), 1);
    assert!(loader.is_loaded(1));
    // The other project is untouched.
    assert_eq!(loader.service().fetches_for(50), 0);
    assert!(!loader.is_loaded(2));
}

#[tokio::test]
async fn test_ensure_loaded_is_idempotent() {
    let loader = demo_loader();
    loader.refresh().await.expect("refresh");
    loader.ensure_loaded(1).await.expect("first");
    loader.ensure_loaded(1).await.expect("second");
    loader.ensure_loaded(1).await.expect("third");
    assert_eq!(loader.service().fetches_for(42), 1);
    assert_eq!(loader.service().fetches_for(43), 1);
}

// ---------------------------------------------------------------------------
// Fetch deduplication under concurrency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_concurrent_loads_fetch_each_file_once() {
    let loader = demo_loader();
    loader.refresh().await.expect("refresh");
    let (a, b) = tokio::join!(loader.ensure_loaded(1), loader.ensure_loaded(1));
    a.expect("first caller");
    b.expect("second caller");
    assert_eq!(loader.service().fetches_for(42), 1, "index.html fetched once, not twice");
    assert_eq!(loader.service().fetches_for(43), 1, "style.css fetched once, not twice");
}

#[tokio::test]
async fn test_concurrent_loads_of_distinct_projects() {
    let loader = demo_loader();
    loader.refresh().await.expect("refresh");
    let (a, b) = tokio::join!(loader.ensure_loaded(1), loader.ensure_loaded(2));
    a.expect("project 1");
    b.expect("project 2");
    assert_eq!(loader.service().fetches_for(42), 1);
    assert_eq!(loader.service().fetches_for(50), 1);
    assert!(loader.is_loaded(1));
    assert!(loader.is_loaded(2));
}

// ---------------------------------------------------------------------------
// Failure containment
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_failed_fetch_aborts_and_leaves_flag_unset() {
    let mut service = demo_service();
    service.fail_body = Some(43);
    let loader = ProjectLoader::new(service, ContentCache::new(), "public_room");
    loader.refresh().await.expect("refresh");

    let err = loader.ensure_loaded(1).await.expect_err("load must abort");
    assert!(matches!(err, SyncError::Http { status: 500, .. }));
    assert!(!loader.is_loaded(1), "a failed load must stay retryable");
}

#[tokio::test]
async fn test_failed_load_keeps_bodies_already_fetched() {
    let mut service = demo_service();
    service.fail_body = Some(43);
    let cache = ContentCache::new();
    let loader = ProjectLoader::new(service, cache.clone(), "public_room");
    loader.refresh().await.expect("refresh");
    loader.ensure_loaded(1).await.expect_err("load must abort");
    // index.html (id 42) was fetched before the stylesheet failed.
    assert_eq!(cache.get(42).as_deref(), Some("<h1>Hello, World!</h1>"));
    assert!(cache.get(43).is_none());
}

#[tokio::test]
async fn test_unknown_project_is_an_error() {
    let loader = demo_loader();
    loader.refresh().await.expect("refresh");
    let err = loader.ensure_loaded(77).await.expect_err("unknown project");
    assert!(matches!(err, SyncError::Unknown { kind: "project", id: 77 }));
}

// ---------------------------------------------------------------------------
// Stale completion handling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_edit_during_load_outranks_fetch_result() {
    let cache = ContentCache::new();
    // An edit reaches the cache after the load operation has stamped itself:
    // the later fetch completion must not clobber it.
    let op = cache.begin_op();
    cache.write(42, "live edit while fetch in flight");
    assert!(!cache.complete_fetch(42, "stale server body", op));
    assert_eq!(cache.get(42).as_deref(), Some("live edit while fetch in flight"));
}

#[tokio::test]
async fn test_preloaded_body_is_not_refetched() {
    let cache = ContentCache::new();
    cache.write(42, "already present");
    let loader = ProjectLoader::new(demo_service(), cache.clone(), "public_room");
    loader.refresh().await.expect("refresh");
    loader.ensure_loaded(1).await.expect("load");
    assert_eq!(loader.service().fetches_for(42), 0);
    assert_eq!(cache.get(42).as_deref(), Some("already present"));
}
