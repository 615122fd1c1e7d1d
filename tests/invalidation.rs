//! Pattern-based and whole-store invalidation.

mod common;

use common::{cache_with_memory, FakeTransport};
use readthrough::{CacheConfig, HttpCache, MemoryStore, RequestDescriptor};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn no_refresh() -> CacheConfig {
    CacheConfig::new().with_stale_while_revalidate(false)
}

/// Seed the engine with the three canonical listings used throughout:
/// roms for platform 1, roms for platform 2, and the platform index.
async fn seed_listings(cache: &HttpCache, transport: &Arc<FakeTransport>) -> [RequestDescriptor; 3] {
    let descriptors = [
        RequestDescriptor::get("/roms").with_query("platform_id", "1"),
        RequestDescriptor::get("/roms").with_query("platform_id", "2"),
        RequestDescriptor::get("/platforms"),
    ];
    for (i, descriptor) in descriptors.iter().enumerate() {
        transport.enqueue_json(json!({"seed": i}));
        cache
            .request_raw(descriptor, Some(&no_refresh()))
            .await
            .expect("seed");
    }
    descriptors
}

#[tokio::test]
async fn test_query_pattern_removes_only_matching_entries() {
    let transport = FakeTransport::new();
    let (cache, _store) = cache_with_memory(&transport);
    let [roms_p1, roms_p2, _platforms] = seed_listings(&cache, &transport).await;
    assert_eq!(cache.len().await, 3);

    let removed = cache.clear_matching("platform_id=1").await.expect("invalidate");
    assert_eq!(removed, 1);
    assert_eq!(cache.len().await, 2);

    // The invalidated listing refetches; its sibling still hits.
    transport.enqueue_json(json!({"seed": "fresh"}));
    let refetched = cache
        .request_raw(&roms_p1, Some(&no_refresh()))
        .await
        .expect("refetch");
    assert!(!refetched.from_cache);
    assert_eq!(refetched.data, json!({"seed": "fresh"}));

    let sibling = cache
        .request_raw(&roms_p2, Some(&no_refresh()))
        .await
        .expect("sibling");
    assert!(sibling.from_cache);
}

#[tokio::test]
async fn test_path_pattern_sweeps_every_variant() {
    let transport = FakeTransport::new();
    let (cache, _store) = cache_with_memory(&transport);
    seed_listings(&cache, &transport).await;

    // "/roms" matches both platform listings but not "/platforms".
    let removed = cache.clear_matching("/roms").await.expect("invalidate");
    assert_eq!(removed, 2);
    assert_eq!(cache.len().await, 1);
}

#[tokio::test]
async fn test_pattern_matching_is_plain_substring() {
    let transport = FakeTransport::new();
    let (cache, _store) = cache_with_memory(&transport);
    seed_listings(&cache, &transport).await;

    // "platform" occurs in the query of both rom listings and in the
    // "/platforms" path, so it sweeps all three.
    let removed = cache.clear_matching("platform").await.expect("invalidate");
    assert_eq!(removed, 3);
    assert_eq!(cache.len().await, 0);
}

#[tokio::test]
async fn test_unmatched_pattern_is_a_noop() {
    let transport = FakeTransport::new();
    let (cache, _store) = cache_with_memory(&transport);
    let [roms_p1, _, _] = seed_listings(&cache, &transport).await;

    let removed = cache.clear_matching("/firmware").await.expect("invalidate");
    assert_eq!(removed, 0);
    assert_eq!(cache.len().await, 3);

    let hit = cache
        .request_raw(&roms_p1, Some(&no_refresh()))
        .await
        .expect("hit");
    assert!(hit.from_cache, "untouched entries keep serving");
}

#[tokio::test]
async fn test_clear_is_idempotent() {
    let transport = FakeTransport::new();
    let (cache, _store) = cache_with_memory(&transport);
    seed_listings(&cache, &transport).await;
    assert_eq!(cache.len().await, 3);

    cache.clear().await.expect("first clear");
    assert_eq!(cache.len().await, 0);

    cache.clear().await.expect("second clear");
    assert_eq!(cache.len().await, 0);
}

#[tokio::test]
async fn test_invalidation_and_reads_interleave_safely() {
    let transport = FakeTransport::new();
    // Enough responses for the worst case where every read is a miss.
    for i in 0..32 {
        transport.enqueue_json(json!({"x": true, "n": i}));
    }
    let store = Arc::new(MemoryStore::new(16));
    let cache = Arc::new(
        HttpCache::builder(Arc::clone(&transport) as Arc<dyn readthrough::Transport>)
            .with_store(Arc::clone(&store) as Arc<dyn readthrough::DurableStore>)
            .build(),
    );
    let descriptor = RequestDescriptor::get("/roms").with_query("platform_id", "1");

    let reader = {
        let cache = Arc::clone(&cache);
        let descriptor = descriptor.clone();
        tokio::spawn(async move {
            for _ in 0..20 {
                let response = cache
                    .request_raw(&descriptor, Some(&no_refresh()))
                    .await
                    .expect("reads never fail during invalidation");
                assert_eq!(response.data["x"], json!(true));
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
    };

    for _ in 0..10 {
        cache.clear_matching("platform_id=1").await.expect("invalidate");
        tokio::time::sleep(Duration::from_millis(3)).await;
    }
    reader.await.expect("reader task");
    assert!(transport.calls() <= 20, "at most one fetch per read");
}
