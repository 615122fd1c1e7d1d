//! Substring invalidation across related listings
//!
//! Cache keys embed the request path and canonical query verbatim, so a
//! URL fragment is all it takes to sweep related entries: one user's
//! listings can be dropped after a mutation while everything else keeps
//! serving from the store.
//!
//!   READTHROUGH_BASE_URL="http://localhost:8080" cargo run --example pattern_invalidation

use readthrough::{
    CacheConfig, DurableStore, EndpointPolicies, HttpCache, HttpTransport, MemoryStore,
    RequestDescriptor,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let base_url = std::env::var("READTHROUGH_BASE_URL")
        .unwrap_or_else(|_| "https://jsonplaceholder.typicode.com".to_string());
    let transport = HttpTransport::builder(&base_url).build()?;

    let store = Arc::new(MemoryStore::new(64));
    let cache = HttpCache::builder(Arc::new(transport))
        .with_store(Arc::clone(&store) as Arc<dyn DurableStore>)
        .build();

    // Listings change often, static lookups rarely; resolve a policy per
    // endpoint instead of hardcoding one window for everything.
    let policies = EndpointPolicies::new()
        .with_rule("/comments", CacheConfig::new().with_ttl(Duration::from_secs(30)))
        .with_rule("/posts", CacheConfig::new().with_ttl(Duration::from_secs(300)))
        .with_default(CacheConfig::new().with_ttl(Duration::from_secs(60)));

    for descriptor in [
        RequestDescriptor::get("/posts").with_query("userId", "1"),
        RequestDescriptor::get("/posts").with_query("userId", "2"),
        RequestDescriptor::get("/comments").with_query("postId", "1"),
    ] {
        let config = policies.resolve(&descriptor.path);
        let response = cache.request_raw(&descriptor, Some(config)).await?;
        println!(
            "fetched {} {:?} -> status {}",
            descriptor.path, descriptor.query, response.status
        );
    }

    println!("\ncached keys:");
    for key in store.keys().await? {
        println!("  {key}");
    }

    // User 1 created a post somewhere else; their listing is the only
    // one that must go.
    let removed = cache.clear_matching("userId=1").await?;
    println!("\nremoved {removed} entry(ies) matching \"userId=1\"");

    println!("\ncached keys after invalidation:");
    for key in store.keys().await? {
        println!("  {key}");
    }

    Ok(())
}
