//! Basic read-through caching against a public JSON API
//!
//! This example runs the same request three times: the first goes to the
//! network and is written through, the following two are served from the
//! disk store (and quietly refreshed in the background).
//!
//! The origin defaults to jsonplaceholder.typicode.com; point it at your
//! own API instead:
//!
//!   READTHROUGH_BASE_URL="http://localhost:8080" cargo run --example basic_usage

use readthrough::{CacheConfig, DiskStore, HttpCache, HttpTransport, RequestDescriptor};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let base_url = std::env::var("READTHROUGH_BASE_URL")
        .unwrap_or_else(|_| "https://jsonplaceholder.typicode.com".to_string());
    let transport = HttpTransport::builder(&base_url)
        .with_timeout(Duration::from_secs(10))
        .build()?;

    // A store that fails to open is not fatal; the engine then serves
    // every request from the network.
    let cache_dir = std::env::temp_dir().join("readthrough-demo");
    let cache = HttpCache::builder(Arc::new(transport))
        .with_opened_store(DiskStore::open(&cache_dir).await)
        .with_default_config(CacheConfig::new().with_ttl(Duration::from_secs(120)))
        .build();

    let posts = RequestDescriptor::get("/posts").with_query("userId", "1");

    for round in 1..=3 {
        let started = Instant::now();
        let response = cache.request_raw(&posts, None).await?;
        println!(
            "round {round}: status {} in {:?} (from cache: {})",
            response.status,
            started.elapsed(),
            response.from_cache
        );
    }

    let stats = cache.stats();
    println!(
        "\nhits {} / misses {} (ratio {:.2}); {} entries under {}",
        stats.hits,
        stats.misses,
        stats.hit_ratio(),
        cache.len().await,
        cache_dir.display()
    );

    Ok(())
}
