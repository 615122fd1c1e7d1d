//! # readthrough
//!
//! 为 JSON HTTP API 提供客户端读穿缓存：命中即答、未命中取源回写、在飞请求合并、子串模式失效。
//!
//! A client-side read-through response cache for JSON HTTP APIs: answers
//! from a durable store when it can, fetches and writes through when it
//! cannot, and keeps hot entries quietly up to date in the background.
//!
//! ## Overview
//!
//! The crate sits between application code and an HTTP API. Reads go
//! through [`HttpCache`]: a fresh stored entry is served immediately (and
//! refreshed behind the caller's back), a missing or expired entry turns
//! into a network fetch whose successful result is written through, and
//! concurrent requests for the same resource collapse into a single
//! upstream call. Mutations stay the application's business; after one,
//! it invalidates the affected entries by URL substring.
//!
//! ## Core Behavior
//!
//! - **Read-through**: one read path, `coalesced → hit → miss`, per
//!   canonical [`CacheKey`]
//! - **Stale-while-revalidate**: fresh hits answer instantly and schedule
//!   a bounded background refresh (with `If-None-Match` revalidation when
//!   an `ETag` is stored)
//! - **Coalescing**: concurrent identical misses share one upstream fetch
//!   and one outcome
//! - **Pattern invalidation**: [`HttpCache::clear_matching`] drops every
//!   entry whose key contains a URL fragment
//! - **Graceful degradation**: a store that fails to open (or fails at
//!   runtime) never breaks reads; the engine serves from the network
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use readthrough::{CacheConfig, DiskStore, HttpCache, HttpTransport, RequestDescriptor};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> readthrough::Result<()> {
//!     let transport = HttpTransport::builder("https://api.example.com")
//!         .with_timeout(Duration::from_secs(10))
//!         .build()?;
//!
//!     let cache = HttpCache::builder(Arc::new(transport))
//!         .with_opened_store(DiskStore::open("/tmp/readthrough").await)
//!         .with_default_config(CacheConfig::new().with_ttl(Duration::from_secs(300)))
//!         .build();
//!
//!     let roms = RequestDescriptor::get("/roms").with_query("platform_id", "1");
//!     let listing: readthrough::Response<serde_json::Value> = cache.request(&roms, None).await?;
//!     println!("status {} (from cache: {})", listing.status, listing.from_cache);
//!
//!     // After a mutation elsewhere, drop the affected listings only.
//!     cache.clear_matching("platform_id=1").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`engine`] | Read-through engine, builder, response types |
//! | [`store`] | Durable backends: in-memory LRU and on-disk JSON |
//! | [`transport`] | Network seam and bundled `reqwest` client |
//! | [`key`] | Canonical cache key derivation |
//! | [`entry`] | Stored entry representation |
//! | [`freshness`] | TTL window classification |
//! | [`config`] | Per-request cache policy |
//! | [`policy`] | Endpoint pattern → policy table |
//! | [`request`] | Cacheable request descriptors |
//! | [`stats`] | Engine activity counters |

mod coalesce;

pub mod config;
pub mod engine;
pub mod entry;
pub mod freshness;
pub mod key;
pub mod policy;
pub mod request;
pub mod stats;
pub mod store;
pub mod transport;

// Re-export main types for convenience
pub use config::CacheConfig;
pub use engine::{CachedResponse, HttpCache, HttpCacheBuilder, Response};
pub use entry::CacheEntry;
pub use freshness::Freshness;
pub use key::CacheKey;
pub use policy::EndpointPolicies;
pub use request::{Method, RequestDescriptor};
pub use stats::CacheStats;
pub use store::{DiskStore, DurableStore, MemoryStore};
pub use transport::{HttpTransport, Transport, TransportError, TransportResponse};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::Error;
