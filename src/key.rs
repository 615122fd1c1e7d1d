//! Cache key derivation.
//!
//! Keys are deterministic, canonical serializations of a
//! [`RequestDescriptor`]: same logical request, same key, regardless of
//! query parameter insertion order or body field declaration order. The
//! path and query survive verbatim inside the key so substring-based
//! invalidation over URL fragments (`platform_id=1`, `/roms`, ...) works;
//! the body contributes a short SHA-256 digest instead of raw text.

use crate::request::RequestDescriptor;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length (hex chars) of the body digest embedded in a key.
const BODY_DIGEST_LEN: usize = 16;

/// An opaque, deterministic identifier for one cacheable request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the canonical key for a descriptor. Pure; no I/O.
    ///
    /// Layout: `METHOD path[?canonical-query][#body=digest]`. Absent
    /// query and body collapse to a stable empty representation, so two
    /// parameterless requests for the same path always collide.
    pub fn derive(descriptor: &RequestDescriptor) -> Self {
        let mut key = format!("{} {}", descriptor.method.as_str(), descriptor.path);

        if !descriptor.query.is_empty() {
            let mut serializer = url::form_urlencoded::Serializer::new(String::new());
            // BTreeMap iteration is sorted, which makes the encoding canonical.
            for (name, value) in &descriptor.query {
                serializer.append_pair(name, value);
            }
            key.push('?');
            key.push_str(&serializer.finish());
        }

        if let Some(body) = &descriptor.body {
            key.push_str("#body=");
            key.push_str(&body_digest(body));
        }

        CacheKey(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substring containment check used by pattern invalidation.
    pub fn contains(&self, pattern: &str) -> bool {
        self.0.contains(pattern)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        CacheKey(s.to_string())
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        CacheKey(s)
    }
}

/// Short hex digest of the canonical JSON serialization of a body.
///
/// `serde_json` maps keep keys sorted (the `preserve_order` feature is
/// off), so structurally equal bodies hash identically.
fn body_digest(body: &serde_json::Value) -> String {
    let canonical = serde_json::to_string(body).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest: String = hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();
    digest[..BODY_DIGEST_LEN].to_string()
}
