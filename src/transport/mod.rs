//! Network transport seam.
//!
//! The engine never talks HTTP directly; it goes through the [`Transport`]
//! trait so callers can inject their own client (auth headers, retries and
//! timeouts are that client's business, not the cache's). A
//! reqwest-backed [`HttpTransport`] is bundled for the common case.

mod http;

pub use http::{HttpTransport, HttpTransportBuilder, TransportError};

use crate::request::RequestDescriptor;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// One network response, shape-agnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, lowercase names.
    pub headers: HashMap<String, String>,
    /// Decoded payload. `Null` when the response carried no body.
    pub data: Value,
}

impl TransportResponse {
    /// True for 2xx statuses; only these responses are ever cached.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Validator token from the `ETag` header, if the origin sent one.
    pub fn etag(&self) -> Option<&str> {
        self.headers.get("etag").map(String::as_str)
    }
}

/// Something that can perform the actual network call for a descriptor.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the request and return the decoded response.
    async fn request(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<TransportResponse, TransportError>;

    /// Conditional refetch carrying a validator. Implementations that can
    /// attach `If-None-Match` override this and may answer
    /// `304 Not Modified`; the default ignores the validator and performs
    /// a plain fetch.
    async fn revalidate(
        &self,
        descriptor: &RequestDescriptor,
        etag: &str,
    ) -> Result<TransportResponse, TransportError> {
        let _ = etag;
        self.request(descriptor).await
    }
}
