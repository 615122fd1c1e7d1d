//! reqwest-backed [`Transport`].

use super::{Transport, TransportResponse};
use crate::request::{Method, RequestDescriptor};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// HTTP client wrapper resolving descriptors against a fixed origin.
///
/// Owns connection pooling and the per-request timeout; anything beyond
/// that (auth schemes, retry loops) belongs to the embedding application
/// and can be layered in through default headers or a custom
/// [`Transport`] implementation.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    default_headers: HashMap<String, String>,
}

impl HttpTransport {
    /// Start building a transport for the given origin, e.g.
    /// `https://api.example.com`.
    pub fn builder(base_url: impl Into<String>) -> HttpTransportBuilder {
        HttpTransportBuilder::new(base_url)
    }

    async fn execute(
        &self,
        descriptor: &RequestDescriptor,
        etag: Option<&str>,
    ) -> Result<TransportResponse, TransportError> {
        let url = format!("{}{}", self.base_url, descriptor.path);

        let mut request = match descriptor.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Patch => self.client.patch(&url),
            Method::Delete => self.client.delete(&url),
        };

        if !descriptor.query.is_empty() {
            request = request.query(&descriptor.query);
        }
        if let Some(body) = &descriptor.body {
            request = request.json(body);
        }
        for (name, value) in &self.default_headers {
            request = request.header(name, value);
        }
        if let Some(etag) = etag {
            request = request.header("if-none-match", etag);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        // A 304 has no body by definition; everything else is decoded as
        // JSON with a plain-text fallback so error pages stay visible.
        let data = if status == 304 {
            Value::Null
        } else {
            let bytes = response.bytes().await?;
            if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes)
                    .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            }
        };

        Ok(TransportResponse {
            status,
            headers,
            data,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<TransportResponse, TransportError> {
        self.execute(descriptor, None).await
    }

    async fn revalidate(
        &self,
        descriptor: &RequestDescriptor,
        etag: &str,
    ) -> Result<TransportResponse, TransportError> {
        self.execute(descriptor, Some(etag)).await
    }
}

/// Builder for [`HttpTransport`].
///
/// Keep this surface area small and predictable.
pub struct HttpTransportBuilder {
    base_url: String,
    timeout: Duration,
    pool_max_idle_per_host: usize,
    default_headers: HashMap<String, String>,
}

impl HttpTransportBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            pool_max_idle_per_host: 32,
            default_headers: HashMap::new(),
        }
    }

    /// Per-request timeout (default 30s). Timeouts surface to the engine
    /// as ordinary transport errors.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Connection pool sizing (default 32 idle connections per host).
    pub fn with_pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Header attached to every request, e.g. an `Authorization` value.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    /// Validate the origin and build the transport.
    pub fn build(self) -> Result<HttpTransport, TransportError> {
        // Parsed once for validation only; paths are joined by plain
        // concatenation so `/roms` lands under the origin as written.
        url::Url::parse(&self.base_url)?;
        let base_url = self.base_url.trim_end_matches('/').to_string();

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()?;

        Ok(HttpTransport {
            client,
            base_url,
            default_headers: self.default_headers,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid base URL: {0}")]
    BaseUrl(#[from] url::ParseError),

    #[error("transport error: {0}")]
    Other(String),
}
