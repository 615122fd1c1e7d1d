//! Request descriptors: the cacheable identity of an HTTP call.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// HTTP method of a cacheable request.
///
/// The engine memoizes any method routed through its read path; the
/// method participates in key derivation so a `POST` search and a `GET`
/// listing of the same path never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything that identifies one logical resource request.
///
/// Query parameters live in a `BTreeMap` so two descriptors that differ
/// only in parameter insertion order are the same descriptor. The body is
/// an optional JSON payload; `serde_json` keeps object keys sorted, so
/// structurally equal bodies serialize identically.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Path portion of the URL, e.g. `/roms`. Origin resolution belongs
    /// to the transport.
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: BTreeMap::new(),
            body: None,
        }
    }

    /// Shorthand for a GET descriptor.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// Shorthand for a POST descriptor.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// Add a single query parameter.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Replace the whole query map.
    pub fn with_query_map(mut self, query: BTreeMap<String, String>) -> Self {
        self.query = query;
        self
    }

    /// Attach a JSON body payload.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}
