//! Endpoint-to-config selection.
//!
//! A small, caller-owned lookup table mapping URL patterns to
//! [`CacheConfig`]s. The engine itself never consults this: callers
//! resolve a config here (or however they like) and pass it per request,
//! which keeps the engine domain-agnostic.

use crate::config::CacheConfig;

/// Ordered pattern table resolving a request path to a cache policy.
///
/// Patterns match by plain substring, first match wins, and a default
/// config backs everything that matches nothing.
#[derive(Debug, Clone, Default)]
pub struct EndpointPolicies {
    rules: Vec<(String, CacheConfig)>,
    default: CacheConfig,
}

impl EndpointPolicies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule. Earlier rules shadow later ones, so register the
    /// most specific patterns first.
    pub fn with_rule(mut self, pattern: impl Into<String>, config: CacheConfig) -> Self {
        self.rules.push((pattern.into(), config));
        self
    }

    /// Config used when no rule matches.
    pub fn with_default(mut self, config: CacheConfig) -> Self {
        self.default = config;
        self
    }

    /// Resolve the config for a path.
    pub fn resolve(&self, path: &str) -> &CacheConfig {
        self.rules
            .iter()
            .find(|(pattern, _)| path.contains(pattern.as_str()))
            .map(|(_, config)| config)
            .unwrap_or(&self.default)
    }
}
