//! Store Configuration
//!
//! Configuration for the hosted-service store. Built explicitly and
//! passed in; nothing here reads the environment (the binary does
//! that).

use std::path::PathBuf;

/// Hosted auth/data service configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Service base URL, e.g. `https://project.example.co`
    pub base_url: String,
    /// Public (anon) API key, sent as the `apikey` header
    pub api_key: String,
    /// Where to persist the session token between runs. `None`
    /// disables persistence; the session then lives only in memory.
    pub cache_path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            api_key: api_key.into(),
            cache_path: None,
        }
    }

    /// Persist the session token at the given path (mode 0600)
    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    /// Full URL for an auth endpoint path
    pub(crate) fn auth_endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }
}
