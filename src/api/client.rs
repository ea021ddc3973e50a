// Resonate - Music Streaming Client for Mobile
// Copyright (C) 2025 Resonate contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! HTTP client construction and request headers
//!
//! The upstream rejects requests that do not look like they come from its own
//! web or mobile players, so every request carries spoofed Origin/Referer/
//! User-Agent headers plus an optional session cookie. The shared
//! `reqwest::Client` is owned by an explicit [`HttpFactory`] and built lazily
//! exactly once; callers receive the same pooled client for every request.

use crate::error::{AcquisitionError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Default request timeout in seconds (per request, not per file)
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Origin/Referer the upstream expects to see on media requests
pub const UPSTREAM_ORIGIN: &str = "https://music.youtube.com";

/// Default User-Agent when no client profile overrides it
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Configuration for the shared HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub enable_cookies: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            enable_cookies: true,
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }
}

/// Builder for ClientConfig
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn enable_cookies(mut self, enable: bool) -> Self {
        self.config.enable_cookies = enable;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-attempt HTTP headers
///
/// Spoofed identity headers plus the optional session cookie and byte range.
/// Kept as plain strings so descriptors stay serializable and cloneable;
/// converted to a `HeaderMap` only at send time.
#[derive(Debug, Clone, Default)]
pub struct RequestHeaders {
    map: HashMap<String, String>,
}

impl RequestHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard spoofed header set for upstream media requests
    pub fn spoofed(user_agent: &str) -> Self {
        let mut headers = Self::new();
        headers.insert("Origin", UPSTREAM_ORIGIN);
        headers.insert("Referer", format!("{}/", UPSTREAM_ORIGIN));
        headers.insert("User-Agent", user_agent);
        headers
    }

    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.map.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    /// Attach a session cookie when one is present
    pub fn with_cookie(mut self, cookie: Option<&str>) -> Self {
        if let Some(cookie) = cookie {
            self.insert("Cookie", cookie);
        }
        self
    }

    /// Request bytes from `start` to the end of the resource
    pub fn with_range(mut self, start: u64) -> Self {
        self.insert("Range", format!("bytes={}-", start));
        self
    }

    pub fn contains_cookie(&self) -> bool {
        self.map.contains_key("Cookie")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.map.iter()
    }

    /// Convert to a reqwest `HeaderMap`, rejecting non-ASCII values
    pub fn to_header_map(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (key, value) in &self.map {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                AcquisitionError::invalid_input(format!("Invalid header name '{}': {}", key, e))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                AcquisitionError::invalid_input(format!("Invalid header value for '{}': {}", key, e))
            })?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

/// Factory owning the shared HTTP client
///
/// The client is constructed on first use and reused for every subsequent
/// request (connection pooling, cookie jar). Construction is single-flight:
/// concurrent first callers all await the same initialization.
#[derive(Debug)]
pub struct HttpFactory {
    config: ClientConfig,
    cell: OnceCell<Client>,
}

impl HttpFactory {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            cell: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the shared client, building it on first call
    pub async fn client(&self) -> Result<&Client> {
        self.cell
            .get_or_try_init(|| async { self.build_client() })
            .await
    }

    fn build_client(&self) -> Result<Client> {
        let mut builder = Client::builder()
            .timeout(self.config.timeout)
            .user_agent(&self.config.user_agent)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90));

        if self.config.enable_cookies {
            builder = builder.cookie_store(true);
        }

        Ok(builder.build()?)
    }
}

impl Default for HttpFactory {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_builder() {
        let config = ClientConfig::builder()
            .timeout(Duration::from_secs(60))
            .user_agent("TestAgent/1.0")
            .enable_cookies(false)
            .build();

        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.user_agent, "TestAgent/1.0");
        assert!(!config.enable_cookies);
    }

    #[test]
    fn test_spoofed_headers() {
        let headers = RequestHeaders::spoofed("Agent/1.0");
        assert_eq!(headers.get("Origin"), Some(UPSTREAM_ORIGIN));
        assert_eq!(headers.get("Referer"), Some("https://music.youtube.com/"));
        assert_eq!(headers.get("User-Agent"), Some("Agent/1.0"));
        assert!(!headers.contains_cookie());
    }

    #[test]
    fn test_cookie_and_range() {
        let headers = RequestHeaders::spoofed("Agent/1.0")
            .with_cookie(Some("SID=abc"))
            .with_range(1024);

        assert!(headers.contains_cookie());
        assert_eq!(headers.get("Range"), Some("bytes=1024-"));

        let no_cookie = RequestHeaders::new().with_cookie(None);
        assert!(!no_cookie.contains_cookie());
    }

    #[test]
    fn test_header_map_conversion() {
        let headers = RequestHeaders::spoofed("Agent/1.0").with_cookie(Some("SID=abc"));
        let map = headers.to_header_map().unwrap();
        assert_eq!(map.get("origin").unwrap(), UPSTREAM_ORIGIN);
        assert_eq!(map.get("cookie").unwrap(), "SID=abc");
    }

    #[tokio::test]
    async fn test_factory_returns_same_client() {
        let factory = HttpFactory::default();
        let a = factory.client().await.unwrap() as *const Client;
        let b = factory.client().await.unwrap() as *const Client;
        assert_eq!(a, b);
    }
}
