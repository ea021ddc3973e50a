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


//! Acquisition orchestration
//!
//! [`AcquisitionManager::get_stream_url`] is the single public entry point of
//! the engine. Per call it runs one of two strategy chains:
//!
//! - **Download-preferred**: valid cache entry, else negotiate a direct
//!   format and cache it (degrading to the raw URL when caching fails), else
//!   assemble the full HLS playlist.
//! - **Streaming-preferred**: negotiate a direct format (cached to a local
//!   file only when a session cookie exists, since native players cannot
//!   forward auth headers to media sub-requests), else fall back to HLS:
//!   unauthenticated callers get the manifest URL for native adaptive
//!   playback, authenticated callers get a bounded-prefix partial file plus
//!   a deduplicated background job that completes the cache entry.
//!
//! Every intermediate failure is logged and absorbed; only exhausting both
//! chains surfaces the terminal `NoStreamingData` error, which carries the
//! last failure of each chain.

use crate::acquisition::jobs::JobRegistry;
use crate::api::client::{ClientConfig, HttpFactory, RequestHeaders, DEFAULT_USER_AGENT};
use crate::api::negotiator::{
    AudioCodec, AudioQuality, FormatDescriptor, FormatNegotiator,
};
use crate::cache::{CacheCategory, CacheStore, CacheVariant};
use crate::download::Downloader;
use crate::error::{AcquisitionError, Result};
use crate::hls::HlsEngine;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Engine configuration: cache root plus HTTP client settings
///
/// Bounded-mode depth and the whole-file download budget are policy
/// constants, not configuration; see [`crate::hls::STREAM_AHEAD_SEGMENTS`]
/// and [`crate::download::DOWNLOAD_TIMEOUT_SECS`].
#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    pub cache_root: PathBuf,
    pub client: ClientConfig,
}

impl AcquisitionConfig {
    pub fn new<P: Into<PathBuf>>(cache_root: P) -> Self {
        Self {
            cache_root: cache_root.into(),
            client: ClientConfig::default(),
        }
    }

    pub fn builder<P: Into<PathBuf>>(cache_root: P) -> AcquisitionConfigBuilder {
        AcquisitionConfigBuilder {
            config: Self::new(cache_root),
        }
    }
}

/// Builder for AcquisitionConfig
#[derive(Debug)]
pub struct AcquisitionConfigBuilder {
    config: AcquisitionConfig,
}

impl AcquisitionConfigBuilder {
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config.client.timeout = timeout;
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.config.client.user_agent = user_agent.into();
        self
    }

    pub fn enable_cookies(mut self, enable: bool) -> Self {
        self.config.client.enable_cookies = enable;
        self
    }

    pub fn build(self) -> AcquisitionConfig {
        self.config
    }
}

/// Options for one acquisition call
#[derive(Debug, Clone, Copy)]
pub struct AcquireOptions {
    pub quality: AudioQuality,
    /// Prefer a durable complete file over fastest playback start
    pub prefer_downloadable: bool,
}

impl Default for AcquireOptions {
    fn default() -> Self {
        Self {
            quality: AudioQuality::Medium,
            prefer_downloadable: false,
        }
    }
}

/// Supplies direct formats and manifest URLs for an asset
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FormatSource: Send + Sync {
    async fn negotiate<'a>(
        &self,
        asset_id: &str,
        quality: AudioQuality,
        cookie: Option<&'a str>,
    ) -> Result<Option<FormatDescriptor>>;

    async fn manifest_url<'a>(
        &self,
        asset_id: &str,
        cookie: Option<&'a str>,
    ) -> Result<Option<String>>;
}

/// Turns a manifest URL into assembled cache entries
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HlsAcquirer: Send + Sync {
    async fn download_full(
        &self,
        asset_id: &str,
        manifest_url: &str,
        headers: &RequestHeaders,
        category: CacheCategory,
    ) -> Result<PathBuf>;

    async fn download_prefix(
        &self,
        asset_id: &str,
        manifest_url: &str,
        headers: &RequestHeaders,
    ) -> Result<PathBuf>;

    async fn complete_download(
        &self,
        asset_id: &str,
        manifest_url: &str,
        headers: &RequestHeaders,
    ) -> Result<PathBuf>;
}

/// Downloads a single remote file to a local target
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileFetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        headers: &RequestHeaders,
        target: PathBuf,
        expected: Option<u64>,
    ) -> Result<u64>;
}

/// Supplies the optional session cookie
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionAuth: Send + Sync {
    async fn session_cookie(&self) -> Option<String>;
}

/// A fixed cookie (or none), for wiring and tests
pub struct StaticAuth(pub Option<String>);

#[async_trait]
impl SessionAuth for StaticAuth {
    async fn session_cookie(&self) -> Option<String> {
        self.0.clone()
    }
}

#[async_trait]
impl FormatSource for FormatNegotiator {
    async fn negotiate<'a>(
        &self,
        asset_id: &str,
        quality: AudioQuality,
        cookie: Option<&'a str>,
    ) -> Result<Option<FormatDescriptor>> {
        FormatNegotiator::negotiate(self, asset_id, quality, cookie).await
    }

    async fn manifest_url<'a>(
        &self,
        asset_id: &str,
        cookie: Option<&'a str>,
    ) -> Result<Option<String>> {
        FormatNegotiator::manifest_url(self, asset_id, cookie).await
    }
}

/// Top-level acquisition policy over injectable collaborators
pub struct AcquisitionManager {
    store: CacheStore,
    formats: Arc<dyn FormatSource>,
    hls: Arc<dyn HlsAcquirer>,
    files: Arc<dyn FileFetcher>,
    auth: Arc<dyn SessionAuth>,
    jobs: Arc<JobRegistry>,
}

impl AcquisitionManager {
    pub fn new(
        store: CacheStore,
        formats: Arc<dyn FormatSource>,
        hls: Arc<dyn HlsAcquirer>,
        files: Arc<dyn FileFetcher>,
        auth: Arc<dyn SessionAuth>,
    ) -> Self {
        Self {
            store,
            formats,
            hls,
            files,
            auth,
            jobs: JobRegistry::new(),
        }
    }

    /// Standard wiring over one shared HTTP client
    pub fn standard(config: AcquisitionConfig, auth: Arc<dyn SessionAuth>) -> Self {
        let http = Arc::new(HttpFactory::new(config.client));
        let store = CacheStore::new(config.cache_root);
        Self::new(
            store.clone(),
            Arc::new(FormatNegotiator::new(Arc::clone(&http))),
            Arc::new(HlsEngine::new(Arc::clone(&http), store)),
            Arc::new(Downloader::new(http)),
            auth,
        )
    }

    pub fn jobs(&self) -> &Arc<JobRegistry> {
        &self.jobs
    }

    /// Resolve a playable resource for `asset_id`
    ///
    /// The sole public entry point. Returns a descriptor pointing either at
    /// a local cached file or at a remote URL with the headers the caller
    /// must attach.
    pub async fn get_stream_url(
        &self,
        asset_id: &str,
        options: AcquireOptions,
    ) -> Result<FormatDescriptor> {
        let cookie = self.auth.session_cookie().await;
        debug!(
            asset_id,
            quality = ?options.quality,
            downloadable = options.prefer_downloadable,
            authenticated = cookie.is_some(),
            "acquisition requested"
        );

        if options.prefer_downloadable {
            self.acquire_downloadable(asset_id, options.quality, cookie.as_deref())
                .await
        } else {
            self.acquire_streaming(asset_id, options.quality, cookie.as_deref())
                .await
        }
    }

    /// Download-preferred chain: cache, direct format, full HLS
    async fn acquire_downloadable(
        &self,
        asset_id: &str,
        quality: AudioQuality,
        cookie: Option<&str>,
    ) -> Result<FormatDescriptor> {
        // Either category satisfies a download-preferred request.
        for category in [CacheCategory::Offline, CacheCategory::Streaming] {
            if let Some(path) = self
                .store
                .lookup(asset_id, category, CacheVariant::Complete, None)
                .await
            {
                return Ok(local_descriptor(&path, quality));
            }
        }

        let download_error = match self.try_direct_download(asset_id, quality, cookie).await {
            Ok(descriptor) => return Ok(descriptor),
            Err(e) => e.to_string(),
        };

        let streaming_error = match self.try_full_hls(asset_id, quality, cookie).await {
            Ok(descriptor) => return Ok(descriptor),
            Err(e) => e.to_string(),
        };

        Err(AcquisitionError::NoStreamingData {
            asset_id: asset_id.to_string(),
            download_error,
            streaming_error,
        })
    }

    /// Negotiate a direct format and persist it; degrade to the raw URL if
    /// only the caching step fails
    async fn try_direct_download(
        &self,
        asset_id: &str,
        quality: AudioQuality,
        cookie: Option<&str>,
    ) -> Result<FormatDescriptor> {
        let format = self
            .formats
            .negotiate(asset_id, quality, cookie)
            .await?
            .ok_or_else(|| AcquisitionError::NegotiationFailed(asset_id.to_string()))?;

        let target = self.store.entry_path(
            asset_id,
            CacheCategory::Offline,
            CacheVariant::Complete,
            format.codec.extension(),
        );

        match self
            .files
            .fetch(&format.url, &format.headers, target.clone(), format.content_length)
            .await
        {
            Ok(size) => {
                info!(asset_id, size, path = %target.display(), "direct format cached");
                Ok(format.into_local(&target))
            }
            Err(e) => {
                // The URL itself is still playable; let the caller stream it.
                warn!(asset_id, error = %e, "caching failed, serving raw URL");
                Ok(format)
            }
        }
    }

    /// Assemble the complete HLS playlist into a cache entry
    async fn try_full_hls(
        &self,
        asset_id: &str,
        quality: AudioQuality,
        cookie: Option<&str>,
    ) -> Result<FormatDescriptor> {
        let manifest = self
            .formats
            .manifest_url(asset_id, cookie)
            .await?
            .ok_or_else(|| {
                AcquisitionError::manifest_unavailable("no manifest URL for asset", None)
            })?;

        let headers = RequestHeaders::spoofed(DEFAULT_USER_AGENT).with_cookie(cookie);
        let path = self
            .hls
            .download_full(asset_id, &manifest, &headers, CacheCategory::Offline)
            .await?;

        Ok(local_descriptor(&path, quality))
    }

    /// Streaming-preferred chain: direct format, then HLS
    async fn acquire_streaming(
        &self,
        asset_id: &str,
        quality: AudioQuality,
        cookie: Option<&str>,
    ) -> Result<FormatDescriptor> {
        let download_error = match self.try_direct_streaming(asset_id, quality, cookie).await {
            Ok(descriptor) => return Ok(descriptor),
            Err(e) => e.to_string(),
        };

        let streaming_error = match self.try_hls_streaming(asset_id, quality, cookie).await {
            Ok(descriptor) => return Ok(descriptor),
            Err(e) => e.to_string(),
        };

        Err(AcquisitionError::NoStreamingData {
            asset_id: asset_id.to_string(),
            download_error,
            streaming_error,
        })
    }

    /// Direct format for streaming; materialized locally only when a session
    /// cookie exists
    async fn try_direct_streaming(
        &self,
        asset_id: &str,
        quality: AudioQuality,
        cookie: Option<&str>,
    ) -> Result<FormatDescriptor> {
        let format = self
            .formats
            .negotiate(asset_id, quality, cookie)
            .await?
            .ok_or_else(|| AcquisitionError::NegotiationFailed(asset_id.to_string()))?;

        if cookie.is_none() {
            // Unauthenticated playback can hit the URL directly.
            return Ok(format);
        }

        // Native players cannot attach the cookie to media sub-requests, so
        // authenticated playback goes through a local file. A valid entry
        // from an earlier call is reused rather than re-downloaded.
        if let Some(path) = self
            .store
            .lookup(
                asset_id,
                CacheCategory::Streaming,
                CacheVariant::Complete,
                format.content_length,
            )
            .await
        {
            return Ok(format.into_local(&path));
        }

        let target = self.store.entry_path(
            asset_id,
            CacheCategory::Streaming,
            CacheVariant::Complete,
            format.codec.extension(),
        );
        let size = self
            .files
            .fetch(&format.url, &format.headers, target.clone(), format.content_length)
            .await?;

        info!(asset_id, size, "direct format materialized for streaming");
        Ok(format.into_local(&target))
    }

    /// HLS streaming fallback: manifest URL when unauthenticated, bounded
    /// prefix plus background completion when authenticated
    async fn try_hls_streaming(
        &self,
        asset_id: &str,
        quality: AudioQuality,
        cookie: Option<&str>,
    ) -> Result<FormatDescriptor> {
        let manifest = self
            .formats
            .manifest_url(asset_id, cookie)
            .await?
            .ok_or_else(|| {
                AcquisitionError::manifest_unavailable("no manifest URL for asset", None)
            })?;

        let cookie = match cookie {
            Some(cookie) => cookie,
            None => {
                // Native adaptive playback handles the manifest itself.
                return Ok(FormatDescriptor {
                    url: manifest,
                    codec: AudioCodec::Hls,
                    quality,
                    bitrate: None,
                    content_length: None,
                    headers: RequestHeaders::spoofed(DEFAULT_USER_AGENT),
                    local: false,
                });
            }
        };

        let headers = RequestHeaders::spoofed(DEFAULT_USER_AGENT).with_cookie(Some(cookie));

        // Join an in-flight completion job instead of assembling twice.
        if self.jobs.is_running(asset_id).await {
            debug!(asset_id, "awaiting in-flight completion job");
            self.jobs.wait(asset_id).await;
            if let Some(path) = self
                .store
                .lookup(asset_id, CacheCategory::Streaming, CacheVariant::Complete, None)
                .await
            {
                return Ok(local_descriptor(&path, quality));
            }
        }

        let partial = self
            .hls
            .download_prefix(asset_id, &manifest, &headers)
            .await?;

        self.spawn_completion(asset_id, manifest, headers).await;
        Ok(local_descriptor(&partial, quality))
    }

    /// Schedule the partial-to-complete background job, deduplicated per id
    async fn spawn_completion(&self, asset_id: &str, manifest: String, headers: RequestHeaders) {
        let hls = Arc::clone(&self.hls);
        let id = asset_id.to_string();

        self.jobs
            .spawn(asset_id, async move {
                hls.complete_download(&id, &manifest, &headers).await?;
                Ok(())
            })
            .await;
    }
}

/// Descriptor for an already-cached local file
fn local_descriptor(path: &Path, quality: AudioQuality) -> FormatDescriptor {
    let codec = path
        .extension()
        .and_then(|e| e.to_str())
        .map(AudioCodec::from_extension)
        .unwrap_or(AudioCodec::Other("unknown".to_string()));

    FormatDescriptor {
        url: path.display().to_string(),
        codec,
        quality,
        bitrate: None,
        content_length: None,
        headers: RequestHeaders::new(),
        local: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::fs;

    fn remote_format(url: &str) -> FormatDescriptor {
        FormatDescriptor {
            url: url.to_string(),
            codec: AudioCodec::M4a,
            quality: AudioQuality::High,
            bitrate: Some(256_000),
            content_length: Some(4_500_000),
            headers: RequestHeaders::spoofed("Agent/1.0"),
            local: false,
        }
    }

    struct Harness {
        dir: TempDir,
        formats: MockFormatSource,
        hls: MockHlsAcquirer,
        files: MockFileFetcher,
        cookie: Option<String>,
    }

    impl Harness {
        fn new(cookie: Option<&str>) -> Self {
            Self {
                dir: TempDir::new().unwrap(),
                formats: MockFormatSource::new(),
                hls: MockHlsAcquirer::new(),
                files: MockFileFetcher::new(),
                cookie: cookie.map(String::from),
            }
        }

        fn store(&self) -> CacheStore {
            CacheStore::new(self.dir.path())
        }

        fn build(self) -> (AcquisitionManager, TempDir) {
            let store = self.store();
            let manager = AcquisitionManager::new(
                store,
                Arc::new(self.formats),
                Arc::new(self.hls),
                Arc::new(self.files),
                Arc::new(StaticAuth(self.cookie)),
            );
            (manager, self.dir)
        }
    }

    async fn seed_entry(store: &CacheStore, id: &str, category: CacheCategory, size: usize) {
        let path = store.entry_path(id, category, CacheVariant::Complete, "m4a");
        fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        fs::write(&path, vec![0u8; size]).await.unwrap();
    }

    #[tokio::test]
    async fn test_unauthenticated_streaming_returns_raw_url() {
        let mut harness = Harness::new(None);
        harness
            .formats
            .expect_negotiate()
            .returning(|_, _, _| Ok(Some(remote_format("https://cdn.example.com/a"))));
        let (manager, _dir) = harness.build();

        let descriptor = manager
            .get_stream_url("abc123", AcquireOptions::default())
            .await
            .unwrap();

        assert_eq!(descriptor.url, "https://cdn.example.com/a");
        assert!(!descriptor.local);
    }

    #[tokio::test]
    async fn test_authenticated_streaming_materializes_local_file() {
        let mut harness = Harness::new(Some("SID=x"));
        harness
            .formats
            .expect_negotiate()
            .returning(|_, _, _| Ok(Some(remote_format("https://cdn.example.com/a"))));
        harness
            .files
            .expect_fetch()
            .times(1)
            .returning(|_, _, _, _| Ok(4_500_000));
        let (manager, dir) = harness.build();

        let descriptor = manager
            .get_stream_url("abc123", AcquireOptions::default())
            .await
            .unwrap();

        assert!(descriptor.local);
        assert!(descriptor.url.starts_with(dir.path().to_str().unwrap()));
        assert!(descriptor.url.ends_with("audio/abc123.m4a"));
        assert!(!descriptor.headers.contains_cookie());
    }

    #[tokio::test]
    async fn test_download_mode_serves_valid_cache_entry_without_negotiating() {
        let harness = Harness::new(Some("SID=x"));
        let store = harness.store();
        seed_entry(&store, "abc123", CacheCategory::Offline, 20_000).await;
        let (manager, _dir) = harness.build();

        let options = AcquireOptions {
            quality: AudioQuality::High,
            prefer_downloadable: true,
        };
        let descriptor = manager.get_stream_url("abc123", options).await.unwrap();

        assert!(descriptor.local);
        assert_eq!(descriptor.codec, AudioCodec::M4a);
    }

    #[tokio::test]
    async fn test_download_mode_degrades_to_raw_url_when_caching_fails() {
        let mut harness = Harness::new(None);
        harness
            .formats
            .expect_negotiate()
            .returning(|_, _, _| Ok(Some(remote_format("https://cdn.example.com/a"))));
        harness.files.expect_fetch().returning(|_, _, target, _| {
            Err(AcquisitionError::cache_write_failed(&target, 4_500_000, 12))
        });
        let (manager, _dir) = harness.build();

        let options = AcquireOptions {
            quality: AudioQuality::High,
            prefer_downloadable: true,
        };
        let descriptor = manager.get_stream_url("abc123", options).await.unwrap();

        assert!(!descriptor.local);
        assert_eq!(descriptor.url, "https://cdn.example.com/a");
    }

    #[tokio::test]
    async fn test_download_mode_falls_back_to_full_hls() {
        let mut harness = Harness::new(None);
        harness.formats.expect_negotiate().returning(|_, _, _| Ok(None));
        harness
            .formats
            .expect_manifest_url()
            .returning(|_, _| Ok(Some("https://m.example.com/i.m3u8".to_string())));

        let dir_path = harness.dir.path().join("audio/abc123.m4a");
        harness
            .hls
            .expect_download_full()
            .withf(|_, _, _, category| *category == CacheCategory::Offline)
            .returning(move |_, _, _, _| Ok(dir_path.clone()));
        let (manager, _dir) = harness.build();

        let options = AcquireOptions {
            quality: AudioQuality::Medium,
            prefer_downloadable: true,
        };
        let descriptor = manager.get_stream_url("abc123", options).await.unwrap();
        assert!(descriptor.local);
        assert!(descriptor.url.ends_with("abc123.m4a"));
    }

    #[tokio::test]
    async fn test_terminal_error_reports_both_chains() {
        let mut harness = Harness::new(None);
        harness.formats.expect_negotiate().returning(|_, _, _| Ok(None));
        harness.formats.expect_manifest_url().returning(|_, _| {
            Err(AcquisitionError::manifest_unavailable(
                "manifest fetch returned 404",
                None,
            ))
        });
        let (manager, _dir) = harness.build();

        let options = AcquireOptions {
            quality: AudioQuality::Medium,
            prefer_downloadable: true,
        };
        let err = manager.get_stream_url("abc123", options).await.unwrap_err();

        match err {
            AcquisitionError::NoStreamingData {
                asset_id,
                download_error,
                streaming_error,
            } => {
                assert_eq!(asset_id, "abc123");
                assert!(download_error.contains("abc123"));
                assert!(streaming_error.contains("404"));
            }
            other => panic!("expected NoStreamingData, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_unauthenticated_hls_fallback_returns_manifest_url() {
        let mut harness = Harness::new(None);
        harness.formats.expect_negotiate().returning(|_, _, _| Ok(None));
        harness
            .formats
            .expect_manifest_url()
            .returning(|_, _| Ok(Some("https://m.example.com/i.m3u8".to_string())));
        let (manager, _dir) = harness.build();

        let descriptor = manager
            .get_stream_url("abc123", AcquireOptions::default())
            .await
            .unwrap();

        assert_eq!(descriptor.url, "https://m.example.com/i.m3u8");
        assert_eq!(descriptor.codec, AudioCodec::Hls);
        assert!(!descriptor.local);
    }

    #[tokio::test]
    async fn test_authenticated_hls_fallback_runs_bounded_mode_and_completion() {
        let mut harness = Harness::new(Some("SID=x"));
        harness.formats.expect_negotiate().returning(|_, _, _| Ok(None));
        harness
            .formats
            .expect_manifest_url()
            .returning(|_, _| Ok(Some("https://m.example.com/i.m3u8".to_string())));

        let partial = harness.dir.path().join("audio/abc123_partial.m4a");
        let complete = harness.dir.path().join("audio/abc123.m4a");
        harness.hls.expect_download_prefix().times(1).returning({
            let partial = partial.clone();
            move |_, _, headers| {
                assert!(headers.contains_cookie());
                Ok(partial.clone())
            }
        });
        harness.hls.expect_complete_download().times(1).returning({
            let complete = complete.clone();
            move |_, _, _| Ok(complete.clone())
        });
        let (manager, _dir) = harness.build();

        let descriptor = manager
            .get_stream_url("abc123", AcquireOptions::default())
            .await
            .unwrap();

        assert!(descriptor.local);
        assert!(descriptor.url.ends_with("abc123_partial.m4a"));

        // The background job deregisters itself once completion finishes.
        manager.jobs().wait("abc123").await;
        assert!(!manager.jobs().is_running("abc123").await);
    }

    #[tokio::test]
    async fn test_streaming_reuses_existing_complete_entry_when_authenticated() {
        let mut harness = Harness::new(Some("SID=x"));
        let store = harness.store();
        seed_entry(&store, "abc123", CacheCategory::Streaming, 4_500_000).await;
        harness
            .formats
            .expect_negotiate()
            .returning(|_, _, _| Ok(Some(remote_format("https://cdn.example.com/a"))));
        // No expect_fetch: re-downloading a valid entry would panic the mock.
        let (manager, _dir) = harness.build();

        let descriptor = manager
            .get_stream_url("abc123", AcquireOptions::default())
            .await
            .unwrap();

        assert!(descriptor.local);
        assert!(descriptor.url.ends_with("audio/abc123.m4a"));
    }
}
