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


//! Resumable whole-file downloads
//!
//! The download primitive behind the direct (non-HLS) acquisition path.
//! When the target file already has bytes on disk the first attempt asks for
//! the remainder with a `Range` header and appends on a 206; a server that
//! answers 200 to a ranged request gets the file rewritten from scratch.
//! If the resumed attempt fails the file is discarded and one plain attempt
//! is made before giving up. The whole operation runs under a single wall
//! clock so a stalled CDN cannot hold an acquisition open indefinitely.

use crate::acquisition::manager::FileFetcher;
use crate::api::client::{HttpFactory, RequestHeaders};
use crate::cache::is_valid_size;
use crate::download::progress::{DownloadProgress, ProgressTracker};
use crate::error::{AcquisitionError, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

/// Wall-clock budget for one whole-file download, in seconds
pub const DOWNLOAD_TIMEOUT_SECS: u64 = 60;

/// BufWriter capacity for streamed chunks
const DOWNLOAD_BUFF_SZ: usize = 8 * 1024;

/// Flush to disk at least this often, in bytes written
const DATA_FLUSH_SZ: u64 = 1024 * 1024;

/// Callback invoked with throttled progress snapshots
pub type ProgressCallback = Box<dyn FnMut(DownloadProgress) + Send>;

/// Resumable HTTP downloader over the shared client
pub struct Downloader {
    http: Arc<HttpFactory>,
}

impl Downloader {
    pub fn new(http: Arc<HttpFactory>) -> Self {
        Self { http }
    }

    /// Download `url` into `target`, resuming partial bytes when possible
    ///
    /// Bytes stream into a `.tmp` sibling of the target; only a result that
    /// passes the cache invariant (with `expected` from the negotiated
    /// format's content length) is renamed into the target slot, so a failed
    /// or timed-out attempt never leaves anything at a servable entry path.
    /// An undersized result is deleted and reported as
    /// [`AcquisitionError::CacheWriteFailed`].
    pub async fn download_to_file(
        &self,
        url: &str,
        headers: &RequestHeaders,
        target: &Path,
        expected: Option<u64>,
        mut on_progress: Option<ProgressCallback>,
    ) -> Result<u64> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        let work = target.with_extension("tmp");
        let budget = Duration::from_secs(DOWNLOAD_TIMEOUT_SECS);
        let attempt = self.download_with_fallback(url, headers, &work, expected, &mut on_progress);

        let size = match tokio::time::timeout(budget, attempt).await {
            Ok(result) => result?,
            Err(_) => {
                // The timed-out work file is kept; the next call resumes it.
                warn!(url, target = %target.display(), "download hit the wall clock");
                return Err(AcquisitionError::Timeout(DOWNLOAD_TIMEOUT_SECS));
            }
        };

        if !is_valid_size(size, expected) {
            let _ = fs::remove_file(&work).await;
            return Err(AcquisitionError::cache_write_failed(
                target,
                expected.unwrap_or(crate::cache::MIN_VALID_SIZE),
                size,
            ));
        }

        fs::rename(&work, target).await?;
        Ok(size)
    }

    /// Resumed attempt first, then one clean restart
    async fn download_with_fallback(
        &self,
        url: &str,
        headers: &RequestHeaders,
        work: &Path,
        expected: Option<u64>,
        on_progress: &mut Option<ProgressCallback>,
    ) -> Result<u64> {
        let resume_from = match fs::metadata(work).await {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };

        match self
            .attempt(url, headers, work, resume_from, expected, on_progress)
            .await
        {
            Ok(size) => Ok(size),
            Err(first) => {
                if !first.is_retryable() && resume_from == 0 {
                    return Err(first);
                }
                warn!(url, error = %first, "download attempt failed, retrying clean");
                let _ = fs::remove_file(work).await;
                self.attempt(url, headers, work, 0, expected, on_progress)
                    .await
            }
        }
    }

    async fn attempt(
        &self,
        url: &str,
        headers: &RequestHeaders,
        work: &Path,
        resume_from: u64,
        expected: Option<u64>,
        on_progress: &mut Option<ProgressCallback>,
    ) -> Result<u64> {
        let client = self.http.client().await?;

        let request_headers = if resume_from > 0 {
            headers.clone().with_range(resume_from)
        } else {
            headers.clone()
        };

        let response = client
            .get(url)
            .headers(request_headers.to_header_map()?)
            .send()
            .await?;

        let status = response.status();
        let write_from = match status {
            StatusCode::PARTIAL_CONTENT => resume_from,
            StatusCode::OK => 0,
            s => {
                return Err(AcquisitionError::network_error(
                    format!("download request returned {}", s),
                    s.is_server_error(),
                ));
            }
        };

        let total = expected.or_else(|| {
            response
                .content_length()
                .map(|remaining| write_from + remaining)
        });

        let mut tracker = ProgressTracker::new(
            work.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default(),
            total,
        );
        if write_from > 0 {
            tracker.record(write_from);
            debug!(url, resume_from = write_from, "resuming partial download");
        }

        let file = if write_from > 0 {
            OpenOptions::new().append(true).open(work).await?
        } else {
            fs::File::create(work).await?
        };
        let mut writer = BufWriter::with_capacity(DOWNLOAD_BUFF_SZ, file);
        let mut stream = response.bytes_stream();
        let mut written = write_from;
        let mut next_flush = write_from + DATA_FLUSH_SZ;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;

            if written >= next_flush {
                writer.flush().await?;
                next_flush = written + DATA_FLUSH_SZ;
            }

            if let Some(snapshot) = tracker.record(chunk.len() as u64) {
                if let Some(callback) = on_progress.as_mut() {
                    callback(snapshot);
                }
            }
        }

        writer.flush().await?;

        if let Some(callback) = on_progress.as_mut() {
            callback(tracker.snapshot());
        }

        Ok(written)
    }
}

#[async_trait]
impl FileFetcher for Downloader {
    async fn fetch(
        &self,
        url: &str,
        headers: &RequestHeaders,
        target: PathBuf,
        expected: Option<u64>,
    ) -> Result<u64> {
        self.download_to_file(url, headers, &target, expected, None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheCategory, CacheStore, CacheVariant};
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// Answer exactly one request with a 200, the declared length, and the
    /// given body, then close the connection.
    async fn serve_once(declared_length: usize, body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;

            let header = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                declared_length
            );
            let _ = socket.write_all(header.as_bytes()).await;
            let _ = socket.write_all(&body).await;
            let _ = socket.shutdown().await;
        });

        format!("http://{}/stream", addr)
    }

    #[tokio::test]
    async fn test_truncated_download_never_lands_at_entry_path() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let target =
            store.entry_path("abc123", CacheCategory::Offline, CacheVariant::Complete, "m4a");

        // Server promises 5 MB but delivers 40 KB and hangs up.
        let url = serve_once(5_000_000, vec![0u8; 40_000]).await;
        let downloader = Downloader::new(Arc::new(HttpFactory::default()));

        let result = downloader
            .download_to_file(&url, &RequestHeaders::new(), &target, Some(5_000_000), None)
            .await;

        assert!(result.is_err());
        assert!(!target.exists());

        // A later cache check without a known expected size must still miss.
        let hit = store
            .lookup("abc123", CacheCategory::Offline, CacheVariant::Complete, None)
            .await;
        assert!(hit.is_none());
    }

    #[tokio::test]
    async fn test_completed_download_renamed_into_entry_slot() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let target =
            store.entry_path("abc123", CacheCategory::Offline, CacheVariant::Complete, "m4a");

        let url = serve_once(20_000, vec![7u8; 20_000]).await;
        let downloader = Downloader::new(Arc::new(HttpFactory::default()));

        let size = downloader
            .download_to_file(&url, &RequestHeaders::new(), &target, Some(20_000), None)
            .await
            .unwrap();

        assert_eq!(size, 20_000);
        assert!(target.exists());
        assert!(!target.with_extension("tmp").exists());

        let hit = store
            .lookup("abc123", CacheCategory::Offline, CacheVariant::Complete, Some(20_000))
            .await;
        assert_eq!(hit, Some(target));
    }
}
