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


//! Segment fetching and file assembly
//!
//! Segments download one at a time into a per-asset scratch directory with
//! deterministic names (`init.bin`, `seg_00000.bin`, ...), so an interrupted
//! or bounded run can be resumed later by skipping files that already exist.
//! Assembly is straight concatenation: the init segment first, then every
//! media segment in playlist order. The assembled size must equal the sum of
//! the part sizes or the output is discarded.

use crate::api::client::{HttpFactory, RequestHeaders};
use crate::error::{AcquisitionError, Result};
use crate::hls::manifest::ManifestOutline;
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

/// Number of media segments fetched in bounded (streaming) mode
pub const STREAM_AHEAD_SEGMENTS: usize = 15;

/// Scratch filename for the init segment
const INIT_NAME: &str = "init.bin";

fn segment_name(index: usize) -> String {
    format!("seg_{:05}.bin", index)
}

/// Downloads playlist segments into a scratch directory and assembles them
pub struct SegmentFetcher {
    http: Arc<HttpFactory>,
}

impl SegmentFetcher {
    pub fn new(http: Arc<HttpFactory>) -> Self {
        Self { http }
    }

    /// Fetch the init segment plus up to `limit` media segments into `scratch`
    ///
    /// Serialized on purpose: segments come from the same CDN host and
    /// parallel fetches trip its rate limiting. Files already present in the
    /// scratch directory are kept as-is, which is what makes the completion
    /// pass cheap after a bounded run.
    ///
    /// Returns the ordered list of scratch files covered by this call.
    pub async fn fetch_segments(
        &self,
        outline: &ManifestOutline,
        headers: &RequestHeaders,
        scratch: &Path,
        limit: Option<usize>,
    ) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(scratch).await?;

        let total = outline.segment_urls.len();
        let wanted = limit.map(|n| n.min(total)).unwrap_or(total);
        let mut parts = Vec::with_capacity(wanted + 1);

        if let Some(init_url) = &outline.init_segment_url {
            let path = scratch.join(INIT_NAME);
            self.fetch_one(init_url, headers, &path, 0, total).await?;
            parts.push(path);
        }

        for (index, url) in outline.segment_urls.iter().take(wanted).enumerate() {
            let path = scratch.join(segment_name(index));
            self.fetch_one(url, headers, &path, index + 1, total).await?;
            parts.push(path);
        }

        debug!(
            fetched = parts.len(),
            total,
            bounded = limit.is_some(),
            "segment fetch pass complete"
        );

        Ok(parts)
    }

    /// Fetch a single segment unless its scratch file already exists
    async fn fetch_one(
        &self,
        url: &str,
        headers: &RequestHeaders,
        path: &Path,
        index: usize,
        total: usize,
    ) -> Result<()> {
        match fs::metadata(path).await {
            Ok(meta) if meta.len() > 0 => return Ok(()),
            _ => {}
        }

        let client = self.http.client().await?;
        let response = client
            .get(url)
            .headers(headers.to_header_map()?)
            .send()
            .await
            .map_err(|e| AcquisitionError::segment_failed(index, total, e.to_string()))?;

        if !response.status().is_success() {
            return Err(AcquisitionError::segment_failed(
                index,
                total,
                format!("HTTP {}", response.status()),
            ));
        }

        // Write to a temp name first so a partially written segment never
        // passes the exists-with-bytes check above.
        let tmp = path.with_extension("tmp");
        let file = fs::File::create(&tmp).await?;
        let mut writer = BufWriter::new(file);
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| AcquisitionError::segment_failed(index, total, e.to_string()))?;
            writer.write_all(&chunk).await?;
        }

        writer.flush().await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }
}

/// Concatenate part files into `target`, in the order given
///
/// Writes through a temp file and renames on success. The assembled size is
/// checked against the sum of the part sizes; on mismatch the output is
/// removed and the call fails.
pub async fn assemble(parts: &[PathBuf], target: &Path) -> Result<u64> {
    if parts.is_empty() {
        return Err(AcquisitionError::internal("nothing to assemble"));
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).await?;
    }

    let tmp = target.with_extension("assembling");
    let concat = async {
        let file = fs::File::create(&tmp).await?;
        let mut writer = BufWriter::new(file);
        let mut expected: u64 = 0;

        for part in parts {
            let mut reader = fs::File::open(part).await?;
            expected += fs::metadata(part).await?.len();
            tokio::io::copy(&mut reader, &mut writer).await?;
        }

        writer.flush().await?;
        Ok::<u64, AcquisitionError>(expected)
    }
    .await;

    let expected = match concat {
        Ok(expected) => expected,
        Err(e) => {
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }
    };

    let actual = fs::metadata(&tmp).await?.len();
    if actual != expected {
        warn!(target = %target.display(), expected, actual, "assembly size mismatch");
        let _ = fs::remove_file(&tmp).await;
        return Err(AcquisitionError::cache_write_failed(target, expected, actual));
    }

    fs::rename(&tmp, target).await?;
    Ok(actual)
}

/// Remove a scratch directory and everything in it, ignoring absence
pub async fn discard_scratch(scratch: &Path) {
    if let Err(e) = fs::remove_dir_all(scratch).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(scratch = %scratch.display(), error = %e, "failed to remove scratch dir");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn write_part(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).await.unwrap();
        path
    }

    /// Outline whose URLs point at a closed local port; any fetch that is
    /// not satisfied from the scratch dir fails immediately.
    fn unreachable_outline(total: usize) -> ManifestOutline {
        ManifestOutline {
            init_segment_url: Some("http://127.0.0.1:9/init".to_string()),
            segment_urls: (0..total)
                .map(|i| format!("http://127.0.0.1:9/seg/{}", i))
                .collect(),
        }
    }

    async fn seed_scratch(scratch: &Path, segments: usize) {
        fs::create_dir_all(scratch).await.unwrap();
        write_part(scratch, INIT_NAME, b"INIT").await;
        for index in 0..segments {
            write_part(scratch, &segment_name(index), b"DATA").await;
        }
    }

    #[tokio::test]
    async fn test_fetch_segments_bounded_takes_prefix_from_scratch() {
        let dir = TempDir::new().unwrap();
        let scratch = dir.path().join("abc_segments");
        seed_scratch(&scratch, 40).await;

        let fetcher = SegmentFetcher::new(Arc::new(crate::api::client::HttpFactory::default()));
        let parts = fetcher
            .fetch_segments(
                &unreachable_outline(40),
                &RequestHeaders::new(),
                &scratch,
                Some(STREAM_AHEAD_SEGMENTS),
            )
            .await
            .unwrap();

        assert_eq!(parts.len(), STREAM_AHEAD_SEGMENTS + 1);
        assert!(parts[0].ends_with(INIT_NAME));
        assert!(parts[STREAM_AHEAD_SEGMENTS].ends_with(segment_name(STREAM_AHEAD_SEGMENTS - 1)));
    }

    #[tokio::test]
    async fn test_fetch_segments_limit_clamps_to_playlist_length() {
        let dir = TempDir::new().unwrap();
        let scratch = dir.path().join("abc_segments");
        seed_scratch(&scratch, 5).await;

        let fetcher = SegmentFetcher::new(Arc::new(crate::api::client::HttpFactory::default()));
        let parts = fetcher
            .fetch_segments(&unreachable_outline(5), &RequestHeaders::new(), &scratch, Some(100))
            .await
            .unwrap();

        assert_eq!(parts.len(), 6);
    }

    #[tokio::test]
    async fn test_fetch_segments_resumes_past_seeded_files() {
        let dir = TempDir::new().unwrap();
        let scratch = dir.path().join("abc_segments");
        seed_scratch(&scratch, 10).await;

        let fetcher = SegmentFetcher::new(Arc::new(crate::api::client::HttpFactory::default()));
        let err = fetcher
            .fetch_segments(
                &unreachable_outline(40),
                &RequestHeaders::new(),
                &scratch,
                Some(STREAM_AHEAD_SEGMENTS),
            )
            .await
            .unwrap_err();

        // Segments 0..10 are served from scratch; the first network fetch is
        // segment index 10, reported 1-based after the init segment.
        assert!(matches!(
            err,
            AcquisitionError::SegmentFetchFailed { index: 11, total: 40, .. }
        ));
        for index in 0..10 {
            assert!(scratch.join(segment_name(index)).exists());
        }
    }

    #[test]
    fn test_segment_names_sort_in_order() {
        let mut names: Vec<String> = (0..120).rev().map(segment_name).collect();
        names.sort();
        assert_eq!(names[0], "seg_00000.bin");
        assert_eq!(names[119], "seg_00119.bin");
    }

    #[tokio::test]
    async fn test_assemble_concatenates_in_order() {
        let dir = TempDir::new().unwrap();
        let parts = vec![
            write_part(dir.path(), INIT_NAME, b"INIT").await,
            write_part(dir.path(), "seg_00000.bin", b"AAAA").await,
            write_part(dir.path(), "seg_00001.bin", b"BB").await,
        ];

        let target = dir.path().join("out.m4a");
        let size = assemble(&parts, &target).await.unwrap();

        assert_eq!(size, 10);
        assert_eq!(fs::read(&target).await.unwrap(), b"INITAAAABB");
        assert!(!target.with_extension("assembling").exists());
    }

    #[tokio::test]
    async fn test_assemble_empty_parts_fails() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.m4a");
        assert!(assemble(&[], &target).await.is_err());
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_assemble_missing_part_fails_cleanly() {
        let dir = TempDir::new().unwrap();
        let parts = vec![
            write_part(dir.path(), "seg_00000.bin", b"AAAA").await,
            dir.path().join("seg_00001.bin"),
        ];

        let target = dir.path().join("out.m4a");
        assert!(assemble(&parts, &target).await.is_err());
        assert!(!target.exists());
        assert!(!target.with_extension("assembling").exists());
    }

    #[tokio::test]
    async fn test_discard_scratch_tolerates_absence() {
        let dir = TempDir::new().unwrap();
        let scratch = dir.path().join("abc_segments");
        discard_scratch(&scratch).await;

        fs::create_dir_all(&scratch).await.unwrap();
        write_part(&scratch, "seg_00000.bin", b"x").await;
        discard_scratch(&scratch).await;
        assert!(!scratch.exists());
    }
}
