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


//! On-disk audio cache
//!
//! The cache is the filesystem itself; there is no index database. Layout
//! under the cache root:
//!
//! ```text
//! audio/                      streamed acquisitions
//!   {id}.{ext}                complete entry
//!   {id}_partial.{ext}        bounded-mode prefix, playable but incomplete
//!   {id}_segments/            scratch dir for an in-flight HLS assembly
//! downloads/audio/            explicit offline downloads
//!   {id}.{ext}
//! ```
//!
//! A cache entry is only ever surfaced if it passes the validity check:
//! at least [`MIN_VALID_SIZE`] bytes, and at least [`EXPECTED_SIZE_RATIO`]
//! of the expected size when one is known. Entries that fail the check are
//! deleted on sight so a truncated write can never be served twice.

use crate::error::{AcquisitionError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Smallest file size accepted as a valid audio entry, in bytes
pub const MIN_VALID_SIZE: u64 = 10_000;

/// Fraction of the expected size a file must reach to be considered complete
pub const EXPECTED_SIZE_RATIO: f64 = 0.95;

/// Suffix appended to the id for bounded-mode prefix files
const PARTIAL_SUFFIX: &str = "_partial";

/// Suffix appended to the id for segment scratch directories
const SEGMENTS_SUFFIX: &str = "_segments";

/// Which cache area an entry lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheCategory {
    /// Opportunistic cache filled by streaming playback
    Streaming,
    /// Explicit user-requested offline downloads
    Offline,
}

impl CacheCategory {
    fn subdir(&self) -> &'static str {
        match self {
            CacheCategory::Streaming => "audio",
            CacheCategory::Offline => "downloads/audio",
        }
    }
}

/// Complete entry or bounded-mode prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheVariant {
    Complete,
    Partial,
}

/// Names that belong to in-flight writes, never to servable entries
fn is_temp_name(name: &str) -> bool {
    name.ends_with(".tmp") || name.ends_with(".assembling")
}

/// Keep ids filesystem-safe; anything outside [A-Za-z0-9_-] becomes '_'
pub fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Whether a file of `size` bytes satisfies the cache validity invariant
pub fn is_valid_size(size: u64, expected: Option<u64>) -> bool {
    if size < MIN_VALID_SIZE {
        return false;
    }
    match expected {
        Some(expected) => size as f64 >= expected as f64 * EXPECTED_SIZE_RATIO,
        None => true,
    }
}

/// Filesystem-backed audio cache rooted at a single directory
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for a category, created on demand
    pub async fn category_dir(&self, category: CacheCategory) -> Result<PathBuf> {
        let dir = self.root.join(category.subdir());
        fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Path an entry for `id` would live at
    pub fn entry_path(
        &self,
        id: &str,
        category: CacheCategory,
        variant: CacheVariant,
        extension: &str,
    ) -> PathBuf {
        let stem = match variant {
            CacheVariant::Complete => sanitize_id(id),
            CacheVariant::Partial => format!("{}{}", sanitize_id(id), PARTIAL_SUFFIX),
        };
        self.root
            .join(category.subdir())
            .join(format!("{}.{}", stem, extension))
    }

    /// Scratch directory for an in-flight HLS assembly of `id`
    pub fn segments_dir(&self, id: &str) -> PathBuf {
        self.root
            .join(CacheCategory::Streaming.subdir())
            .join(format!("{}{}", sanitize_id(id), SEGMENTS_SUFFIX))
    }

    /// Find a valid cached entry for `id`, deleting any invalid one found
    ///
    /// The extension is not known at lookup time (it depends on the format
    /// that was negotiated when the entry was written), so the category
    /// directory is scanned for a stem match.
    pub async fn lookup(
        &self,
        id: &str,
        category: CacheCategory,
        variant: CacheVariant,
        expected: Option<u64>,
    ) -> Option<PathBuf> {
        let stem = match variant {
            CacheVariant::Complete => sanitize_id(id),
            CacheVariant::Partial => format!("{}{}", sanitize_id(id), PARTIAL_SUFFIX),
        };
        let dir = self.root.join(category.subdir());

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(_) => return None,
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.file_stem().and_then(|s| s.to_str()) != Some(stem.as_str()) {
                continue;
            }
            // An in-flight write shares the entry's stem; it is neither
            // servable nor ours to delete here.
            if path
                .file_name()
                .and_then(|n| n.to_str())
                .map(is_temp_name)
                .unwrap_or(false)
            {
                continue;
            }
            let meta = match entry.metadata().await {
                Ok(meta) if meta.is_file() => meta,
                _ => continue,
            };

            if is_valid_size(meta.len(), expected) {
                debug!(id, path = %path.display(), size = meta.len(), "cache hit");
                return Some(path);
            }

            warn!(
                id,
                path = %path.display(),
                size = meta.len(),
                "removing invalid cache entry"
            );
            let _ = fs::remove_file(&path).await;
        }

        None
    }

    /// Validate a freshly written file, deleting it on failure
    pub async fn verify_or_remove(&self, path: &Path, expected: Option<u64>) -> Result<u64> {
        let size = match fs::metadata(path).await {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };

        if is_valid_size(size, expected) {
            return Ok(size);
        }

        let _ = fs::remove_file(path).await;
        Err(AcquisitionError::cache_write_failed(
            path,
            expected.unwrap_or(MIN_VALID_SIZE),
            size,
        ))
    }

    /// Drop every trace of `id`: complete entries, partials, scratch
    pub async fn invalidate(&self, id: &str) {
        for category in [CacheCategory::Streaming, CacheCategory::Offline] {
            for variant in [CacheVariant::Complete, CacheVariant::Partial] {
                // lookup with no expectation still deletes undersized files;
                // a valid match is deleted explicitly.
                if let Some(path) = self.lookup(id, category, variant, None).await {
                    let _ = fs::remove_file(&path).await;
                }
            }
        }
        let _ = fs::remove_dir_all(self.segments_dir(id)).await;
        debug!(id, "cache entries invalidated");
    }

    /// Remove the bounded-mode partial entry for `id`, whatever its extension
    pub async fn cleanup_partial(&self, id: &str) {
        let stem = format!("{}{}", sanitize_id(id), PARTIAL_SUFFIX);
        let dir = self.root.join(CacheCategory::Streaming.subdir());

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(_) => return,
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.file_stem().and_then(|s| s.to_str()) == Some(stem.as_str()) {
                let _ = fs::remove_file(&path).await;
            }
        }
    }

    /// Sweep leftover temp artifacts: write-temp files and scratch dirs
    ///
    /// Safe to call at startup; in-flight assemblies should not exist then.
    pub async fn cleanup_temp(&self) -> Result<usize> {
        let mut removed = 0;

        for category in [CacheCategory::Streaming, CacheCategory::Offline] {
            let dir = self.root.join(category.subdir());
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(_) => continue,
            };

            while let Ok(Some(entry)) = entries.next_entry().await {
                let path = entry.path();
                let name = match path.file_name().and_then(|n| n.to_str()) {
                    Some(name) => name,
                    None => continue,
                };

                let is_temp_file = is_temp_name(name);
                let is_scratch_dir = name.ends_with(SEGMENTS_SUFFIX)
                    && entry.metadata().await.map(|m| m.is_dir()).unwrap_or(false);

                if is_temp_file {
                    if fs::remove_file(&path).await.is_ok() {
                        removed += 1;
                    }
                } else if is_scratch_dir {
                    if fs::remove_dir_all(&path).await.is_ok() {
                        removed += 1;
                    }
                }
            }
        }

        if removed > 0 {
            debug!(removed, "swept temp cache artifacts");
        }
        Ok(removed)
    }
}
