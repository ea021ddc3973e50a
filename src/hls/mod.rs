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


//! HLS acquisition
//!
//! Ties manifest resolution and segment assembly together behind the three
//! operations the orchestrator needs: a full download, a bounded prefix for
//! fast playback start, and the background pass that completes a prefix into
//! a full cache entry.

pub mod assembler;
pub mod manifest;

// Re-export commonly used types
pub use assembler::{SegmentFetcher, STREAM_AHEAD_SEGMENTS};
pub use manifest::{ManifestOutline, ManifestResolver};

use crate::acquisition::manager::HlsAcquirer;
use crate::api::client::{HttpFactory, RequestHeaders};
use crate::cache::{CacheCategory, CacheStore, CacheVariant};
use crate::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Container extension for assembled HLS audio (fMP4 segments)
const ASSEMBLED_EXTENSION: &str = "m4a";

/// Manifest-to-cache-entry engine
pub struct HlsEngine {
    resolver: ManifestResolver,
    fetcher: SegmentFetcher,
    store: CacheStore,
}

impl HlsEngine {
    pub fn new(http: Arc<HttpFactory>, store: CacheStore) -> Self {
        Self {
            resolver: ManifestResolver::new(Arc::clone(&http)),
            fetcher: SegmentFetcher::new(http),
            store,
        }
    }

    /// Download and assemble the whole playlist into a complete cache entry
    ///
    /// Any segment failure aborts the run and discards the scratch directory.
    pub async fn download_full(
        &self,
        asset_id: &str,
        manifest_url: &str,
        headers: &RequestHeaders,
        category: CacheCategory,
    ) -> Result<PathBuf> {
        let outline = self.resolver.resolve(manifest_url, headers).await?;
        let scratch = self.store.segments_dir(asset_id);

        let result = async {
            let parts = self
                .fetcher
                .fetch_segments(&outline, headers, &scratch, None)
                .await?;
            let target =
                self.store
                    .entry_path(asset_id, category, CacheVariant::Complete, ASSEMBLED_EXTENSION);
            assembler::assemble(&parts, &target).await?;
            self.store.verify_or_remove(&target, None).await?;
            Ok(target)
        }
        .await;

        assembler::discard_scratch(&scratch).await;

        if let Ok(target) = &result {
            info!(asset_id, path = %target.display(), "full HLS download assembled");
        }
        result
    }

    /// Download the init segment plus the first segments into a partial entry
    ///
    /// The scratch directory is kept so [`Self::complete_download`] can skip
    /// everything this pass already fetched.
    pub async fn download_prefix(
        &self,
        asset_id: &str,
        manifest_url: &str,
        headers: &RequestHeaders,
    ) -> Result<PathBuf> {
        let outline = self.resolver.resolve(manifest_url, headers).await?;
        let scratch = self.store.segments_dir(asset_id);

        let result = async {
            let parts = self
                .fetcher
                .fetch_segments(&outline, headers, &scratch, Some(STREAM_AHEAD_SEGMENTS))
                .await?;
            let target = self.store.entry_path(
                asset_id,
                CacheCategory::Streaming,
                CacheVariant::Partial,
                ASSEMBLED_EXTENSION,
            );
            assembler::assemble(&parts, &target).await?;
            self.store.verify_or_remove(&target, None).await?;
            Ok(target)
        }
        .await;

        if result.is_err() {
            assembler::discard_scratch(&scratch).await;
        } else {
            debug!(asset_id, "bounded prefix assembled, scratch retained");
        }
        result
    }

    /// Complete a bounded download into a full cache entry
    ///
    /// Reuses segments left in the scratch directory, fetches the rest, then
    /// replaces the partial entry. On failure the partial and scratch remain
    /// so the next attempt resumes where this one stopped.
    pub async fn complete_download(
        &self,
        asset_id: &str,
        manifest_url: &str,
        headers: &RequestHeaders,
    ) -> Result<PathBuf> {
        let outline = self.resolver.resolve(manifest_url, headers).await?;
        let scratch = self.store.segments_dir(asset_id);

        let parts = self
            .fetcher
            .fetch_segments(&outline, headers, &scratch, None)
            .await?;
        let target = self.store.entry_path(
            asset_id,
            CacheCategory::Streaming,
            CacheVariant::Complete,
            ASSEMBLED_EXTENSION,
        );
        assembler::assemble(&parts, &target).await?;
        self.store.verify_or_remove(&target, None).await?;

        self.store.cleanup_partial(asset_id).await;
        assembler::discard_scratch(&scratch).await;

        info!(asset_id, path = %target.display(), "background completion finished");
        Ok(target)
    }
}

#[async_trait]
impl HlsAcquirer for HlsEngine {
    async fn download_full(
        &self,
        asset_id: &str,
        manifest_url: &str,
        headers: &RequestHeaders,
        category: CacheCategory,
    ) -> Result<PathBuf> {
        HlsEngine::download_full(self, asset_id, manifest_url, headers, category).await
    }

    async fn download_prefix(
        &self,
        asset_id: &str,
        manifest_url: &str,
        headers: &RequestHeaders,
    ) -> Result<PathBuf> {
        HlsEngine::download_prefix(self, asset_id, manifest_url, headers).await
    }

    async fn complete_download(
        &self,
        asset_id: &str,
        manifest_url: &str,
        headers: &RequestHeaders,
    ) -> Result<PathBuf> {
        HlsEngine::complete_download(self, asset_id, manifest_url, headers).await
    }
}
