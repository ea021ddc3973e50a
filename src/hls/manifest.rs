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


//! HLS manifest resolution
//!
//! Two levels of playlist exist: a master playlist that lists renditions
//! (audio, video, subtitles) and a media playlist that lists the actual
//! segments. The resolver accepts either: given a master playlist it first
//! locates the audio rendition's media playlist, then walks that into a
//! [`ManifestOutline`]. Relative segment URIs are resolved against the
//! playlist URL that contained them.

use crate::api::client::{HttpFactory, RequestHeaders};
use crate::error::{AcquisitionError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;
use url::Url;

lazy_static! {
    /// URI attribute inside an EXT-X-MEDIA or EXT-X-MAP tag
    static ref URI_ATTR: Regex = Regex::new(r#"URI="([^"]+)""#).unwrap();
}

/// Flat description of a media playlist: ordered segments plus an optional
/// initialization segment that must precede them in any assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestOutline {
    pub init_segment_url: Option<String>,
    pub segment_urls: Vec<String>,
}

impl ManifestOutline {
    /// Total number of files an assembly of this outline will fetch
    pub fn fetch_count(&self) -> usize {
        self.segment_urls.len() + usize::from(self.init_segment_url.is_some())
    }
}

/// Whether the playlist text is a media playlist (lists segments directly)
/// rather than a master playlist (lists renditions)
fn is_media_playlist(text: &str) -> bool {
    text.lines().any(|line| line.starts_with("#EXTINF"))
}

/// Extract the audio rendition's media-playlist URL from a master playlist
fn audio_rendition_url(text: &str, base: &Url) -> Result<Option<String>> {
    for line in text.lines() {
        if !line.starts_with("#EXT-X-MEDIA:") || !line.contains("TYPE=AUDIO") {
            continue;
        }
        if let Some(captures) = URI_ATTR.captures(line) {
            let resolved = base.join(&captures[1])?;
            return Ok(Some(resolved.into()));
        }
    }
    Ok(None)
}

/// Walk a media playlist into an outline, resolving relative URIs
fn parse_media_playlist(text: &str, base: &Url) -> Result<ManifestOutline> {
    let mut init_segment_url = None;
    let mut segment_urls = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("#EXT-X-MAP:") {
            if let Some(captures) = URI_ATTR.captures(line) {
                init_segment_url = Some(base.join(&captures[1])?.into());
            }
        } else if !line.starts_with('#') {
            segment_urls.push(base.join(line)?.into());
        }
    }

    if segment_urls.is_empty() {
        return Err(AcquisitionError::manifest_unavailable(
            "media playlist contains no segments",
            Some(base.as_str().to_string()),
        ));
    }

    Ok(ManifestOutline {
        init_segment_url,
        segment_urls,
    })
}

/// Fetches and parses manifests into segment outlines
pub struct ManifestResolver {
    http: Arc<HttpFactory>,
}

impl ManifestResolver {
    pub fn new(http: Arc<HttpFactory>) -> Self {
        Self { http }
    }

    /// Resolve a manifest URL (master or media) into a segment outline
    pub async fn resolve(
        &self,
        manifest_url: &str,
        headers: &RequestHeaders,
    ) -> Result<ManifestOutline> {
        let url = Url::parse(manifest_url)?;
        let text = self.fetch_playlist(&url, headers).await?;

        if is_media_playlist(&text) {
            return parse_media_playlist(&text, &url);
        }

        // Master playlist: descend into the audio rendition.
        let rendition = audio_rendition_url(&text, &url)?.ok_or_else(|| {
            AcquisitionError::manifest_unavailable(
                "master playlist has no audio rendition",
                Some(manifest_url.to_string()),
            )
        })?;

        debug!(rendition = %rendition, "descending into audio rendition");

        let rendition_url = Url::parse(&rendition)?;
        let media_text = self.fetch_playlist(&rendition_url, headers).await?;

        if !is_media_playlist(&media_text) {
            return Err(AcquisitionError::manifest_unavailable(
                "audio rendition did not resolve to a media playlist",
                Some(rendition),
            ));
        }

        parse_media_playlist(&media_text, &rendition_url)
    }

    async fn fetch_playlist(&self, url: &Url, headers: &RequestHeaders) -> Result<String> {
        let client = self.http.client().await?;
        let response = client
            .get(url.clone())
            .headers(headers.to_header_map()?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AcquisitionError::manifest_unavailable(
                format!("playlist fetch returned {}", response.status()),
                Some(url.as_str().to_string()),
            ));
        }

        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://cdn.example.com/hls/master.m3u8").unwrap()
    }

    const MASTER: &str = r#"#EXTM3U
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="audio",NAME="main",DEFAULT=YES,URI="audio/index.m3u8"
#EXT-X-STREAM-INF:BANDWIDTH=1280000,AUDIO="audio"
video/index.m3u8
"#;

    const MEDIA: &str = r#"#EXTM3U
#EXT-X-VERSION:7
#EXT-X-TARGETDURATION:10
#EXT-X-MAP:URI="init.mp4"
#EXTINF:9.98,
seg_000.m4s
#EXTINF:9.98,
seg_001.m4s
#EXTINF:4.21,
https://other.example.com/seg_002.m4s
#EXT-X-ENDLIST
"#;

    #[test]
    fn test_master_vs_media_detection() {
        assert!(!is_media_playlist(MASTER));
        assert!(is_media_playlist(MEDIA));
    }

    #[test]
    fn test_audio_rendition_resolved_against_base() {
        let rendition = audio_rendition_url(MASTER, &base()).unwrap().unwrap();
        assert_eq!(rendition, "https://cdn.example.com/hls/audio/index.m3u8");
    }

    #[test]
    fn test_master_without_audio_rendition() {
        let master = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1280000\nvideo/index.m3u8\n";
        assert!(audio_rendition_url(master, &base()).unwrap().is_none());
    }

    #[test]
    fn test_media_playlist_outline() {
        let media_base = Url::parse("https://cdn.example.com/hls/audio/index.m3u8").unwrap();
        let outline = parse_media_playlist(MEDIA, &media_base).unwrap();

        assert_eq!(
            outline.init_segment_url.as_deref(),
            Some("https://cdn.example.com/hls/audio/init.mp4")
        );
        assert_eq!(
            outline.segment_urls,
            vec![
                "https://cdn.example.com/hls/audio/seg_000.m4s",
                "https://cdn.example.com/hls/audio/seg_001.m4s",
                "https://other.example.com/seg_002.m4s",
            ]
        );
        assert_eq!(outline.fetch_count(), 4);
    }

    #[test]
    fn test_empty_media_playlist_is_an_error() {
        let empty = "#EXTM3U\n#EXT-X-ENDLIST\n";
        let err = parse_media_playlist(empty, &base()).unwrap_err();
        assert!(matches!(err, AcquisitionError::ManifestUnavailable { .. }));
    }

    #[test]
    fn test_no_init_segment_is_fine() {
        let media = "#EXTM3U\n#EXTINF:10,\nseg_000.ts\n#EXT-X-ENDLIST\n";
        let outline = parse_media_playlist(media, &base()).unwrap();
        assert!(outline.init_segment_url.is_none());
        assert_eq!(outline.fetch_count(), 1);
    }
}
