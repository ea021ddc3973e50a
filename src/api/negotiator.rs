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


//! Format negotiation against the upstream player endpoint
//!
//! For a given asset id the negotiator walks the fixed [`ClientProfile`]
//! order, requests player metadata under each identity, and selects the best
//! audio-only format for the desired quality tier. A profile attempt that
//! fails (HTTP error, unparseable response, no usable format) logs a warning
//! and moves on to the next profile; only exhausting every profile yields
//! `Ok(None)`.
//!
//! Stream URLs arrive in one of two shapes:
//! - a direct `url` field, used as-is;
//! - a `signatureCipher` form-encoded triple (`s`, `sp`, `url`) whose `s`
//!   parameter must be unscrambled by a session-scoped [`CipherTransform`]
//!   before being appended to the URL under the `sp` parameter name.

use crate::api::client::{HttpFactory, RequestHeaders};
use crate::api::profiles::{ClientProfile, CLIENT_PROFILES};
use crate::error::{AcquisitionError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use url::form_urlencoded;

/// Player endpoint used for format negotiation
const PLAYER_ENDPOINT: &str = "https://music.youtube.com/youtubei/v1/player";

/// Desired audio quality tier, ordered from worst to best
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioQuality {
    Low,
    Medium,
    High,
    Lossless,
}

impl AudioQuality {
    /// Map the upstream quality label onto a tier
    pub fn from_label(label: &str) -> Self {
        match label {
            "AUDIO_QUALITY_LOW" => AudioQuality::Low,
            "AUDIO_QUALITY_MEDIUM" => AudioQuality::Medium,
            "AUDIO_QUALITY_HIGH" => AudioQuality::High,
            _ => AudioQuality::Medium,
        }
    }
}

/// Audio container derived from the format's MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioCodec {
    /// AAC in an MP4 container
    M4a,
    /// Opus in a WebM container
    Webm,
    /// MP3
    Mp3,
    /// An HLS manifest rather than a progressive stream
    Hls,
    /// Anything else, container kept verbatim
    Other(String),
}

impl AudioCodec {
    /// Derive the codec container from a MIME type string
    pub fn from_mime(mime: &str) -> Self {
        let container = mime.split(';').next().unwrap_or(mime).trim();
        match container {
            "audio/mp4" | "audio/m4a" => AudioCodec::M4a,
            "audio/webm" => AudioCodec::Webm,
            "audio/mpeg" | "audio/mp3" => AudioCodec::Mp3,
            "application/x-mpegURL" | "application/vnd.apple.mpegurl" => AudioCodec::Hls,
            other => AudioCodec::Other(other.to_string()),
        }
    }

    /// Derive the codec from a local file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "m4a" | "mp4" => AudioCodec::M4a,
            "webm" => AudioCodec::Webm,
            "mp3" => AudioCodec::Mp3,
            "m3u8" => AudioCodec::Hls,
            other => AudioCodec::Other(other.to_string()),
        }
    }

    /// File extension used for cache entries of this codec
    pub fn extension(&self) -> &str {
        match self {
            AudioCodec::M4a => "m4a",
            AudioCodec::Webm => "webm",
            AudioCodec::Mp3 => "mp3",
            AudioCodec::Hls => "m3u8",
            AudioCodec::Other(_) => "bin",
        }
    }
}

/// A resolved, playable audio format
///
/// Produced by negotiation; immutable. The URL may be time-limited, so a
/// descriptor is only valid for the acquisition attempt that produced it.
#[derive(Debug, Clone)]
pub struct FormatDescriptor {
    /// Playable URL, or a local filesystem path when `local` is set
    pub url: String,
    pub codec: AudioCodec,
    pub quality: AudioQuality,
    pub bitrate: Option<u32>,
    pub content_length: Option<u64>,
    /// Headers the caller must attach when fetching `url` itself
    pub headers: RequestHeaders,
    /// Whether `url` points at a file already on local disk
    pub local: bool,
}

impl FormatDescriptor {
    /// Rewrite the descriptor to point at a cached local file
    pub fn into_local(mut self, path: &Path) -> Self {
        self.url = path.display().to_string();
        self.local = true;
        self.headers = RequestHeaders::new();
        self
    }
}

// ===== Upstream response shapes =====
//
// Explicit serde shapes rather than speculative field probing; anything the
// upstream omits simply deserializes to None.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    streaming_data: Option<StreamingData>,
    playability_status: Option<PlayabilityStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayabilityStatus {
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamingData {
    adaptive_formats: Option<Vec<RawFormat>>,
    formats: Option<Vec<RawFormat>>,
    hls_manifest_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFormat {
    url: Option<String>,
    signature_cipher: Option<String>,
    mime_type: String,
    bitrate: Option<u32>,
    /// The upstream serializes this as a decimal string
    content_length: Option<String>,
    audio_quality: Option<String>,
}

impl RawFormat {
    fn is_audio_only(&self) -> bool {
        self.mime_type.starts_with("audio/")
    }

    fn quality(&self) -> AudioQuality {
        self.audio_quality
            .as_deref()
            .map(AudioQuality::from_label)
            .unwrap_or(AudioQuality::Medium)
    }

    fn content_length_bytes(&self) -> Option<u64> {
        self.content_length.as_deref().and_then(|s| s.parse().ok())
    }
}

/// Session-scoped transform that unscrambles a ciphered signature string
///
/// The concrete transform depends on the upstream player session; installing
/// one is the caller's concern. With no transform installed, ciphered formats
/// are skipped and negotiation moves to the next profile.
pub trait CipherTransform: Send + Sync {
    fn transform(&self, scrambled: &str) -> Result<String>;
}

/// Resolve a `signatureCipher` triple into a playable URL
///
/// The cipher value is form-encoded: `s` (scrambled signature), `sp` (the
/// query parameter name the unscrambled signature goes under, usually `sig`),
/// and `url` (the bare stream URL).
fn resolve_cipher(cipher: &str, transform: &dyn CipherTransform) -> Result<String> {
    let mut scrambled = None;
    let mut param = None;
    let mut base_url = None;

    for (key, value) in form_urlencoded::parse(cipher.as_bytes()) {
        match key.as_ref() {
            "s" => scrambled = Some(value.into_owned()),
            "sp" => param = Some(value.into_owned()),
            "url" => base_url = Some(value.into_owned()),
            _ => {}
        }
    }

    let scrambled = scrambled
        .ok_or_else(|| AcquisitionError::CipherUnresolved("missing 's' parameter".to_string()))?;
    let base_url = base_url
        .ok_or_else(|| AcquisitionError::CipherUnresolved("missing 'url' parameter".to_string()))?;
    let param = param.unwrap_or_else(|| "signature".to_string());

    let signature = transform.transform(&scrambled)?;
    let separator = if base_url.contains('?') { '&' } else { '?' };

    Ok(format!(
        "{}{}{}={}",
        base_url,
        separator,
        param,
        form_urlencoded::byte_serialize(signature.as_bytes()).collect::<String>()
    ))
}

/// Select the best audio-only format for the desired tier
///
/// Policy: highest bitrate among formats matching the desired tier; when no
/// format matches the tier exactly, highest bitrate of the best tier below
/// it, then anything audio-only at all.
fn select_best_audio<'a>(formats: &'a [RawFormat], desired: AudioQuality) -> Option<&'a RawFormat> {
    let mut audio: Vec<&RawFormat> = formats.iter().filter(|f| f.is_audio_only()).collect();
    if audio.is_empty() {
        return None;
    }

    // Best quality not above the desired tier, then bitrate as tiebreaker.
    // Formats above the tier only win when nothing at or below it exists.
    audio.sort_by_key(|f| {
        let q = f.quality();
        let over_budget = q > desired;
        (over_budget, std::cmp::Reverse(q), std::cmp::Reverse(f.bitrate.unwrap_or(0)))
    });

    audio.first().copied()
}

/// Format negotiator over the fixed client-profile order
pub struct FormatNegotiator {
    http: Arc<HttpFactory>,
    cipher: Option<Arc<dyn CipherTransform>>,
}

impl FormatNegotiator {
    pub fn new(http: Arc<HttpFactory>) -> Self {
        Self { http, cipher: None }
    }

    /// Install a session-scoped signature transform
    pub fn with_cipher(mut self, cipher: Arc<dyn CipherTransform>) -> Self {
        self.cipher = Some(cipher);
        self
    }

    /// Negotiate a direct, playable audio format for the asset
    ///
    /// Walks every client profile in order; per-profile failures are logged
    /// and skipped. Returns `Ok(None)` once every profile is exhausted.
    pub async fn negotiate(
        &self,
        asset_id: &str,
        quality: AudioQuality,
        cookie: Option<&str>,
    ) -> Result<Option<FormatDescriptor>> {
        for profile in CLIENT_PROFILES {
            match self.attempt_profile(profile, asset_id, quality, cookie).await {
                Ok(Some(descriptor)) => {
                    debug!(
                        asset_id,
                        profile = profile.name,
                        codec = ?descriptor.codec,
                        "negotiated direct format"
                    );
                    return Ok(Some(descriptor));
                }
                Ok(None) => {
                    debug!(asset_id, profile = profile.name, "profile yielded no usable format");
                }
                Err(e) => {
                    warn!(asset_id, profile = profile.name, error = %e, "profile attempt failed");
                }
            }
        }

        Ok(None)
    }

    /// Fetch the HLS manifest URL for the asset, if any profile exposes one
    pub async fn manifest_url(&self, asset_id: &str, cookie: Option<&str>) -> Result<Option<String>> {
        for profile in CLIENT_PROFILES {
            match self.fetch_player_response(profile, asset_id, cookie).await {
                Ok(response) => {
                    if let Some(url) = response
                        .streaming_data
                        .and_then(|s| s.hls_manifest_url)
                    {
                        debug!(asset_id, profile = profile.name, "found HLS manifest url");
                        return Ok(Some(url));
                    }
                }
                Err(e) => {
                    warn!(asset_id, profile = profile.name, error = %e, "manifest lookup failed");
                }
            }
        }

        Ok(None)
    }

    /// One profile attempt: fetch metadata, select a format, resolve its URL
    async fn attempt_profile(
        &self,
        profile: &ClientProfile,
        asset_id: &str,
        quality: AudioQuality,
        cookie: Option<&str>,
    ) -> Result<Option<FormatDescriptor>> {
        let response = self.fetch_player_response(profile, asset_id, cookie).await?;

        if let Some(status) = response
            .playability_status
            .as_ref()
            .and_then(|p| p.status.as_deref())
        {
            if status != "OK" {
                return Err(AcquisitionError::invalid_input(format!(
                    "playability status {}",
                    status
                )));
            }
        }

        let streaming = match response.streaming_data {
            Some(s) => s,
            None => return Ok(None),
        };

        let mut formats = streaming.adaptive_formats.unwrap_or_default();
        formats.extend(streaming.formats.unwrap_or_default());

        let raw = match select_best_audio(&formats, quality) {
            Some(raw) => raw,
            None => return Ok(None),
        };

        // Direct URL preferred; the cipher path only runs when it is absent.
        let url = match (&raw.url, &raw.signature_cipher) {
            (Some(url), _) => url.clone(),
            (None, Some(cipher)) => match &self.cipher {
                Some(transform) => resolve_cipher(cipher, transform.as_ref())?,
                None => {
                    debug!(
                        profile = profile.name,
                        "format requires cipher but no transform installed"
                    );
                    return Ok(None);
                }
            },
            (None, None) => return Ok(None),
        };

        Ok(Some(FormatDescriptor {
            url,
            codec: AudioCodec::from_mime(&raw.mime_type),
            quality: raw.quality(),
            bitrate: raw.bitrate,
            content_length: raw.content_length_bytes(),
            headers: RequestHeaders::spoofed(profile.user_agent).with_cookie(cookie),
            local: false,
        }))
    }

    async fn fetch_player_response(
        &self,
        profile: &ClientProfile,
        asset_id: &str,
        cookie: Option<&str>,
    ) -> Result<PlayerResponse> {
        let client = self.http.client().await?;
        let headers = RequestHeaders::spoofed(profile.user_agent).with_cookie(cookie);

        let response = client
            .post(PLAYER_ENDPOINT)
            .query(&[("prettyPrint", "false")])
            .headers(headers.to_header_map()?)
            .json(&profile.player_request_body(asset_id))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AcquisitionError::network_error(
                format!("player endpoint returned {}", response.status()),
                response.status().is_server_error(),
            ));
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}
