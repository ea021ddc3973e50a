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


//! Error types for the acquisition engine
//!
//! One `thiserror` enum covers the whole crate. Components report failure as
//! typed results and never panic across module boundaries; only the
//! acquisition orchestrator escalates to the terminal `NoStreamingData`
//! variant, and only after every fallback strategy has been exhausted.

use thiserror::Error;

/// Result type alias using our AcquisitionError type
pub type Result<T> = std::result::Result<T, AcquisitionError>;

/// Main error type for the acquisition engine
#[derive(Error, Debug)]
pub enum AcquisitionError {
    // ===== Format negotiation =====

    /// No client profile yielded a playable format
    #[error("Format negotiation failed for asset {0}: no client profile yielded a playable format")]
    NegotiationFailed(String),

    /// A format carried a signature cipher that could not be resolved
    #[error("Signature cipher could not be resolved: {0}")]
    CipherUnresolved(String),

    // ===== Manifest parsing =====

    /// Manifest fetch or parse failure, no audio rendition, or zero segments
    #[error("Manifest unavailable: {reason}")]
    ManifestUnavailable {
        reason: String,
        /// Manifest URL if known
        url: Option<String>,
    },

    // ===== Segment fetching =====

    /// A segment download failed (any segment in full mode, or within the
    /// bounded prefix in streaming mode)
    #[error("Segment {index} of {total} failed: {message}")]
    SegmentFetchFailed {
        index: usize,
        total: usize,
        message: String,
    },

    // ===== Cache / downloads =====

    /// Size verification failed after an assembly or download completed
    #[error("Cache write verification failed for {path}: got {actual} bytes, expected at least {expected}")]
    CacheWriteFailed {
        path: String,
        expected: u64,
        actual: u64,
    },

    /// Network connectivity error
    #[error("Network error: {message}")]
    NetworkError {
        message: String,
        /// Whether this error might be transient
        is_transient: bool,
    },

    /// Wall-clock timeout on a whole-file download attempt
    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    // ===== Policy =====

    /// A strategy required a session cookie that is absent
    #[error("A session cookie is required for this strategy")]
    NotAuthenticated,

    /// Terminal error: every acquisition strategy failed.
    /// Carries the last failure of both the download and the streaming chain.
    #[error("No streaming data available for asset {asset_id} (download: {download_error}; streaming: {streaming_error})")]
    NoStreamingData {
        asset_id: String,
        download_error: String,
        streaming_error: String,
    },

    // ===== General =====

    /// Generic input validation error
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error that should not normally occur
    #[error("Internal error: {0}")]
    InternalError(String),

    // ===== External library errors =====

    /// HTTP client error from reqwest
    #[error("HTTP client error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// URL parse error
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),
}

// Helper methods for creating common errors
impl AcquisitionError {
    /// Create a ManifestUnavailable error
    pub fn manifest_unavailable<S: Into<String>>(reason: S, url: Option<String>) -> Self {
        AcquisitionError::ManifestUnavailable {
            reason: reason.into(),
            url,
        }
    }

    /// Create a SegmentFetchFailed error
    pub fn segment_failed<S: Into<String>>(index: usize, total: usize, message: S) -> Self {
        AcquisitionError::SegmentFetchFailed {
            index,
            total,
            message: message.into(),
        }
    }

    /// Create a CacheWriteFailed error for a path
    pub fn cache_write_failed(path: &std::path::Path, expected: u64, actual: u64) -> Self {
        AcquisitionError::CacheWriteFailed {
            path: path.display().to_string(),
            expected,
            actual,
        }
    }

    /// Create a NetworkError
    pub fn network_error<S: Into<String>>(message: S, is_transient: bool) -> Self {
        AcquisitionError::NetworkError {
            message: message.into(),
            is_transient,
        }
    }

    /// Create an InvalidInput error with a message
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        AcquisitionError::InvalidInput(message.into())
    }

    /// Create an InternalError with a message
    pub fn internal<S: Into<String>>(message: S) -> Self {
        AcquisitionError::InternalError(message.into())
    }

    /// Check if the error is worth retrying on another transport or strategy
    ///
    /// Returns `true` for transient conditions:
    /// - Network errors marked as transient
    /// - Timeouts
    /// - Segment failures (the manifest itself may still be good)
    pub fn is_retryable(&self) -> bool {
        match self {
            AcquisitionError::NetworkError { is_transient, .. } => *is_transient,
            AcquisitionError::Timeout(_) => true,
            AcquisitionError::SegmentFetchFailed { .. } => true,
            AcquisitionError::ReqwestError(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Whether this is the terminal, user-facing error
    pub fn is_terminal(&self) -> bool {
        matches!(self, AcquisitionError::NoStreamingData { .. })
    }

    /// Short message suitable for surfacing in the app UI
    pub fn user_message(&self) -> String {
        match self {
            AcquisitionError::NoStreamingData { .. } => {
                "This track cannot be played right now".to_string()
            }
            AcquisitionError::NotAuthenticated => "Sign in to play this track".to_string(),
            AcquisitionError::Timeout(_) => "The connection timed out".to_string(),
            AcquisitionError::NetworkError { .. } | AcquisitionError::ReqwestError(_) => {
                "A network error occurred".to_string()
            }
            _ => "Playback failed".to_string(),
        }
    }
}
