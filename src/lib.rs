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


//! Audio acquisition and local-cache engine
//!
//! Resolves a playable audio resource for a remote track id and makes it
//! durable on local disk. The engine negotiates between direct progressive
//! URLs and adaptive HLS manifests, tolerates expiring and ciphered URLs,
//! supports low-latency streaming (partial file now, background completion)
//! as well as complete offline downloads, and deduplicates concurrent work
//! per asset.
//!
//! The app shell talks to exactly one entry point:
//! [`acquisition::AcquisitionManager::get_stream_url`].

pub mod acquisition;
pub mod api;
pub mod cache;
pub mod download;
pub mod error;
pub mod hls;

pub use acquisition::{
    AcquireOptions, AcquisitionConfig, AcquisitionManager, SessionAuth, StaticAuth,
};
pub use api::{AudioCodec, AudioQuality, ClientConfig, FormatDescriptor};
pub use cache::CacheStore;
pub use error::{AcquisitionError, Result};
