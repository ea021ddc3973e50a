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


//! Upstream API access
//!
//! This module talks to the upstream player endpoint: HTTP client
//! construction, simulated client identities, and format negotiation.

pub mod client;
pub mod negotiator;
pub mod profiles;

// Re-export commonly used types
pub use client::{ClientConfig, HttpFactory, RequestHeaders};
pub use negotiator::{AudioCodec, AudioQuality, CipherTransform, FormatDescriptor, FormatNegotiator};
pub use profiles::{ClientProfile, CLIENT_PROFILES};
