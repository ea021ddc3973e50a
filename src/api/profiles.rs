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


//! Client identity profiles
//!
//! Different simulated device/platform identities see different format
//! availability from the player endpoint: mobile clients get direct URLs,
//! web clients get ciphered URLs, the TV client tolerates embedded playback.
//! The order below is fixed and chosen for compatibility breadth: the
//! profiles most likely to return a directly playable URL come first.

use serde_json::{json, Value};

/// A simulated device/platform identity used for player requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientProfile {
    /// Short internal name, used in logs
    pub name: &'static str,
    /// Upstream client name sent in the request context
    pub client_name: &'static str,
    /// Upstream client version sent in the request context
    pub client_version: &'static str,
    /// User-Agent matching the simulated platform
    pub user_agent: &'static str,
    /// Whether this client's stream URLs arrive signature-ciphered
    pub serves_ciphered_urls: bool,
}

impl ClientProfile {
    /// Build the JSON body for a player request under this identity
    pub fn player_request_body(&self, asset_id: &str) -> Value {
        json!({
            "context": {
                "client": {
                    "clientName": self.client_name,
                    "clientVersion": self.client_version,
                    "hl": "en",
                    "gl": "US",
                },
            },
            "videoId": asset_id,
            "contentCheckOk": true,
            "racyCheckOk": true,
        })
    }
}

/// Android music client: direct URLs, widest format coverage
pub const ANDROID_MUSIC: ClientProfile = ClientProfile {
    name: "android_music",
    client_name: "ANDROID_MUSIC",
    client_version: "6.42.52",
    user_agent: "com.google.android.apps.youtube.music/6.42.52 (Linux; U; Android 13) gzip",
    serves_ciphered_urls: false,
};

/// iOS music client: direct URLs, good HLS manifest coverage
pub const IOS_MUSIC: ClientProfile = ClientProfile {
    name: "ios_music",
    client_name: "IOS_MUSIC",
    client_version: "6.42",
    user_agent: "com.google.ios.youtubemusic/6.42 (iPhone14,3; U; CPU iOS 16_6 like Mac OS X)",
    serves_ciphered_urls: false,
};

/// Web music client: ciphered URLs, needed for some region-locked assets
pub const WEB_REMIX: ClientProfile = ClientProfile {
    name: "web_remix",
    client_name: "WEB_REMIX",
    client_version: "1.20240101.01.00",
    user_agent: crate::api::client::DEFAULT_USER_AGENT,
    serves_ciphered_urls: true,
};

/// Embedded TV client: last resort for age/embed-restricted assets
pub const TV_EMBEDDED: ClientProfile = ClientProfile {
    name: "tv_embedded",
    client_name: "TVHTML5_SIMPLY_EMBEDDED_PLAYER",
    client_version: "2.0",
    user_agent: "Mozilla/5.0 (PlayStation; PlayStation 4/12.00) AppleWebKit/605.1.15 (KHTML, like Gecko)",
    serves_ciphered_urls: true,
};

/// The fixed negotiation order. Empirically chosen, never randomized.
pub const CLIENT_PROFILES: &[ClientProfile] = &[ANDROID_MUSIC, IOS_MUSIC, WEB_REMIX, TV_EMBEDDED];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_order_is_fixed() {
        let names: Vec<&str> = CLIENT_PROFILES.iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            vec!["android_music", "ios_music", "web_remix", "tv_embedded"]
        );
    }

    #[test]
    fn test_mobile_profiles_serve_direct_urls() {
        assert!(!ANDROID_MUSIC.serves_ciphered_urls);
        assert!(!IOS_MUSIC.serves_ciphered_urls);
        assert!(WEB_REMIX.serves_ciphered_urls);
    }

    #[test]
    fn test_player_request_body_shape() {
        let body = ANDROID_MUSIC.player_request_body("abc123");
        assert_eq!(body["videoId"], "abc123");
        assert_eq!(body["context"]["client"]["clientName"], "ANDROID_MUSIC");
        assert_eq!(body["context"]["client"]["clientVersion"], "6.42.52");
    }
}
