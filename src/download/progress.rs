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


//! Download progress tracking and reporting
//!
//! Progress snapshots are cheap to clone and serializable so the app shell
//! can forward them straight to its UI layer. Speed is a moving average over
//! a short sample window; emission is throttled so a fast CDN does not flood
//! the callback.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// How often a throttled tracker emits at most
const EMIT_INTERVAL: Duration = Duration::from_millis(250);

/// Sample window for the moving-average speed
const SPEED_WINDOW: Duration = Duration::from_secs(5);

/// Progress snapshot for a single download
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadProgress {
    /// Asset this download belongs to
    pub asset_id: String,

    /// Bytes written so far
    pub bytes_downloaded: u64,

    /// Total bytes when known
    pub total_bytes: Option<u64>,

    /// Percentage complete (0.0 - 100.0) when the total is known
    pub percent_complete: Option<f64>,

    /// Moving-average speed in bytes per second
    pub speed_bps: f64,
}

/// Moving-average speed over a sliding sample window
#[derive(Debug)]
struct SpeedTracker {
    samples: VecDeque<(Instant, u64)>,
}

impl SpeedTracker {
    fn new() -> Self {
        Self {
            samples: VecDeque::new(),
        }
    }

    fn record(&mut self, total_bytes: u64) {
        let now = Instant::now();
        self.samples.push_back((now, total_bytes));
        while let Some(&(t, _)) = self.samples.front() {
            if now.duration_since(t) > SPEED_WINDOW && self.samples.len() > 2 {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    fn speed_bps(&self) -> f64 {
        let (first, last) = match (self.samples.front(), self.samples.back()) {
            (Some(first), Some(last)) if first.0 < last.0 => (first, last),
            _ => return 0.0,
        };
        let elapsed = last.0.duration_since(first.0).as_secs_f64();
        let bytes = last.1.saturating_sub(first.1);
        bytes as f64 / elapsed
    }
}

/// Throttled progress tracker for one download
#[derive(Debug)]
pub struct ProgressTracker {
    asset_id: String,
    total_bytes: Option<u64>,
    bytes_downloaded: u64,
    speed: SpeedTracker,
    last_emit: Option<Instant>,
}

impl ProgressTracker {
    pub fn new<S: Into<String>>(asset_id: S, total_bytes: Option<u64>) -> Self {
        Self {
            asset_id: asset_id.into(),
            total_bytes,
            bytes_downloaded: 0,
            speed: SpeedTracker::new(),
            last_emit: None,
        }
    }

    /// Total became known mid-download (from a Content-Length header)
    pub fn set_total(&mut self, total: u64) {
        self.total_bytes = Some(total);
    }

    pub fn bytes_downloaded(&self) -> u64 {
        self.bytes_downloaded
    }

    /// Record newly written bytes; returns a snapshot when one is due
    pub fn record(&mut self, new_bytes: u64) -> Option<DownloadProgress> {
        self.bytes_downloaded += new_bytes;
        self.speed.record(self.bytes_downloaded);

        let now = Instant::now();
        let due = match self.last_emit {
            Some(last) => now.duration_since(last) >= EMIT_INTERVAL,
            None => true,
        };
        if !due {
            return None;
        }
        self.last_emit = Some(now);
        Some(self.snapshot())
    }

    /// Unthrottled snapshot, for the final emission after completion
    pub fn snapshot(&self) -> DownloadProgress {
        let percent = self.total_bytes.filter(|&t| t > 0).map(|t| {
            (self.bytes_downloaded as f64 / t as f64 * 100.0).min(100.0)
        });
        DownloadProgress {
            asset_id: self.asset_id.clone(),
            bytes_downloaded: self.bytes_downloaded,
            total_bytes: self.total_bytes,
            percent_complete: percent,
            speed_bps: self.speed.speed_bps(),
        }
    }
}
