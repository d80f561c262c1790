//! Load timing for playlists and fragments.

use std::time::{Duration, Instant};

/// Timing of one completed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    pub requested_at: Instant,
    pub first_byte_at: Instant,
    pub completed_at: Instant,
    /// Payload length in bytes
    pub length: u64,
}

impl LoadStats {
    /// Stats for a payload that was available immediately.
    pub fn instant(length: u64) -> Self {
        let now = Instant::now();
        Self {
            requested_at: now,
            first_byte_at: now,
            completed_at: now,
            length,
        }
    }

    /// Round trip until the response headers arrived
    pub fn time_to_first_byte(&self) -> Duration {
        self.first_byte_at.saturating_duration_since(self.requested_at)
    }

    pub fn load_time(&self) -> Duration {
        self.completed_at.saturating_duration_since(self.requested_at)
    }

    /// Throughput in Mb/s, 0 when the load took no measurable time.
    pub fn bitrate_mbps(&self) -> f64 {
        let millis = self.load_time().as_secs_f64() * 1000.0;
        if millis <= 0.0 {
            return 0.0;
        }
        self.length as f64 * 8.0 / (1000.0 * millis)
    }
}

/// Measures a load in progress.
#[derive(Debug, Clone, Copy)]
pub struct LoadTimer {
    requested_at: Instant,
    first_byte_at: Option<Instant>,
}

impl LoadTimer {
    pub fn start() -> Self {
        Self {
            requested_at: Instant::now(),
            first_byte_at: None,
        }
    }

    /// Record the first byte; later calls keep the first timestamp.
    pub fn first_byte(&mut self) {
        self.first_byte_at.get_or_insert_with(Instant::now);
    }

    pub fn finish(self, length: u64) -> LoadStats {
        let completed_at = Instant::now();
        LoadStats {
            requested_at: self.requested_at,
            first_byte_at: self.first_byte_at.unwrap_or(completed_at),
            completed_at,
            length,
        }
    }
}
