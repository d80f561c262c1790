//! Stream processing context and statistics
//!
//! This module provides the context shared by the components of one playback
//! pipeline: the stream name used to prefix log lines, and the runtime
//! statistics every component updates as fragments and segments move through.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Statistics collected while a stream plays.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Statistics {
    /// Number of playlists delivered to the pipeline
    pub playlists_loaded: usize,
    /// Number of fragment fetches initiated
    pub fragments_requested: usize,
    /// Number of fragments whose bytes arrived
    pub fragments_loaded: usize,
    /// Total fragment payload received, in bytes
    pub fragment_bytes: u64,
    /// Accumulated fragment load time
    pub fragment_load_time: Duration,
    /// Segments produced by the remuxer
    pub segments_produced: usize,
    /// Segments the sink finished ingesting
    pub segments_appended: usize,
    /// Segments the sink failed to ingest
    pub segments_dropped: usize,
    /// Segments discarded because their playlist was replaced
    pub segments_discarded: usize,
    /// Callbacks that arrived for a superseded playlist
    pub stale_callbacks: usize,
    /// Fragments the remuxer reported an error for
    pub remux_failures: usize,
}

impl Statistics {
    /// Average fragment throughput in Mb/s, if anything has been loaded.
    pub fn average_bitrate_mbps(&self) -> Option<f64> {
        let millis = self.fragment_load_time.as_secs_f64() * 1000.0;
        if millis <= 0.0 {
            return None;
        }
        Some(self.fragment_bytes as f64 * 8.0 / (1000.0 * millis))
    }
}

/// Shared context for one playback pipeline
///
/// Cloning the context shares the statistics; the name is copied.
#[derive(Debug, Clone)]
pub struct StreamerContext {
    /// Name of the stream, used as a log prefix
    pub name: String,
    /// Runtime statistics about the stream
    pub statistics: Arc<Mutex<Statistics>>,
}

impl StreamerContext {
    pub fn new() -> Self {
        Self {
            name: "DefaultStreamer".to_string(),
            statistics: Arc::new(Mutex::new(Statistics::default())),
        }
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::new()
        }
    }

    /// Apply an update to the statistics under the lock.
    #[inline]
    pub fn update_stats(&self, update: impl FnOnce(&mut Statistics)) {
        update(&mut self.statistics.lock());
    }

    /// Copy of the current statistics.
    pub fn snapshot(&self) -> Statistics {
        self.statistics.lock().clone()
    }
}

impl Default for StreamerContext {
    fn default() -> Self {
        Self::new()
    }
}
