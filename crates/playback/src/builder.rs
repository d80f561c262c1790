//! # Builder for PlaybackConfig
//!
//! Fluent construction of a [`PlaybackConfig`].
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use playback_engine::{PlaybackConfig, QueuePolicy};
//!
//! let config = PlaybackConfig::builder()
//!     .with_name("channel-1")
//!     .with_timeout(Duration::from_secs(20))
//!     .with_user_agent("MyPlayer/1.0")
//!     .with_header("Referer", "https://example.com/")
//!     .with_max_pending_segments(8)
//!     .build();
//!
//! assert_eq!(
//!     config.queue_config.policy,
//!     QueuePolicy::Bounded { max_pending_segments: 8 }
//! );
//! ```

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

use crate::config::{PlaybackConfig, QueuePolicy};

/// Builder for creating PlaybackConfig instances with a fluent API
#[derive(Debug, Clone)]
pub struct PlaybackConfigBuilder {
    config: PlaybackConfig,
}

impl PlaybackConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: PlaybackConfig::default(),
        }
    }

    /// Set the stream name used in log lines
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the overall timeout for each HTTP request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.http_config.timeout = timeout;
        self
    }

    /// Set the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.http_config.connect_timeout = timeout;
        self
    }

    /// Set whether to follow redirects
    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.config.http_config.follow_redirects = follow;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.http_config.user_agent = user_agent.into();
        self
    }

    /// Add a custom HTTP header; invalid names or values are ignored
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.as_ref().parse::<reqwest::header::HeaderName>(),
            HeaderValue::from_str(value.as_ref()),
        ) {
            self.config.http_config.headers.insert(name, value);
        }
        self
    }

    /// Set all HTTP headers, replacing any existing headers
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.config.http_config.headers = headers;
        self
    }

    /// Set the playlist download timeout
    pub fn with_playlist_timeout(mut self, timeout: Duration) -> Self {
        self.config.playlist_config.fetch_timeout = timeout;
        self
    }

    /// Set the fragment download timeout
    pub fn with_fragment_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetcher_config.fragment_timeout = timeout;
        self
    }

    /// Set transport retries for fragment downloads
    pub fn with_fragment_retries(mut self, retries: u32, delay_base: Duration) -> Self {
        self.config.fetcher_config.max_fragment_retries = retries;
        self.config.fetcher_config.retry_delay_base = delay_base;
        self
    }

    /// Pause fetching while `max` segments are waiting for the sink.
    /// A bound of zero would never fetch and is raised to one.
    pub fn with_max_pending_segments(mut self, max: usize) -> Self {
        self.config.queue_config.policy = QueuePolicy::Bounded {
            max_pending_segments: max.max(1),
        };
        self
    }

    /// Let the pending queue grow without limit
    pub fn with_unbounded_queue(mut self) -> Self {
        self.config.queue_config.policy = QueuePolicy::Unbounded;
        self
    }

    /// Build the PlaybackConfig instance
    pub fn build(self) -> PlaybackConfig {
        self.config
    }
}

impl Default for PlaybackConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
