use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

// --- Top-Level Configuration ---
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Stream name, used as the log prefix
    pub name: String,
    pub http_config: HttpConfig,
    pub playlist_config: PlaylistConfig,
    pub fetcher_config: FetcherConfig,
    pub queue_config: QueueConfig,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            name: "playback".to_string(),
            http_config: HttpConfig::default(),
            playlist_config: PlaylistConfig::default(),
            fetcher_config: FetcherConfig::default(),
            queue_config: QueueConfig::default(),
        }
    }
}

impl PlaybackConfig {
    pub fn builder() -> crate::builder::PlaybackConfigBuilder {
        crate::builder::PlaybackConfigBuilder::new()
    }
}

// --- HTTP Client Configuration ---
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Overall timeout for one HTTP request
    pub timeout: Duration,
    /// Time allowed to establish a connection
    pub connect_timeout: Duration,
    pub follow_redirects: bool,
    pub user_agent: String,
    /// Headers sent with every request
    pub headers: HeaderMap,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: HttpConfig::get_default_headers(),
        }
    }
}

impl HttpConfig {
    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(
            reqwest::header::ACCEPT_ENCODING,
            HeaderValue::from_static("gzip, deflate"),
        );
        default_headers.insert(
            reqwest::header::CONNECTION,
            HeaderValue::from_static("keep-alive"),
        );
        default_headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));
        default_headers
    }
}

// --- Playlist Configuration ---
#[derive(Debug, Clone)]
pub struct PlaylistConfig {
    pub fetch_timeout: Duration,
}

impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(15),
        }
    }
}

// --- Fetcher Configuration ---
// Retries here belong to the transport; the orchestrator never retries.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub fragment_timeout: Duration,
    pub max_fragment_retries: u32,
    pub retry_delay_base: Duration, // Base for exponential backoff
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            fragment_timeout: Duration::from_secs(10),
            max_fragment_retries: 3,
            retry_delay_base: Duration::from_millis(500),
        }
    }
}

// --- Queue Configuration ---
#[derive(Debug, Clone, Default)]
pub struct QueueConfig {
    pub policy: QueuePolicy,
}

/// What happens when segments are produced faster than the sink drains them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueuePolicy {
    /// Keep fetching; the pending queue may grow without limit.
    #[default]
    Unbounded,
    /// Hold the next fetch while this many segments are pending. A bound of
    /// zero behaves as one.
    Bounded { max_pending_segments: usize },
}

impl QueuePolicy {
    /// Whether a new fetch may start with `pending` segments queued.
    #[inline]
    pub fn allows_fetch(&self, pending: usize) -> bool {
        match self {
            QueuePolicy::Unbounded => true,
            QueuePolicy::Bounded {
                max_pending_segments,
            } => pending < (*max_pending_segments).max(1),
        }
    }
}
