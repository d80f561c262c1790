use std::sync::Arc;

use hls::HlsError;

#[derive(Debug, thiserror::Error, Clone)]
pub enum PlaybackError {
    #[error("Playlist error: {0}")]
    PlaylistError(String),
    #[error("Playlist parse error: {0}")]
    ParseError(#[from] HlsError),
    #[error("Fragment fetch error: {0}")]
    FragmentFetchError(String),
    #[error("Network error: {source}")]
    NetworkError {
        #[from]
        source: Arc<reqwest::Error>,
    },
    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: Arc<std::io::Error>,
    },
    #[error("Playback pipeline has stopped")]
    Stopped,
}

// Foreign errors are held in an Arc so that PlaybackError stays Clone
impl From<reqwest::Error> for PlaybackError {
    fn from(err: reqwest::Error) -> Self {
        PlaybackError::NetworkError {
            source: Arc::new(err),
        }
    }
}

impl From<std::io::Error> for PlaybackError {
    fn from(err: std::io::Error) -> Self {
        PlaybackError::IoError {
            source: Arc::new(err),
        }
    }
}

/// Failures reported by a buffer sink.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("Sink rejected append: {0}")]
    Rejected(String),
    #[error("Sink write failed: {0}")]
    WriteFailed(String),
    #[error("Sink is closed")]
    Closed,
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::WriteFailed(err.to_string())
    }
}
