//! Fragment sources: playlist resolution and fragment transport.

mod http;

use async_trait::async_trait;
use bytes::Bytes;
use hls::FragmentDescriptor;

use crate::error::PlaybackError;
use crate::stats::LoadStats;

pub use http::{HttpFragmentSource, create_client};

/// A playlist resolved down to its fragments.
#[derive(Debug, Clone)]
pub struct ResolvedPlaylist {
    /// URL of the media playlist the fragments came from
    pub url: String,
    pub fragments: Vec<FragmentDescriptor>,
    /// Timing of the media playlist load
    pub stats: LoadStats,
}

#[derive(Debug, Clone)]
pub struct LoadedFragment {
    pub data: Bytes,
    pub stats: LoadStats,
}

/// Resolves playlists and fetches fragment bytes.
///
/// Both operations report their outcome exactly once. Retries, if any, happen
/// inside the source; the pipeline above never retries.
#[async_trait]
pub trait FragmentSource: Send + Sync {
    async fn resolve(&self, url: &str) -> Result<ResolvedPlaylist, PlaybackError>;

    async fn fetch(&self, fragment: &FragmentDescriptor) -> Result<LoadedFragment, PlaybackError>;
}
