// HTTP fragment source: playlist loading and fragment download with retry logic.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use hls::{ByteRange, FragmentDescriptor, HlsError, ParsedPlaylist, parse_playlist};
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use super::{FragmentSource, LoadedFragment, ResolvedPlaylist};
use crate::config::{HttpConfig, PlaybackConfig};
use crate::error::PlaybackError;
use crate::stats::{LoadStats, LoadTimer};

/// Build the HTTP client shared by playlist and fragment loads.
pub fn create_client(config: &HttpConfig) -> Result<Client, PlaybackError> {
    let mut client_builder = Client::builder()
        .pool_max_idle_per_host(5)
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .redirect(if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        });

    if !config.timeout.is_zero() {
        client_builder = client_builder.timeout(config.timeout);
    }

    if !config.connect_timeout.is_zero() {
        client_builder = client_builder.connect_timeout(config.connect_timeout);
    }

    client_builder.build().map_err(PlaybackError::from)
}

pub struct HttpFragmentSource {
    client: Client,
    config: Arc<PlaybackConfig>,
}

impl HttpFragmentSource {
    pub fn new(config: Arc<PlaybackConfig>) -> Result<Self, PlaybackError> {
        let client = create_client(&config.http_config)?;
        Ok(Self { client, config })
    }

    pub fn with_client(client: Client, config: Arc<PlaybackConfig>) -> Self {
        Self { client, config }
    }

    async fn load_playlist(&self, url: &Url) -> Result<(ParsedPlaylist, LoadStats), PlaybackError> {
        let mut timer = LoadTimer::start();
        let response = self
            .client
            .get(url.clone())
            .timeout(self.config.playlist_config.fetch_timeout)
            .send()
            .await?;
        timer.first_byte();

        if !response.status().is_success() {
            return Err(PlaybackError::PlaylistError(format!(
                "HTTP {} for playlist {}",
                response.status(),
                url
            )));
        }
        let body = response.bytes().await?;
        let stats = timer.finish(body.len() as u64);
        debug!("Loaded playlist {} ({} bytes)", url, body.len());

        let playlist = parse_playlist(&body, url)?;
        Ok((playlist, stats))
    }

    /// Fetches a fragment with retry logic.
    /// Retries on network errors and server errors (5xx).
    async fn fetch_with_retries(
        &self,
        url: &Url,
        byte_range: Option<ByteRange>,
    ) -> Result<(Bytes, LoadStats), PlaybackError> {
        let fetcher_config = &self.config.fetcher_config;
        let mut attempts = 0;
        loop {
            attempts += 1;
            let mut timer = LoadTimer::start();
            let mut request_builder = self.client.get(url.clone());
            if let Some(range) = byte_range {
                request_builder =
                    request_builder.header(reqwest::header::RANGE, range.to_header_value());
            }

            match request_builder
                .timeout(fetcher_config.fragment_timeout)
                .send()
                .await
            {
                Ok(response) => {
                    timer.first_byte();
                    if response.status().is_success() {
                        let data = response.bytes().await?;
                        let stats = timer.finish(data.len() as u64);
                        return Ok((data, stats));
                    } else if response.status().is_client_error() {
                        return Err(PlaybackError::FragmentFetchError(format!(
                            "Client error {} for fragment {}",
                            response.status(),
                            url
                        )));
                    }
                    if attempts > fetcher_config.max_fragment_retries {
                        return Err(PlaybackError::FragmentFetchError(format!(
                            "Max retries ({}) exceeded for fragment {}. Last status: {}",
                            fetcher_config.max_fragment_retries,
                            url,
                            response.status()
                        )));
                    }
                    warn!(
                        "Fragment {} returned {}, retrying (attempt {})",
                        url,
                        response.status(),
                        attempts
                    );
                }
                Err(e) => {
                    if !e.is_connect() && !e.is_timeout() && !e.is_request() {
                        return Err(PlaybackError::from(e));
                    }
                    if attempts > fetcher_config.max_fragment_retries {
                        return Err(PlaybackError::FragmentFetchError(format!(
                            "Max retries ({}) exceeded for fragment {} due to network error: {}",
                            fetcher_config.max_fragment_retries, url, e
                        )));
                    }
                    warn!("Fragment {} failed: {}, retrying (attempt {})", url, e, attempts);
                }
            }

            let delay = fetcher_config.retry_delay_base * (2_u32.pow(attempts.saturating_sub(1)));
            tokio::time::sleep(delay).await;
        }
    }
}

fn parse_url(url: &str) -> Result<Url, PlaybackError> {
    Url::parse(url).map_err(|e| PlaybackError::PlaylistError(format!("Invalid URL {url}: {e}")))
}

#[async_trait]
impl FragmentSource for HttpFragmentSource {
    /// Loads the playlist at `url`. A master playlist is followed to its
    /// first variant.
    async fn resolve(&self, url: &str) -> Result<ResolvedPlaylist, PlaybackError> {
        let mut playlist_url = parse_url(url)?;
        let (mut playlist, mut stats) = self.load_playlist(&playlist_url).await?;

        if matches!(playlist, ParsedPlaylist::Master(_)) {
            let variant = playlist.first_variant().ok_or(HlsError::NoVariants)?;
            info!(
                "Master playlist {}, using variant {} ({} bps)",
                playlist_url, variant.uri, variant.bandwidth
            );
            playlist_url = parse_url(&variant.uri)?;
            (playlist, stats) = self.load_playlist(&playlist_url).await?;
        }

        match playlist {
            ParsedPlaylist::Media {
                fragments,
                end_list,
                target_duration,
            } => {
                if !end_list {
                    warn!(
                        "Playlist {} has no end list, playing the {} fragments listed now",
                        playlist_url,
                        fragments.len()
                    );
                }
                debug!(
                    "Resolved {} fragments, target duration {:?}",
                    fragments.len(),
                    target_duration
                );
                Ok(ResolvedPlaylist {
                    url: playlist_url.to_string(),
                    fragments,
                    stats,
                })
            }
            ParsedPlaylist::Master(_) => Err(PlaybackError::PlaylistError(format!(
                "Variant {playlist_url} is itself a master playlist"
            ))),
        }
    }

    async fn fetch(&self, fragment: &FragmentDescriptor) -> Result<LoadedFragment, PlaybackError> {
        let url = Url::parse(&fragment.locator.uri).map_err(|e| {
            PlaybackError::FragmentFetchError(format!(
                "Invalid fragment URL {}: {}",
                fragment.locator.uri, e
            ))
        })?;

        let (data, stats) = self
            .fetch_with_retries(&url, fragment.locator.byte_range)
            .await?;
        debug!(
            "Downloaded {} bytes from fragment {}",
            data.len(),
            fragment.locator
        );
        Ok(LoadedFragment { data, stats })
    }
}
