//! Playlist resolution: turns an M3U8 document into fragment descriptors.
//!
//! Media playlists become an ordered list of [`FragmentDescriptor`]s with
//! absolute URIs, cumulative timing and explicit byte ranges. An `EXT-X-MAP`
//! initialization section is emitted as its own descriptor ahead of the first
//! media fragment that uses it. Master playlists only list their variants;
//! choosing one is up to the caller.

use std::time::Duration;

use m3u8_rs::{MasterPlaylist, MediaPlaylist, Playlist, parse_playlist_res};
use tracing::{debug, trace};
use url::Url;

use crate::error::HlsError;
use crate::fragment::{ByteRange, FragmentDescriptor, FragmentLocator, FragmentTiming};

/// A variant stream listed by a master playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantRef {
    /// Absolute URI of the variant's media playlist
    pub uri: String,
    pub bandwidth: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedPlaylist {
    /// Variants in playlist order
    Master(Vec<VariantRef>),
    Media {
        fragments: Vec<FragmentDescriptor>,
        end_list: bool,
        target_duration: Duration,
    },
}

impl ParsedPlaylist {
    /// First non I-frame variant, the one playback starts with.
    pub fn first_variant(&self) -> Option<&VariantRef> {
        match self {
            ParsedPlaylist::Master(variants) => variants.first(),
            ParsedPlaylist::Media { .. } => None,
        }
    }
}

/// Parse playlist bytes fetched from `playlist_url`.
pub fn parse_playlist(content: &[u8], playlist_url: &Url) -> Result<ParsedPlaylist, HlsError> {
    match parse_playlist_res(content) {
        Ok(Playlist::MasterPlaylist(master)) => resolve_master(&master, playlist_url),
        Ok(Playlist::MediaPlaylist(media)) => resolve_media(&media, playlist_url),
        Err(e) => Err(HlsError::Parse(format!("{e}"))),
    }
}

fn resolve_uri(base: &Url, uri: &str) -> Result<String, HlsError> {
    base.join(uri)
        .map(|u| u.to_string())
        .map_err(|e| HlsError::InvalidUri {
            uri: uri.to_string(),
            reason: e.to_string(),
        })
}

fn resolve_master(master: &MasterPlaylist, base: &Url) -> Result<ParsedPlaylist, HlsError> {
    let variants = master
        .variants
        .iter()
        .filter(|v| !v.is_i_frame)
        .map(|v| {
            Ok(VariantRef {
                uri: resolve_uri(base, &v.uri)?,
                bandwidth: v.bandwidth,
            })
        })
        .collect::<Result<Vec<_>, HlsError>>()?;

    if variants.is_empty() {
        return Err(HlsError::NoVariants);
    }
    debug!("Master playlist with {} variants", variants.len());
    Ok(ParsedPlaylist::Master(variants))
}

/// Tracks where the previous sub-range of each resource ended, so that a
/// byte range without an explicit offset continues from it.
#[derive(Default)]
struct RangeCursor {
    last: Option<(String, u64)>,
}

impl RangeCursor {
    fn resolve(&mut self, uri: &str, range: &m3u8_rs::ByteRange) -> ByteRange {
        let offset = match range.offset {
            Some(offset) => offset,
            None => match &self.last {
                Some((last_uri, end)) if last_uri == uri => *end,
                _ => 0,
            },
        };
        self.last = Some((uri.to_string(), offset + range.length));
        ByteRange {
            offset,
            length: range.length,
        }
    }
}

fn resolve_media(media: &MediaPlaylist, base: &Url) -> Result<ParsedPlaylist, HlsError> {
    let mut fragments = Vec::with_capacity(media.segments.len());
    let mut ranges = RangeCursor::default();
    let mut last_map: Option<FragmentLocator> = None;
    let mut start = Duration::ZERO;

    for segment in &media.segments {
        if let Some(map) = &segment.map {
            let mut locator = FragmentLocator::new(resolve_uri(base, &map.uri)?);
            if let Some(range) = &map.byte_range {
                locator = locator.with_byte_range(ByteRange {
                    offset: range.offset.unwrap_or(0),
                    length: range.length,
                });
            }
            if last_map.as_ref() != Some(&locator) {
                debug!("New init section: {}", locator);
                let mut init = FragmentDescriptor::new(fragments.len(), locator.clone());
                init.init = true;
                fragments.push(init);
                last_map = Some(locator);
            }
        }

        let uri = resolve_uri(base, &segment.uri)?;
        let mut locator = FragmentLocator::new(uri.clone());
        if let Some(range) = &segment.byte_range {
            locator = locator.with_byte_range(ranges.resolve(&uri, range));
        }

        let duration = Duration::from_secs_f32(segment.duration.max(0.0));
        trace!("Fragment {}: {} ({:?})", fragments.len(), locator, duration);
        fragments.push(
            FragmentDescriptor::new(fragments.len(), locator)
                .with_timing(FragmentTiming { start, duration }),
        );
        start += duration;
    }

    Ok(ParsedPlaylist::Media {
        fragments,
        end_list: media.end_list,
        target_duration: Duration::from_secs(media.target_duration),
    })
}
