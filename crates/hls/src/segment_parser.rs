use std::fmt::Display;

use memchr::memchr;

/// Size of one MPEG-TS packet
pub const TS_PACKET_SIZE: usize = 188;

/// TS packet sync byte
pub const TS_SYNC_BYTE: u8 = 0x47;

/// Media format types that can be detected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFormat {
    /// MPEG-2 Transport Stream
    TransportStream,
    /// MP4 Fragment (fMP4/CMAF)
    FragmentedMp4,
    /// WebVTT subtitles
    WebVtt,
    /// Unknown format
    Unknown,
}

impl Display for MediaFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaFormat::TransportStream => write!(f, "ts"),
            MediaFormat::FragmentedMp4 => write!(f, "fmp4"),
            MediaFormat::WebVtt => write!(f, "webvtt"),
            MediaFormat::Unknown => write!(f, "unknown"),
        }
    }
}

/// Detect the format of a media payload from its contents
#[inline]
pub fn detect_format(data: &[u8]) -> MediaFormat {
    if data.len() < 4 {
        return MediaFormat::Unknown;
    }

    // A TS stream repeats the sync byte every 188 bytes
    if data[0] == TS_SYNC_BYTE
        && (data.len() == TS_PACKET_SIZE
            || (data.len() > TS_PACKET_SIZE && data[TS_PACKET_SIZE] == TS_SYNC_BYTE))
    {
        return MediaFormat::TransportStream;
    }

    if data.len() >= 8 {
        let box_type = &data[4..8];
        if box_type == b"ftyp" || box_type == b"styp" || box_type == b"moof" || box_type == b"moov"
        {
            return MediaFormat::FragmentedMp4;
        }
    }

    if data.len() >= 6 && &data[0..6] == b"WEBVTT" {
        return MediaFormat::WebVtt;
    }

    MediaFormat::Unknown
}

/// Offset of the first TS packet boundary in `data`.
///
/// A candidate sync byte is accepted when the byte one packet later is also a
/// sync byte, or when fewer than two packets remain.
pub fn find_ts_sync(data: &[u8]) -> Option<usize> {
    let mut from = 0;
    while let Some(rel) = memchr(TS_SYNC_BYTE, &data[from..]) {
        let pos = from + rel;
        let next = pos + TS_PACKET_SIZE;
        if next >= data.len() || data[next] == TS_SYNC_BYTE {
            return Some(pos);
        }
        from = pos + 1;
    }
    None
}
