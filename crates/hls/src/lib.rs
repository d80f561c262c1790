// HLS fragment model, playlist resolution and segment packaging
pub mod error;
pub mod fragment;
pub mod playlist;
pub mod remux;
pub mod segment;
pub mod segment_parser;

// Export common types for ease of use
pub use error::HlsError;
pub use fragment::{ByteRange, FragmentDescriptor, FragmentLocator, FragmentTiming};
pub use playlist::{ParsedPlaylist, VariantRef, parse_playlist};
pub use remux::PassthroughRemuxer;
pub use segment::MediaSegment;
pub use segment_parser::{MediaFormat, TS_PACKET_SIZE, detect_format, find_ts_sync};
