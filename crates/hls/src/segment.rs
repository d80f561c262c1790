use std::fmt::Display;

use bytes::Bytes;

use crate::segment_parser::MediaFormat;

/// A unit of media ready to be appended to the playback buffer.
///
/// Produced by the remux stage from exactly one fragment. `sequence` is the
/// production order within that fragment, so `(fragment_index, sequence)`
/// is the segment's position in the final buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSegment {
    pub fragment_index: usize,
    pub sequence: usize,
    pub format: MediaFormat,
    pub data: Bytes,
}

impl MediaSegment {
    pub fn new(fragment_index: usize, sequence: usize, data: Bytes) -> Self {
        Self {
            fragment_index,
            sequence,
            format: crate::segment_parser::detect_format(&data),
            data,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Ordering key in the output buffer
    #[inline]
    pub fn position(&self) -> (usize, usize) {
        (self.fragment_index, self.sequence)
    }
}

impl Display for MediaSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "seg({},{}) {} {} bytes",
            self.fragment_index,
            self.sequence,
            self.format,
            self.data.len()
        )
    }
}
