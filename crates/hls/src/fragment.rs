//! Fragment descriptors produced by playlist resolution.
//!
//! A descriptor is immutable once built. The pipeline holds the ordered list
//! for one playlist and walks it with its own cursor.

use std::fmt::Display;
use std::time::Duration;

/// A byte range within a fragment resource, as declared by `EXT-X-BYTERANGE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub offset: u64,
    pub length: u64,
}

impl ByteRange {
    /// Inclusive end offset of the range.
    #[inline]
    pub fn last_byte(&self) -> u64 {
        self.offset + self.length.saturating_sub(1)
    }

    /// Value for an HTTP `Range` header.
    pub fn to_header_value(&self) -> String {
        format!("bytes={}-{}", self.offset, self.last_byte())
    }
}

/// Opaque fetch key of a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentLocator {
    /// Absolute URI of the resource
    pub uri: String,
    /// Sub-range of the resource, if the fragment is not the whole resource
    pub byte_range: Option<ByteRange>,
}

impl FragmentLocator {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            byte_range: None,
        }
    }

    pub fn with_byte_range(mut self, range: ByteRange) -> Self {
        self.byte_range = Some(range);
        self
    }
}

impl Display for FragmentLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.byte_range {
            Some(range) => write!(f, "{} [{}]", self.uri, range.to_header_value()),
            None => write!(f, "{}", self.uri),
        }
    }
}

/// Timing of a fragment on the presentation timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FragmentTiming {
    /// Sum of the durations of all preceding media fragments
    pub start: Duration,
    pub duration: Duration,
}

/// One entry of a resolved playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentDescriptor {
    /// Position in the playlist, starting at 0
    pub index: usize,
    pub locator: FragmentLocator,
    /// Absent for initialization sections
    pub timing: Option<FragmentTiming>,
    /// Whether this is an `EXT-X-MAP` initialization section
    pub init: bool,
}

impl FragmentDescriptor {
    pub fn new(index: usize, locator: FragmentLocator) -> Self {
        Self {
            index,
            locator,
            timing: None,
            init: false,
        }
    }

    pub fn with_timing(mut self, timing: FragmentTiming) -> Self {
        self.timing = Some(timing);
        self
    }
}
