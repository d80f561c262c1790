//! # PassthroughRemuxer
//!
//! Packages one fragment's bytes into sink-ready segments without
//! re-encapsulating the media. For MPEG-TS input it resynchronises to the
//! first packet boundary, drops a trailing partial packet, and optionally cuts
//! the stream into packet-aligned segments of bounded size. fMP4 and
//! unrecognised payloads are passed through whole when the fragment finishes.
//!
//! Everything is emitted synchronously from `process`/`finish`, and `finish`
//! leaves no state behind, so the next fragment starts clean.

use bytes::{Bytes, BytesMut};
use pipeline_common::{PipelineError, Processor};
use tracing::{debug, warn};

use crate::segment_parser::{MediaFormat, TS_PACKET_SIZE, detect_format, find_ts_sync};

pub struct PassthroughRemuxer {
    max_segment_size: Option<usize>,
    buffer: BytesMut,
    format: Option<MediaFormat>,
    synced: bool,
}

impl PassthroughRemuxer {
    // Bytes needed before a format decision is attempted mid-fragment
    const DETECT_SIZE: usize = TS_PACKET_SIZE * 2;

    pub fn new() -> Self {
        Self {
            max_segment_size: None,
            buffer: BytesMut::new(),
            format: None,
            synced: false,
        }
    }

    /// Cut TS fragments into segments of at most `size` bytes, rounded down
    /// to whole packets (never below one packet).
    pub fn with_max_segment_size(mut self, size: usize) -> Self {
        let packets = (size / TS_PACKET_SIZE).max(1);
        self.max_segment_size = Some(packets * TS_PACKET_SIZE);
        self
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.format = None;
        self.synced = false;
    }

    fn classify(data: &[u8]) -> MediaFormat {
        match detect_format(data) {
            MediaFormat::Unknown if find_ts_sync(data).is_some() => MediaFormat::TransportStream,
            format => format,
        }
    }

    fn sync_ts(&mut self) {
        if self.synced {
            return;
        }
        match find_ts_sync(&self.buffer) {
            Some(0) => {}
            Some(offset) => {
                warn!("Dropping {} bytes before first TS sync byte", offset);
                let _ = self.buffer.split_to(offset);
            }
            None => {
                warn!("No TS sync byte found in {} bytes", self.buffer.len());
                self.buffer.clear();
                return;
            }
        }
        self.synced = true;
    }

    fn emit_full_chunks(
        &mut self,
        output: &mut dyn FnMut(Bytes) -> Result<(), PipelineError>,
    ) -> Result<(), PipelineError> {
        if let Some(chunk) = self.max_segment_size {
            while self.buffer.len() >= chunk {
                output(self.buffer.split_to(chunk).freeze())?;
            }
        }
        Ok(())
    }
}

impl Default for PassthroughRemuxer {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor<Bytes> for PassthroughRemuxer {
    fn process(
        &mut self,
        input: Bytes,
        output: &mut dyn FnMut(Bytes) -> Result<(), PipelineError>,
    ) -> Result<(), PipelineError> {
        self.buffer.extend_from_slice(&input);

        if self.format.is_none() && self.buffer.len() >= Self::DETECT_SIZE {
            let format = Self::classify(&self.buffer);
            debug!("Fragment format: {}", format);
            self.format = Some(format);
        }

        if self.format == Some(MediaFormat::TransportStream) {
            self.sync_ts();
            if self.synced {
                self.emit_full_chunks(output)?;
            }
        }
        Ok(())
    }

    fn finish(
        &mut self,
        output: &mut dyn FnMut(Bytes) -> Result<(), PipelineError>,
    ) -> Result<(), PipelineError> {
        if self.buffer.is_empty() {
            self.reset();
            return Ok(());
        }

        let format = match self.format {
            Some(format) => format,
            None => Self::classify(&self.buffer),
        };

        let result = if format == MediaFormat::TransportStream {
            self.sync_ts();
            let partial = self.buffer.len() % TS_PACKET_SIZE;
            if partial != 0 {
                warn!("Dropping trailing partial TS packet of {} bytes", partial);
                self.buffer.truncate(self.buffer.len() - partial);
            }
            self.emit_full_chunks(output).and_then(|_| {
                if self.buffer.is_empty() {
                    Ok(())
                } else {
                    output(self.buffer.split().freeze())
                }
            })
        } else {
            output(self.buffer.split().freeze())
        };

        self.reset();
        result
    }

    fn name(&self) -> &'static str {
        "PassthroughRemuxer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment_parser::TS_SYNC_BYTE;
    use pipeline_common::init_test_tracing;

    fn ts_packets(count: usize) -> Vec<u8> {
        let mut data = vec![0u8; TS_PACKET_SIZE * count];
        for i in 0..count {
            data[i * TS_PACKET_SIZE] = TS_SYNC_BYTE;
            data[i * TS_PACKET_SIZE + 3] = i as u8;
        }
        data
    }

    fn run(remuxer: &mut PassthroughRemuxer, inputs: Vec<Vec<u8>>) -> Vec<Bytes> {
        let mut out = Vec::new();
        let mut collect = |b: Bytes| -> Result<(), PipelineError> {
            out.push(b);
            Ok(())
        };
        for input in inputs {
            remuxer.process(Bytes::from(input), &mut collect).unwrap();
        }
        remuxer.finish(&mut collect).unwrap();
        out
    }

    #[test]
    fn test_whole_fragment_single_segment() {
        init_test_tracing!();
        let mut remuxer = PassthroughRemuxer::new();
        let out = run(&mut remuxer, vec![ts_packets(5)]);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 5 * TS_PACKET_SIZE);
    }

    #[test]
    fn test_split_into_packet_aligned_segments() {
        init_test_tracing!();
        // 500 rounds down to 2 packets per segment
        let mut remuxer = PassthroughRemuxer::new().with_max_segment_size(500);
        let data = ts_packets(5);
        let out = run(&mut remuxer, vec![data[..300].to_vec(), data[300..].to_vec()]);

        let sizes: Vec<_> = out.iter().map(|b| b.len()).collect();
        assert_eq!(
            sizes,
            vec![2 * TS_PACKET_SIZE, 2 * TS_PACKET_SIZE, TS_PACKET_SIZE]
        );
        // order preserved: packet counters 0..5
        let counters: Vec<u8> = out
            .iter()
            .flat_map(|b| b.chunks(TS_PACKET_SIZE).map(|p| p[3]).collect::<Vec<_>>())
            .collect();
        assert_eq!(counters, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_resync_and_trim_partial_packet() {
        init_test_tracing!();
        let mut data = vec![0x00, 0x01, 0x02];
        data.extend(ts_packets(3));
        data.extend([TS_SYNC_BYTE, 0x00, 0x00]);

        let mut remuxer = PassthroughRemuxer::new();
        let out = run(&mut remuxer, vec![data]);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 3 * TS_PACKET_SIZE);
        assert_eq!(out[0][0], TS_SYNC_BYTE);
    }

    #[test]
    fn test_fmp4_passes_through_whole() {
        let mut data = vec![0u8; 1024];
        data[4..8].copy_from_slice(b"moof");
        let mut remuxer = PassthroughRemuxer::new().with_max_segment_size(188);
        let out = run(&mut remuxer, vec![data[..400].to_vec(), data[400..].to_vec()]);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 1024);
    }

    #[test]
    fn test_empty_fragment_produces_nothing_and_state_resets() {
        let mut remuxer = PassthroughRemuxer::new();
        assert!(run(&mut remuxer, vec![]).is_empty());

        let out = run(&mut remuxer, vec![ts_packets(1)]);
        assert_eq!(out.len(), 1);
        assert!(remuxer.buffer.is_empty());
        assert!(remuxer.format.is_none());
    }
}
