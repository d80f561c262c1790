//! Bridges one fragment's bytes to its media segments.
//!
//! The remuxer is a synchronous [`Processor`]: `process` and `finish` run
//! back to back inside the caller's turn, and every segment they produce is
//! delivered before `remux_fragment` returns. The orchestrator depends on this
//! to keep fragment order without any reordering buffer, which is why the
//! remuxer trait has no async form.

use std::sync::Arc;

use bytes::Bytes;
use hls::MediaSegment;
use pipeline_common::{PipelineError, Processor, StreamerContext};
use tracing::{trace, warn};

pub struct RemuxAdapter<R> {
    remuxer: R,
    context: Arc<StreamerContext>,
}

impl<R: Processor<Bytes>> RemuxAdapter<R> {
    pub fn new(remuxer: R, context: Arc<StreamerContext>) -> Self {
        Self { remuxer, context }
    }

    /// Feed `data` as fragment `fragment_index` and flush it.
    ///
    /// Each produced payload is tagged with the fragment index and its
    /// production order and handed to `deliver` immediately. Empty payloads are
    /// skipped. Returns the number of segments delivered. A remuxer error ends the fragment early: segments delivered
    /// before the error stand, `finish` still runs so the remuxer starts the
    /// next fragment clean.
    pub fn remux_fragment(
        &mut self,
        fragment_index: usize,
        data: Bytes,
        deliver: &mut dyn FnMut(MediaSegment),
    ) -> usize {
        let mut sequence = 0;
        let mut emit = |payload: Bytes| -> Result<(), PipelineError> {
            if payload.is_empty() {
                return Ok(());
            }
            let segment = MediaSegment::new(fragment_index, sequence, payload);
            trace!("{} Produced {}", self.context.name, segment);
            sequence += 1;
            deliver(segment);
            Ok(())
        };

        let fed = self.remuxer.process(data, &mut emit);
        let finished = self.remuxer.finish(&mut emit);

        if let Err(e) = fed.and(finished) {
            warn!(
                "{} {} failed on fragment {}: {}",
                self.context.name,
                self.remuxer.name(),
                fragment_index,
                e
            );
            self.context.update_stats(|s| s.remux_failures += 1);
        }

        sequence
    }
}
