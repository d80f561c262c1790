//! The drain loop: the only code that calls the sink's `append`.

use std::collections::VecDeque;
use std::sync::Arc;

use hls::MediaSegment;
use pipeline_common::StreamerContext;
use tracing::{debug, trace, warn};

use crate::error::SinkError;
use crate::events::{EventEmitter, PipelineEvent};
use crate::sink::BufferSink;

/// Mirror of the sink's ingestion state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    /// Not attached yet; drain attempts do nothing.
    Unavailable,
    Idle,
    /// An append is in flight until the sink signals idle.
    Busy,
}

#[derive(Debug)]
struct QueuedSegment {
    epoch: u64,
    segment: MediaSegment,
}

pub struct DrainLoop<S> {
    sink: S,
    state: SinkState,
    queue: VecDeque<QueuedSegment>,
    // (fragment_index, sequence) of the append in flight; cleared when the
    // sink reports it failed
    in_flight: Option<(usize, usize)>,
    events: EventEmitter,
    context: Arc<StreamerContext>,
}

impl<S: BufferSink> DrainLoop<S> {
    pub fn new(sink: S, events: EventEmitter, context: Arc<StreamerContext>) -> Self {
        Self {
            sink,
            state: SinkState::Unavailable,
            queue: VecDeque::new(),
            in_flight: None,
            events,
            context,
        }
    }

    pub fn push(&mut self, epoch: u64, segment: MediaSegment) {
        self.queue.push_back(QueuedSegment { epoch, segment });
    }

    /// Hand the front segment to the sink if it is idle.
    ///
    /// A no-op while the sink is busy or unavailable, or when nothing is
    /// queued. If the sink rejects the segment outright, the segment is dropped
    /// and the next one is tried, since a rejected append leaves the sink idle.
    /// Returns the position of the segment now in flight.
    pub fn attempt(&mut self) -> Option<(usize, usize)> {
        loop {
            if self.state != SinkState::Idle {
                return None;
            }
            let QueuedSegment { segment, .. } = self.queue.pop_front()?;
            let position = segment.position();
            let size = segment.size();

            match self.sink.append(segment) {
                Ok(()) => {
                    self.state = SinkState::Busy;
                    self.in_flight = Some(position);
                    trace!(
                        "{} Appending seg({},{}) of {} bytes, {} pending",
                        self.context.name,
                        position.0,
                        position.1,
                        size,
                        self.queue.len()
                    );
                    self.events.emit(PipelineEvent::SegmentAppended {
                        fragment_index: position.0,
                        sequence: position.1,
                    });
                    return Some(position);
                }
                Err(error) => {
                    warn!(
                        "{} Buffer append error for seg({},{}): {}",
                        self.context.name, position.0, position.1, error
                    );
                    self.context.update_stats(|s| s.segments_dropped += 1);
                    self.events.emit(PipelineEvent::AppendFailed {
                        fragment_index: Some(position.0),
                        error,
                    });
                }
            }
        }
    }

    /// The sink finished its append. False if no append was in flight.
    pub fn on_idle(&mut self) -> bool {
        match self.state {
            SinkState::Busy => {
                self.state = SinkState::Idle;
                if self.in_flight.take().is_some() {
                    self.context.update_stats(|s| s.segments_appended += 1);
                }
                true
            }
            SinkState::Idle => {
                debug!("{} Idle signal with no append in flight", self.context.name);
                false
            }
            SinkState::Unavailable => {
                warn!("{} Idle signal before the sink was ready", self.context.name);
                false
            }
        }
    }

    /// The sink reported that the in-flight append failed. The segment is not
    /// requeued; the idle signal that follows resumes draining.
    pub fn on_error(&mut self, error: SinkError) {
        let fragment_index = match self.in_flight.take() {
            Some((index, _)) => {
                self.context.update_stats(|s| s.segments_dropped += 1);
                Some(index)
            }
            None => None,
        };
        warn!(
            "{} Buffer append error (fragment {:?}): {}",
            self.context.name, fragment_index, error
        );
        self.events.emit(PipelineEvent::AppendFailed {
            fragment_index,
            error,
        });
    }

    /// First attachment of the sink. False if it was already available.
    pub fn mark_ready(&mut self) -> bool {
        if self.state != SinkState::Unavailable {
            return false;
        }
        self.state = SinkState::Idle;
        true
    }

    /// Drop queued segments of playlists older than `epoch`.
    pub fn discard_stale(&mut self, epoch: u64) -> usize {
        let before = self.queue.len();
        self.queue.retain(|entry| entry.epoch >= epoch);
        let discarded = before - self.queue.len();
        if discarded > 0 {
            debug!(
                "{} Discarded {} pending segments of a replaced playlist",
                self.context.name, discarded
            );
            self.context
                .update_stats(|s| s.segments_discarded += discarded);
        }
        discarded
    }

    pub fn end_of_stream(&mut self) {
        self.sink.end_of_stream();
    }

    #[inline]
    pub fn state(&self) -> SinkState {
        self.state
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
