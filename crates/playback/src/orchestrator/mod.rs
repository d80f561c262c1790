//! The segment pipeline orchestrator.
//!
//! [`Orchestrator`] owns the whole playback state: the [`Sequencer`] with its
//! fragment list and cursor, the [`RemuxAdapter`], and the [`DrainLoop`] with
//! the pending segment queue and the mirrored sink state. Every external event
//! maps to one `on_*` method. Each method runs to completion and is the only
//! code touching the state while it runs, so the orchestrator can be driven by
//! a single task (see [`crate::driver`]) or directly from tests with stub
//! collaborators.
//!
//! Data moves one way: playlist, fragment request, fragment bytes, remuxed
//! segments, queue, sink. Remuxing happens inside
//! [`Orchestrator::on_fragment_bytes_ready`] before the next fetch is
//! requested, which is what orders segments by fragment.

mod drain;
mod remux;
mod sequencer;

use std::sync::Arc;

use bytes::Bytes;
use hls::FragmentDescriptor;
use pipeline_common::{Processor, StreamerContext};
use tracing::{debug, info, warn};

use crate::config::QueuePolicy;
use crate::error::SinkError;
use crate::events::{EventEmitter, PipelineEvent};
use crate::sink::BufferSink;
use crate::stats::LoadStats;

pub use drain::{DrainLoop, SinkState};
pub use remux::RemuxAdapter;
pub use sequencer::{
    FetchFailure, FragmentRequest, FragmentRequester, FragmentResponse, Sequencer, SequencerPhase,
};

pub struct Orchestrator<F, R, S> {
    context: Arc<StreamerContext>,
    queue_policy: QueuePolicy,
    sequencer: Sequencer<F>,
    remux: RemuxAdapter<R>,
    drain: DrainLoop<S>,
    events: EventEmitter,
    // end of stream already signalled to the sink for the current playlist
    buffer_ended: bool,
}

impl<F, R, S> Orchestrator<F, R, S>
where
    F: FragmentRequester,
    R: Processor<Bytes>,
    S: BufferSink,
{
    pub fn new(
        queue_policy: QueuePolicy,
        context: Arc<StreamerContext>,
        requester: F,
        remuxer: R,
        sink: S,
        events: EventEmitter,
    ) -> Self {
        Self {
            sequencer: Sequencer::new(requester, context.clone()),
            remux: RemuxAdapter::new(remuxer, context.clone()),
            drain: DrainLoop::new(sink, events.clone(), context.clone()),
            context,
            queue_policy,
            events,
            buffer_ended: false,
        }
    }

    /// The sink is attached and accepts appends.
    ///
    /// Only the first call has an effect. Segments queued while the sink was
    /// unavailable start draining here.
    pub fn on_sink_ready(&mut self) {
        if !self.drain.mark_ready() {
            debug!("{} Sink already ready", self.context.name);
            return;
        }
        info!("{} Sink ready", self.context.name);
        self.events.emit(PipelineEvent::SinkReady);

        self.drain.attempt();
        self.resume_if_deferred();
        self.maybe_end_buffer();
    }

    /// Install a resolved playlist and start fetching it. Returns the epoch
    /// that identifies the playlist in later fetch callbacks.
    ///
    /// Any previous playlist is superseded: its outstanding fetch is cancelled,
    /// its late callbacks are ignored and its segments still queued are
    /// discarded. An append already in flight completes normally.
    pub fn on_playlist_ready(
        &mut self,
        fragments: Vec<FragmentDescriptor>,
        stats: Option<LoadStats>,
    ) -> u64 {
        let fragment_count = fragments.len();
        let epoch = self.sequencer.reset(fragments);
        self.buffer_ended = false;
        self.drain.discard_stale(epoch);
        self.context.update_stats(|s| s.playlists_loaded += 1);

        match &stats {
            Some(stats) => info!(
                epoch,
                "{} Playlist loaded, RTT(ms)/load(ms)/nb frag: {}/{}/{}",
                self.context.name,
                stats.time_to_first_byte().as_millis(),
                stats.load_time().as_millis(),
                fragment_count
            ),
            None => info!(
                epoch,
                "{} Playlist loaded, nb frag: {}", self.context.name, fragment_count
            ),
        }
        self.events.emit(PipelineEvent::PlaylistReady {
            epoch,
            fragment_count,
            stats,
        });

        if fragment_count == 0 {
            self.complete_stream();
            self.maybe_end_buffer();
        } else {
            self.sequencer.request_next();
        }
        epoch
    }

    /// Bytes of the outstanding fetch arrived.
    ///
    /// The fragment is remuxed on the spot; each segment is queued and a drain
    /// attempted as soon as it is produced. Only then is the next fragment
    /// requested, or the stream declared complete after the last one.
    pub fn on_fragment_bytes_ready(&mut self, response: FragmentResponse) {
        let FragmentResponse {
            epoch,
            index,
            data,
            stats,
        } = response;

        if !self.sequencer.is_current(epoch) {
            debug!(
                "{} Ignoring fragment {} of replaced playlist (epoch {})",
                self.context.name, index, epoch
            );
            self.context.update_stats(|s| s.stale_callbacks += 1);
            return;
        }
        if !self.sequencer.begin_remux(index) {
            warn!(
                "{} Fragment {} arrived but is not the outstanding fetch ({:?})",
                self.context.name,
                index,
                self.sequencer.phase()
            );
            self.context.update_stats(|s| s.stale_callbacks += 1);
            return;
        }

        self.context.update_stats(|s| {
            s.fragments_loaded += 1;
            s.fragment_bytes += stats.length;
            s.fragment_load_time += stats.load_time();
        });
        info!(
            "{} Fragment {} loaded, RTT(ms)/load(ms)/bitrate: {}/{}/{:.3} Mb/s",
            self.context.name,
            index,
            stats.time_to_first_byte().as_millis(),
            stats.load_time().as_millis(),
            stats.bitrate_mbps()
        );
        self.events
            .emit(PipelineEvent::FragmentReady { index, stats });

        let events = &self.events;
        let drain = &mut self.drain;
        let context = &self.context;
        let segments = self.remux.remux_fragment(index, data, &mut |segment| {
            context.update_stats(|s| s.segments_produced += 1);
            events.emit(PipelineEvent::SegmentProduced {
                fragment_index: segment.fragment_index,
                sequence: segment.sequence,
                size: segment.size(),
                format: segment.format,
            });
            drain.push(epoch, segment);
            drain.attempt();
        });
        debug!(
            "{} Fragment {} remuxed into {} segments, {} pending",
            self.context.name,
            index,
            segments,
            self.drain.len()
        );

        self.advance();
    }

    /// The outstanding fetch failed. The sequencer stops; a new playlist is
    /// the way to resume.
    pub fn on_fetch_failed(&mut self, failure: FetchFailure) {
        let FetchFailure {
            epoch,
            index,
            error,
        } = failure;

        if !self.sequencer.is_current(epoch) {
            debug!(
                "{} Ignoring fetch failure of replaced playlist: {}",
                self.context.name, error
            );
            self.context.update_stats(|s| s.stale_callbacks += 1);
            return;
        }
        if !self.sequencer.is_fetching(index) {
            debug!(
                "{} Ignoring failure for fragment {}, not the outstanding fetch",
                self.context.name, index
            );
            return;
        }

        warn!(
            "{} Fragment {} fetch failed: {}",
            self.context.name, index, error
        );
        self.sequencer.stall(index);
        self.events
            .emit(PipelineEvent::FetchFailed { index, error });
    }

    /// The sink finished the append in flight.
    pub fn on_sink_idle(&mut self) {
        if !self.drain.on_idle() {
            return;
        }
        self.drain.attempt();
        self.resume_if_deferred();
        self.maybe_end_buffer();
    }

    /// The sink reported a failed append. The segment is gone; draining
    /// continues with the idle signal that follows.
    pub fn on_sink_error(&mut self, error: SinkError) {
        self.drain.on_error(error);
    }

    /// Speculative drain; a no-op unless the sink is idle with segments queued.
    pub fn attempt_drain(&mut self) -> Option<(usize, usize)> {
        self.drain.attempt()
    }

    /// Cancel the outstanding fetch. Callbacks still in transit are handled as
    /// usual and the queue keeps draining.
    pub fn shutdown(&mut self) {
        info!(
            "{} Shutting down with {} segments pending",
            self.context.name,
            self.drain.len()
        );
        self.sequencer.cancel_outstanding();
    }

    #[inline]
    pub fn phase(&self) -> SequencerPhase {
        self.sequencer.phase()
    }

    #[inline]
    pub fn sink_state(&self) -> SinkState {
        self.drain.state()
    }

    #[inline]
    pub fn pending_segments(&self) -> usize {
        self.drain.len()
    }

    #[inline]
    pub fn cursor(&self) -> usize {
        self.sequencer.cursor()
    }

    #[inline]
    pub fn epoch(&self) -> u64 {
        self.sequencer.epoch()
    }

    pub fn sink(&self) -> &S {
        self.drain.sink()
    }

    pub fn sink_mut(&mut self) -> &mut S {
        self.drain.sink_mut()
    }

    pub fn requester(&self) -> &F {
        self.sequencer.requester()
    }

    pub fn requester_mut(&mut self) -> &mut F {
        self.sequencer.requester_mut()
    }

    pub fn context(&self) -> &Arc<StreamerContext> {
        &self.context
    }

    // Remuxing of the current fragment is done: fetch the next one or finish.
    fn advance(&mut self) {
        if !self.sequencer.has_next() {
            self.complete_stream();
            self.maybe_end_buffer();
            return;
        }
        if self.queue_policy.allows_fetch(self.drain.len()) {
            self.sequencer.request_next();
        } else {
            debug!(
                "{} {} segments pending, holding fetch of fragment {}",
                self.context.name,
                self.drain.len(),
                self.sequencer.cursor()
            );
            self.sequencer.defer();
        }
    }

    fn resume_if_deferred(&mut self) {
        if self.sequencer.is_deferred() && self.queue_policy.allows_fetch(self.drain.len()) {
            debug!(
                "{} Queue below bound, resuming fetch of fragment {}",
                self.context.name,
                self.sequencer.cursor()
            );
            self.sequencer.request_next();
        }
    }

    fn complete_stream(&mut self) {
        if self.sequencer.complete() {
            info!("{} Last fragment loaded", self.context.name);
            self.events.emit(PipelineEvent::StreamComplete);
        }
    }

    fn maybe_end_buffer(&mut self) {
        if self.buffer_ended
            || !self.sequencer.is_complete()
            || !self.drain.is_empty()
            || self.drain.state() != SinkState::Idle
        {
            return;
        }
        self.buffer_ended = true;
        info!("{} All segments appended, ending buffer", self.context.name);
        self.drain.end_of_stream();
        self.events.emit(PipelineEvent::BufferEnded);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlaybackError;
    use hls::FragmentLocator;
    use pipeline_common::{PipelineError, create_test_context, init_test_tracing};
    use tokio::sync::mpsc::UnboundedReceiver;

    /// Records fetch requests and how many were outstanding at once.
    #[derive(Default)]
    struct StubRequester {
        requests: Vec<FragmentRequest>,
        outstanding: usize,
        max_outstanding: usize,
    }

    impl FragmentRequester for StubRequester {
        fn request(&mut self, request: FragmentRequest) {
            self.outstanding += 1;
            self.max_outstanding = self.max_outstanding.max(self.outstanding);
            self.requests.push(request);
        }
    }

    /// Splits a fragment on `|`; a `!` anywhere is a remux error.
    struct PipeSplitter;

    impl Processor<Bytes> for PipeSplitter {
        fn process(
            &mut self,
            input: Bytes,
            output: &mut dyn FnMut(Bytes) -> Result<(), PipelineError>,
        ) -> Result<(), PipelineError> {
            if input.contains(&b'!') {
                return Err(PipelineError::InvalidData("bang".into()));
            }
            for part in input.split(|b| *b == b'|') {
                output(input.slice_ref(part))?;
            }
            Ok(())
        }

        fn finish(
            &mut self,
            _output: &mut dyn FnMut(Bytes) -> Result<(), PipelineError>,
        ) -> Result<(), PipelineError> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "PipeSplitter"
        }
    }

    /// Sink that stays busy until the test delivers the idle signal.
    #[derive(Default)]
    struct StubSink {
        appended: Vec<(usize, usize)>,
        payloads: Vec<Bytes>,
        busy: bool,
        violations: usize,
        // 1-based append attempts rejected synchronously
        reject_attempts: Vec<usize>,
        attempts: usize,
        ended: bool,
    }

    impl BufferSink for StubSink {
        fn append(&mut self, segment: hls::MediaSegment) -> Result<(), SinkError> {
            self.attempts += 1;
            if self.busy {
                self.violations += 1;
            }
            if self.reject_attempts.contains(&self.attempts) {
                return Err(SinkError::Rejected("quota exceeded".into()));
            }
            self.busy = true;
            self.appended.push(segment.position());
            self.payloads.push(segment.data);
            Ok(())
        }

        fn end_of_stream(&mut self) {
            self.ended = true;
        }
    }

    type TestOrchestrator = Orchestrator<StubRequester, PipeSplitter, StubSink>;

    struct Harness {
        orchestrator: TestOrchestrator,
        events: UnboundedReceiver<PipelineEvent>,
    }

    impl Harness {
        fn new(policy: QueuePolicy) -> Self {
            init_test_tracing!();
            let (emitter, events) = EventEmitter::channel();
            let orchestrator = Orchestrator::new(
                policy,
                create_test_context(),
                StubRequester::default(),
                PipeSplitter,
                StubSink::default(),
                emitter,
            );
            Self {
                orchestrator,
                events,
            }
        }

        fn ready() -> Self {
            let mut harness = Self::new(QueuePolicy::Unbounded);
            harness.orchestrator.on_sink_ready();
            harness
        }

        fn playlist(&mut self, count: usize) -> u64 {
            let fragments = (0..count)
                .map(|i| {
                    FragmentDescriptor::new(i, FragmentLocator::new(format!("http://h/{i}.ts")))
                })
                .collect();
            self.orchestrator.on_playlist_ready(fragments, None)
        }

        fn last_request(&self) -> FragmentRequest {
            self.orchestrator
                .requester()
                .requests
                .last()
                .cloned()
                .expect("no fetch requested")
        }

        /// Complete the last requested fetch with `payload`.
        fn respond(&mut self, payload: &'static str) {
            let request = self.last_request();
            self.respond_to(&request, payload);
        }

        fn respond_to(&mut self, request: &FragmentRequest, payload: &'static str) {
            let requester = self.orchestrator.requester_mut();
            requester.outstanding = requester.outstanding.saturating_sub(1);
            let data = Bytes::from_static(payload.as_bytes());
            let stats = LoadStats::instant(data.len() as u64);
            self.orchestrator
                .on_fragment_bytes_ready(FragmentResponse::for_request(request, data, stats));
        }

        fn idle(&mut self) {
            self.orchestrator.sink_mut().busy = false;
            self.orchestrator.on_sink_idle();
        }

        fn fetched(&self) -> Vec<usize> {
            self.orchestrator
                .requester()
                .requests
                .iter()
                .map(|r| r.index)
                .collect()
        }

        fn appended(&self) -> Vec<(usize, usize)> {
            self.orchestrator.sink().appended.clone()
        }

        fn events(&mut self) -> Vec<PipelineEvent> {
            let mut events = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                events.push(event);
            }
            events
        }
    }

    fn count_complete(events: &[PipelineEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, PipelineEvent::StreamComplete))
            .count()
    }

    #[test]
    fn test_three_fragments_one_segment_each() {
        let mut h = Harness::ready();
        h.playlist(3);
        assert_eq!(h.fetched(), vec![0]);

        h.respond("s0");
        assert_eq!(h.fetched(), vec![0, 1]);
        h.respond("s1");
        assert_eq!(h.fetched(), vec![0, 1, 2]);
        assert_eq!(count_complete(&h.events()), 0);

        h.respond("s2");
        assert_eq!(h.fetched(), vec![0, 1, 2]);
        assert_eq!(h.orchestrator.phase(), SequencerPhase::StreamComplete);
        assert_eq!(count_complete(&h.events()), 1);

        // stream complete does not mean drained
        assert_eq!(h.appended(), vec![(0, 0)]);
        assert_eq!(h.orchestrator.pending_segments(), 2);
        h.idle();
        h.idle();
        h.idle();

        assert_eq!(h.appended(), vec![(0, 0), (1, 0), (2, 0)]);
        assert_eq!(
            h.orchestrator.sink().payloads,
            vec![
                Bytes::from_static(b"s0"),
                Bytes::from_static(b"s1"),
                Bytes::from_static(b"s2")
            ]
        );
        assert_eq!(h.orchestrator.sink().violations, 0);
        assert_eq!(h.orchestrator.requester().max_outstanding, 1);
        assert!(h.orchestrator.sink().ended);

        let events = h.events();
        assert_eq!(count_complete(&events), 0);
        assert!(matches!(events.last(), Some(PipelineEvent::BufferEnded)));
    }

    #[test]
    fn test_empty_playlist_completes_immediately() {
        let mut h = Harness::ready();
        h.playlist(0);

        assert!(h.fetched().is_empty());
        assert!(h.appended().is_empty());
        assert_eq!(h.orchestrator.phase(), SequencerPhase::StreamComplete);

        let events = h.events();
        assert!(matches!(events[0], PipelineEvent::SinkReady));
        assert!(matches!(
            events[1],
            PipelineEvent::PlaylistReady {
                fragment_count: 0,
                ..
            }
        ));
        assert!(matches!(events[2], PipelineEvent::StreamComplete));
        assert!(matches!(events[3], PipelineEvent::BufferEnded));
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn test_multi_segment_fragment_keeps_order() {
        let mut h = Harness::ready();
        h.playlist(3);
        h.respond("a");
        h.respond("b|c");
        h.respond("d");
        for _ in 0..4 {
            h.idle();
        }

        assert_eq!(h.appended(), vec![(0, 0), (1, 0), (1, 1), (2, 0)]);
        assert_eq!(h.orchestrator.sink().violations, 0);
        assert_eq!(h.orchestrator.context().snapshot().segments_produced, 4);
        assert_eq!(h.orchestrator.context().snapshot().segments_appended, 4);
    }

    #[test]
    fn test_async_append_failure_does_not_stall() {
        let mut h = Harness::ready();
        h.playlist(3);
        h.respond("a");
        h.respond("b");
        h.respond("c");

        h.idle();
        assert_eq!(h.appended(), vec![(0, 0), (1, 0)]);
        h.events();

        // second append fails asynchronously, idle follows
        h.orchestrator
            .on_sink_error(SinkError::WriteFailed("decode error".into()));
        h.idle();

        assert_eq!(h.appended(), vec![(0, 0), (1, 0), (2, 0)]);
        let events = h.events();
        assert!(matches!(
            events[0],
            PipelineEvent::AppendFailed {
                fragment_index: Some(1),
                ..
            }
        ));
        assert_eq!(h.orchestrator.context().snapshot().segments_dropped, 1);

        h.idle();
        assert!(h.orchestrator.sink().ended);
    }

    #[test]
    fn test_rejected_append_moves_to_next_segment() {
        let mut h = Harness::ready();
        h.orchestrator.sink_mut().reject_attempts = vec![2];
        h.playlist(3);
        h.respond("a");
        h.respond("b");
        h.respond("c");

        h.idle();
        assert_eq!(h.appended(), vec![(0, 0), (2, 0)]);
        assert_eq!(h.orchestrator.sink_state(), SinkState::Busy);
        assert_eq!(h.orchestrator.pending_segments(), 0);
        assert_eq!(h.orchestrator.sink().violations, 0);
    }

    #[test]
    fn test_drain_is_idempotent_while_busy() {
        let mut h = Harness::ready();
        h.playlist(2);
        h.respond("a|b");

        for _ in 0..5 {
            assert_eq!(h.orchestrator.attempt_drain(), None);
        }
        assert_eq!(h.appended(), vec![(0, 0)]);

        h.idle();
        h.idle();
        // no append in flight
        h.orchestrator.on_sink_idle();
        assert_eq!(h.appended(), vec![(0, 0), (0, 1)]);
        assert_eq!(h.orchestrator.attempt_drain(), None);
        assert_eq!(h.orchestrator.sink().violations, 0);
    }

    #[test]
    fn test_nothing_appended_before_sink_ready() {
        let mut h = Harness::new(QueuePolicy::Unbounded);
        h.playlist(2);
        h.respond("a");
        h.respond("b");

        assert!(h.appended().is_empty());
        assert_eq!(h.orchestrator.sink_state(), SinkState::Unavailable);
        assert_eq!(h.orchestrator.attempt_drain(), None);

        h.orchestrator.on_sink_ready();
        h.orchestrator.on_sink_ready();
        assert_eq!(h.appended(), vec![(0, 0)]);
        h.idle();
        h.idle();
        assert_eq!(h.appended(), vec![(0, 0), (1, 0)]);

        let ready = h
            .events()
            .iter()
            .filter(|e| matches!(e, PipelineEvent::SinkReady))
            .count();
        assert_eq!(ready, 1);
    }

    #[test]
    fn test_fragment_producing_nothing_still_advances() {
        let mut h = Harness::ready();
        h.playlist(2);
        h.respond("");
        assert_eq!(h.fetched(), vec![0, 1]);
        assert!(h.appended().is_empty());
        h.respond("x");
        assert_eq!(h.appended(), vec![(1, 0)]);
    }

    #[test]
    fn test_playlist_replacement_ignores_stale_fetch() {
        let mut h = Harness::ready();
        let first = h.playlist(3);
        h.respond("a|b|c");
        let stale = h.last_request();
        assert_eq!(stale.index, 1);

        let second = h.playlist(1);
        assert_ne!(first, second);
        assert!(stale.cancel.is_cancelled());
        assert_eq!(h.orchestrator.cursor(), 1);
        // (0,0) is in flight, (0,1) and (0,2) are discarded
        assert_eq!(h.orchestrator.pending_segments(), 0);

        h.respond_to(&stale, "old");
        assert_eq!(h.orchestrator.context().snapshot().stale_callbacks, 1);

        h.respond("new");
        h.idle();
        h.idle();
        assert_eq!(h.appended(), vec![(0, 0), (0, 0)]);
        assert_eq!(
            h.orchestrator.sink().payloads[1],
            Bytes::from_static(b"new")
        );
        assert_eq!(h.orchestrator.context().snapshot().segments_discarded, 2);
        assert!(h.orchestrator.sink().ended);
    }

    #[test]
    fn test_bounded_queue_defers_fetch() {
        let mut h = Harness::new(QueuePolicy::Bounded {
            max_pending_segments: 2,
        });
        h.orchestrator.on_sink_ready();
        h.playlist(3);
        h.respond("a|b|c");

        // (0,0) in flight, two pending
        assert_eq!(h.orchestrator.phase(), SequencerPhase::Deferred);
        assert_eq!(h.fetched(), vec![0]);

        h.idle();
        assert_eq!(h.orchestrator.pending_segments(), 1);
        assert_eq!(h.fetched(), vec![0, 1]);
        assert_eq!(h.orchestrator.phase(), SequencerPhase::Fetching(1));

        h.respond("d");
        assert_eq!(h.orchestrator.phase(), SequencerPhase::Deferred);
        h.idle();
        assert_eq!(h.fetched(), vec![0, 1, 2]);

        h.respond("e");
        for _ in 0..5 {
            h.idle();
        }
        assert_eq!(
            h.appended(),
            vec![(0, 0), (0, 1), (0, 2), (1, 0), (2, 0)]
        );
        assert_eq!(h.orchestrator.requester().max_outstanding, 1);
    }

    #[test]
    fn test_zero_bound_still_resumes() {
        let mut h = Harness::new(QueuePolicy::Bounded {
            max_pending_segments: 0,
        });
        h.orchestrator.on_sink_ready();
        h.playlist(2);
        h.respond("a|b");
        assert_eq!(h.orchestrator.phase(), SequencerPhase::Deferred);

        h.idle();
        assert_eq!(h.fetched(), vec![0, 1]);
        h.respond("c");
        h.idle();
        h.idle();
        assert_eq!(h.appended(), vec![(0, 0), (0, 1), (1, 0)]);
        assert!(h.orchestrator.sink().ended);
    }

    #[test]
    fn test_fetch_failure_stalls_sequencer() {
        let mut h = Harness::ready();
        let epoch = h.playlist(3);
        h.respond("a");
        h.orchestrator.requester_mut().outstanding = 0;
        h.orchestrator.on_fetch_failed(FetchFailure {
            epoch,
            index: 1,
            error: PlaybackError::FragmentFetchError("404".into()),
        });

        assert_eq!(h.orchestrator.phase(), SequencerPhase::Stalled(1));
        assert_eq!(h.fetched(), vec![0, 1]);
        let events = h.events();
        assert!(
            events
                .iter()
                .any(|e| matches!(e, PipelineEvent::FetchFailed { index: 1, .. }))
        );
        assert_eq!(count_complete(&events), 0);

        // segments already queued keep draining
        h.idle();
        assert!(!h.orchestrator.sink().ended);

        // a new playlist recovers
        h.playlist(1);
        h.respond("z");
        assert_eq!(h.orchestrator.phase(), SequencerPhase::StreamComplete);
    }

    #[test]
    fn test_remux_failure_continues_stream() {
        let mut h = Harness::ready();
        h.playlist(3);
        h.respond("a");
        h.respond("bad!");
        h.respond("c");
        h.idle();
        h.idle();

        assert_eq!(h.appended(), vec![(0, 0), (2, 0)]);
        assert_eq!(h.orchestrator.context().snapshot().remux_failures, 1);
        assert_eq!(h.orchestrator.phase(), SequencerPhase::StreamComplete);
    }

    #[test]
    fn test_fragment_stats_are_recorded() {
        let mut h = Harness::ready();
        h.playlist(2);
        h.respond("abcd");
        h.respond("ef");

        let stats = h.orchestrator.context().snapshot();
        assert_eq!(stats.playlists_loaded, 1);
        assert_eq!(stats.fragments_requested, 2);
        assert_eq!(stats.fragments_loaded, 2);
        assert_eq!(stats.fragment_bytes, 6);

        let ready: Vec<usize> = h
            .events()
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::FragmentReady { index, .. } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(ready, vec![0, 1]);
    }
}
