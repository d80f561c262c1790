//! Fragment acquisition in playlist order, one fetch at a time.

use std::sync::Arc;

use bytes::Bytes;
use hls::FragmentDescriptor;
use pipeline_common::StreamerContext;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::PlaybackError;
use crate::stats::LoadStats;

/// A fetch the sequencer wants performed.
#[derive(Debug, Clone)]
pub struct FragmentRequest {
    /// Playlist generation the request belongs to
    pub epoch: u64,
    /// Position in the playlist
    pub index: usize,
    pub fragment: FragmentDescriptor,
    /// Cancelled when the playlist is replaced or the pipeline stops
    pub cancel: CancellationToken,
}

/// Bytes of a completed fetch, echoing the request's epoch and index.
#[derive(Debug, Clone)]
pub struct FragmentResponse {
    pub epoch: u64,
    pub index: usize,
    pub data: Bytes,
    pub stats: LoadStats,
}

impl FragmentResponse {
    pub fn for_request(request: &FragmentRequest, data: Bytes, stats: LoadStats) -> Self {
        Self {
            epoch: request.epoch,
            index: request.index,
            data,
            stats,
        }
    }
}

/// A failed fetch, echoing the request's epoch and index.
#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub epoch: u64,
    pub index: usize,
    pub error: PlaybackError,
}

/// Starts fragment fetches on behalf of the sequencer.
///
/// `request` must return without waiting for the fetch; the result comes back
/// later as a [`FragmentResponse`] or [`FetchFailure`].
pub trait FragmentRequester {
    fn request(&mut self, request: FragmentRequest);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerPhase {
    AwaitingPlaylist,
    /// Fetch of this index is outstanding
    Fetching(usize),
    /// Bytes of this index are being remuxed
    Remuxing(usize),
    /// The next fetch is held back by the queue policy
    Deferred,
    /// The fetch of this index failed
    Stalled(usize),
    StreamComplete,
}

pub struct Sequencer<F> {
    requester: F,
    context: Arc<StreamerContext>,
    fragments: Vec<FragmentDescriptor>,
    cursor: usize,
    epoch: u64,
    cancel: CancellationToken,
    phase: SequencerPhase,
}

impl<F: FragmentRequester> Sequencer<F> {
    pub fn new(requester: F, context: Arc<StreamerContext>) -> Self {
        Self {
            requester,
            context,
            fragments: Vec::new(),
            cursor: 0,
            epoch: 0,
            cancel: CancellationToken::new(),
            phase: SequencerPhase::AwaitingPlaylist,
        }
    }

    /// Install a new fragment list and return its epoch.
    ///
    /// The previous list is dropped and its outstanding fetch, if any, is
    /// cancelled; results still in transit are recognised by their old epoch.
    pub fn reset(&mut self, fragments: Vec<FragmentDescriptor>) -> u64 {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.epoch += 1;
        self.fragments = fragments;
        self.cursor = 0;
        self.phase = SequencerPhase::AwaitingPlaylist;
        self.epoch
    }

    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    #[inline]
    pub fn is_current(&self, epoch: u64) -> bool {
        epoch == self.epoch
    }

    #[inline]
    pub fn phase(&self) -> SequencerPhase {
        self.phase
    }

    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[inline]
    pub fn has_next(&self) -> bool {
        self.cursor < self.fragments.len()
    }

    /// Request the fragment under the cursor and advance the cursor.
    ///
    /// Refuses while a fetch is outstanding, which is what keeps at most one
    /// fetch in flight.
    pub fn request_next(&mut self) -> Option<usize> {
        if let SequencerPhase::Fetching(outstanding) = self.phase {
            warn!(
                "{} Fetch of fragment {} still outstanding, not requesting another",
                self.context.name, outstanding
            );
            return None;
        }
        let fragment = self.fragments.get(self.cursor)?.clone();
        let index = self.cursor;
        self.cursor += 1;
        self.phase = SequencerPhase::Fetching(index);
        self.context.update_stats(|s| s.fragments_requested += 1);

        debug!(
            index,
            epoch = self.epoch,
            "{} Requesting fragment {}",
            self.context.name,
            fragment.locator
        );
        self.requester.request(FragmentRequest {
            epoch: self.epoch,
            index,
            fragment,
            cancel: self.cancel.child_token(),
        });
        Some(index)
    }

    /// Move from fetching `index` to remuxing it. False if `index` is not the
    /// outstanding fetch.
    pub fn begin_remux(&mut self, index: usize) -> bool {
        if self.phase == SequencerPhase::Fetching(index) {
            self.phase = SequencerPhase::Remuxing(index);
            true
        } else {
            false
        }
    }

    /// Whether a failure report for `index` matches the outstanding fetch.
    #[inline]
    pub fn is_fetching(&self, index: usize) -> bool {
        self.phase == SequencerPhase::Fetching(index)
    }

    pub fn defer(&mut self) {
        self.phase = SequencerPhase::Deferred;
    }

    #[inline]
    pub fn is_deferred(&self) -> bool {
        self.phase == SequencerPhase::Deferred
    }

    pub fn stall(&mut self, index: usize) {
        self.phase = SequencerPhase::Stalled(index);
    }

    /// Enter the terminal phase. True only on the transition, so callers
    /// signal completion once per playlist.
    pub fn complete(&mut self) -> bool {
        if self.phase == SequencerPhase::StreamComplete {
            return false;
        }
        self.phase = SequencerPhase::StreamComplete;
        true
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.phase == SequencerPhase::StreamComplete
    }

    /// Cancel whatever fetch is outstanding without touching the cursor.
    pub fn cancel_outstanding(&self) {
        self.cancel.cancel();
    }

    pub fn requester(&self) -> &F {
        &self.requester
    }

    pub fn requester_mut(&mut self) -> &mut F {
        &mut self.requester
    }
}
