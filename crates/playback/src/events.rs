use hls::MediaFormat;
use tokio::sync::mpsc;
use tracing::trace;

use crate::error::{PlaybackError, SinkError};
use crate::stats::LoadStats;

/// Milestones reported to observers of the pipeline.
///
/// Events are informational; nothing an observer does with them feeds back
/// into the state machine.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// A playlist was installed. `epoch` identifies it in later callbacks.
    PlaylistReady {
        epoch: u64,
        fragment_count: usize,
        stats: Option<LoadStats>,
    },
    /// Playlist resolution failed; nothing was installed.
    PlaylistFailed { error: PlaybackError },
    FragmentReady { index: usize, stats: LoadStats },
    SegmentProduced {
        fragment_index: usize,
        sequence: usize,
        size: usize,
        format: MediaFormat,
    },
    /// A segment was handed to the sink.
    SegmentAppended {
        fragment_index: usize,
        sequence: usize,
    },
    /// No further fetch will be requested for the current playlist.
    StreamComplete,
    SinkReady,
    /// The fetch of `index` failed and the sequencer stopped.
    FetchFailed { index: usize, error: PlaybackError },
    /// The sink failed to ingest a segment; it has been dropped.
    AppendFailed {
        fragment_index: Option<usize>,
        error: SinkError,
    },
    /// Every segment of a completed stream reached the sink and the sink was
    /// told no more are coming.
    BufferEnded,
}

/// Sending half of the observer channel.
///
/// Emitting never blocks and never fails: with no receiver left the event is
/// dropped.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: Option<mpsc::UnboundedSender<PipelineEvent>>,
}

impl EventEmitter {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// An emitter that discards everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.tx {
            if let Err(e) = tx.send(event) {
                trace!("No observer for event {:?}", e.0);
            }
        }
    }
}
