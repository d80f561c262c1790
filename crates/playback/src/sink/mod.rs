//! Buffer sinks: where remuxed segments end up.
//!
//! A sink accepts one segment at a time. [`BufferSink::append`] only starts the
//! ingestion; completion is reported later through the [`SinkNotifier`] the
//! sink was given, as an idle signal, preceded by an error signal if the
//! append failed. The orchestrator never calls `append` again before the idle
//! signal of the previous one has arrived.

mod file;

use hls::MediaSegment;
use tokio::sync::mpsc;
use tracing::trace;

use crate::driver::DriverEvent;
use crate::error::SinkError;

pub use file::FileSink;

pub trait BufferSink {
    /// Begin appending `segment`.
    ///
    /// `Err` means the segment was refused outright and the sink is still
    /// idle; no idle signal follows.
    fn append(&mut self, segment: MediaSegment) -> Result<(), SinkError>;

    /// No more segments will be appended for the current stream.
    fn end_of_stream(&mut self) {}
}

/// Reports sink state changes back to the playback driver.
#[derive(Debug, Clone)]
pub struct SinkNotifier {
    tx: mpsc::UnboundedSender<DriverEvent>,
}

impl SinkNotifier {
    pub(crate) fn new(tx: mpsc::UnboundedSender<DriverEvent>) -> Self {
        Self { tx }
    }

    /// The sink is attached and accepts appends. Signalled once.
    pub fn ready(&self) {
        self.send(DriverEvent::SinkReady);
    }

    /// The append in flight completed, successfully or not.
    pub fn idle(&self) {
        self.send(DriverEvent::SinkIdle);
    }

    /// The append in flight failed. Must be followed by [`Self::idle`].
    pub fn error(&self, error: SinkError) {
        self.send(DriverEvent::SinkError(error));
    }

    fn send(&self, event: DriverEvent) {
        if self.tx.send(event).is_err() {
            trace!("Playback driver stopped, dropping sink signal");
        }
    }
}
