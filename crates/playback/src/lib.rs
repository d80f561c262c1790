//! # Playback Engine
//!
//! Plays an HLS playlist into a buffered media sink that accepts one segment
//! at a time. Fragments are fetched one by one in playlist order, remuxed
//! synchronously as they arrive, queued, and drained into the sink whenever it
//! reports idle.
//!
//! ## Features
//!
//! - Event-driven [`Orchestrator`] state machine, testable with stub collaborators
//! - At most one fragment fetch and one sink append in flight
//! - Epoch-based rejection of callbacks from a replaced playlist
//! - Explicit [`QueuePolicy`] for slow sinks
//! - HTTP fragment source with retries and load statistics
//! - Async [`PlaybackDriver`] running the orchestrator on a single tokio task

pub mod builder;
pub mod config;
pub mod driver;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod sink;
pub mod source;
pub mod stats;

pub use builder::PlaybackConfigBuilder;
pub use config::{
    FetcherConfig, HttpConfig, PlaybackConfig, PlaylistConfig, QueueConfig, QueuePolicy,
};
pub use error::{PlaybackError, SinkError};
pub use events::{EventEmitter, PipelineEvent};
pub use stats::{LoadStats, LoadTimer};

pub use orchestrator::{
    FetchFailure, FragmentRequest, FragmentRequester, FragmentResponse, Orchestrator,
    SequencerPhase, SinkState,
};

pub use driver::{DriverEvent, PlaybackDriver, PlaybackHandle, TaskFetchRequester};
pub use sink::{BufferSink, FileSink, SinkNotifier};
pub use source::{
    FragmentSource, HttpFragmentSource, LoadedFragment, ResolvedPlaylist, create_client,
};
