//! Async driver: runs an [`Orchestrator`] on a single tokio task.
//!
//! Playlist resolution and fragment fetches run as their own tasks and report
//! back through one unbounded channel, together with the sink signals from
//! [`SinkNotifier`]. The driver task pops one [`DriverEvent`] at a time and
//! hands it to the matching orchestrator method, so the orchestrator's
//! run-to-completion callbacks never overlap.

use std::sync::Arc;

use bytes::Bytes;
use pipeline_common::{Processor, Statistics, StreamerContext};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PlaybackConfig;
use crate::error::{PlaybackError, SinkError};
use crate::events::{EventEmitter, PipelineEvent};
use crate::orchestrator::{
    FetchFailure, FragmentRequest, FragmentRequester, FragmentResponse, Orchestrator,
};
use crate::sink::{BufferSink, SinkNotifier};
use crate::source::{FragmentSource, ResolvedPlaylist};

/// Inputs of the driver task.
#[derive(Debug)]
pub enum DriverEvent {
    /// Resolve and play the playlist at this URL, replacing the current one.
    AttachSource(String),
    /// `attach` numbers the `AttachSource` the result belongs to.
    PlaylistLoaded {
        attach: u64,
        playlist: ResolvedPlaylist,
    },
    PlaylistFailed {
        attach: u64,
        error: PlaybackError,
    },
    FragmentLoaded(FragmentResponse),
    FragmentFailed(FetchFailure),
    SinkReady,
    SinkIdle,
    SinkError(SinkError),
}

/// Runs each fetch on its own task and posts the outcome to the driver.
pub struct TaskFetchRequester {
    source: Arc<dyn FragmentSource>,
    tx: mpsc::UnboundedSender<DriverEvent>,
}

impl TaskFetchRequester {
    pub fn new(source: Arc<dyn FragmentSource>, tx: mpsc::UnboundedSender<DriverEvent>) -> Self {
        Self { source, tx }
    }
}

impl FragmentRequester for TaskFetchRequester {
    fn request(&mut self, request: FragmentRequest) {
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = request.cancel.cancelled() => {
                    debug!("Fetch of fragment {} cancelled", request.index);
                    return;
                }
                result = source.fetch(&request.fragment) => result,
            };
            let event = match result {
                Ok(loaded) => DriverEvent::FragmentLoaded(FragmentResponse::for_request(
                    &request,
                    loaded.data,
                    loaded.stats,
                )),
                Err(error) => DriverEvent::FragmentFailed(FetchFailure {
                    epoch: request.epoch,
                    index: request.index,
                    error,
                }),
            };
            if tx.send(event).is_err() {
                debug!("Playback driver stopped before fragment {} arrived", request.index);
            }
        });
    }
}

/// Handle to a running playback pipeline.
pub struct PlaybackHandle {
    commands: mpsc::UnboundedSender<DriverEvent>,
    events: mpsc::UnboundedReceiver<PipelineEvent>,
    shutdown: CancellationToken,
    context: Arc<StreamerContext>,
    task: JoinHandle<()>,
}

impl PlaybackHandle {
    /// Resolve `url` and play it, replacing whatever is playing.
    pub fn attach_source(&self, url: impl Into<String>) -> Result<(), PlaybackError> {
        self.commands
            .send(DriverEvent::AttachSource(url.into()))
            .map_err(|_| PlaybackError::Stopped)
    }

    /// Next pipeline event, or `None` once the driver has stopped and every
    /// event was consumed.
    pub async fn next_event(&mut self) -> Option<PipelineEvent> {
        self.events.recv().await
    }

    pub fn statistics(&self) -> Statistics {
        self.context.snapshot()
    }

    pub fn context(&self) -> &Arc<StreamerContext> {
        &self.context
    }

    /// Stop the driver and wait for it to exit. Outstanding fetches are
    /// cancelled; the sink is left as is.
    pub async fn shutdown(self) -> Result<(), PlaybackError> {
        self.shutdown.cancel();
        self.task.await.map_err(|e| {
            warn!("Playback driver task failed: {}", e);
            PlaybackError::Stopped
        })
    }
}

/// Wires a fragment source, a remuxer and a sink into a running pipeline.
///
/// Create the driver first, hand [`PlaybackDriver::notifier`] to the sink,
/// then [`spawn`](PlaybackDriver::spawn) with that sink.
pub struct PlaybackDriver<R> {
    config: Arc<PlaybackConfig>,
    context: Arc<StreamerContext>,
    source: Arc<dyn FragmentSource>,
    remuxer: R,
    tx: mpsc::UnboundedSender<DriverEvent>,
    rx: mpsc::UnboundedReceiver<DriverEvent>,
}

impl<R> PlaybackDriver<R>
where
    R: Processor<Bytes> + Send + 'static,
{
    pub fn new(config: PlaybackConfig, source: Arc<dyn FragmentSource>, remuxer: R) -> Self {
        let context = Arc::new(StreamerContext::with_name(config.name.clone()));
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            config: Arc::new(config),
            context,
            source,
            remuxer,
            tx,
            rx,
        }
    }

    /// Signal channel for the sink passed to [`Self::spawn`].
    pub fn notifier(&self) -> SinkNotifier {
        SinkNotifier::new(self.tx.clone())
    }

    pub fn context(&self) -> Arc<StreamerContext> {
        Arc::clone(&self.context)
    }

    /// Start the driver task. Must be called within a tokio runtime.
    pub fn spawn<S>(self, sink: S) -> PlaybackHandle
    where
        S: BufferSink + Send + 'static,
    {
        let (events, events_rx) = EventEmitter::channel();
        let shutdown = CancellationToken::new();

        let requester = TaskFetchRequester::new(Arc::clone(&self.source), self.tx.clone());
        let orchestrator = Orchestrator::new(
            self.config.queue_config.policy,
            Arc::clone(&self.context),
            requester,
            self.remuxer,
            sink,
            events.clone(),
        );

        let driver = DriverLoop {
            orchestrator,
            source: self.source,
            tx: self.tx.clone(),
            rx: self.rx,
            events,
            shutdown: shutdown.clone(),
            context: Arc::clone(&self.context),
        };
        let task = tokio::spawn(driver.run());

        PlaybackHandle {
            commands: self.tx,
            events: events_rx,
            shutdown,
            context: self.context,
            task,
        }
    }
}

struct DriverLoop<R, S> {
    orchestrator: Orchestrator<TaskFetchRequester, R, S>,
    source: Arc<dyn FragmentSource>,
    tx: mpsc::UnboundedSender<DriverEvent>,
    rx: mpsc::UnboundedReceiver<DriverEvent>,
    events: EventEmitter,
    shutdown: CancellationToken,
    context: Arc<StreamerContext>,
}

impl<R, S> DriverLoop<R, S>
where
    R: Processor<Bytes>,
    S: BufferSink,
{
    async fn run(mut self) {
        let mut attach = 0u64;
        let mut resolve_cancel = self.shutdown.child_token();
        debug!("{} Playback driver started", self.context.name);

        loop {
            let event = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                event = self.rx.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            match event {
                DriverEvent::AttachSource(url) => {
                    resolve_cancel.cancel();
                    resolve_cancel = self.shutdown.child_token();
                    attach += 1;
                    info!("{} Attaching source {}", self.context.name, url);
                    self.spawn_resolve(attach, url, resolve_cancel.clone());
                }
                DriverEvent::PlaylistLoaded {
                    attach: id,
                    playlist,
                } => {
                    if id != attach {
                        debug!(
                            "{} Ignoring playlist {} of a replaced source",
                            self.context.name, playlist.url
                        );
                        continue;
                    }
                    self.orchestrator
                        .on_playlist_ready(playlist.fragments, Some(playlist.stats));
                }
                DriverEvent::PlaylistFailed { attach: id, error } => {
                    if id != attach {
                        continue;
                    }
                    warn!("{} Playlist resolution failed: {}", self.context.name, error);
                    self.events.emit(PipelineEvent::PlaylistFailed { error });
                }
                DriverEvent::FragmentLoaded(response) => {
                    self.orchestrator.on_fragment_bytes_ready(response)
                }
                DriverEvent::FragmentFailed(failure) => self.orchestrator.on_fetch_failed(failure),
                DriverEvent::SinkReady => self.orchestrator.on_sink_ready(),
                DriverEvent::SinkIdle => self.orchestrator.on_sink_idle(),
                DriverEvent::SinkError(error) => self.orchestrator.on_sink_error(error),
            }
        }

        resolve_cancel.cancel();
        self.orchestrator.shutdown();
        debug!("{} Playback driver stopped", self.context.name);
    }

    fn spawn_resolve(&self, attach: u64, url: String, cancel: CancellationToken) {
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Resolution of {} cancelled", url);
                    return;
                }
                result = source.resolve(&url) => result,
            };
            let event = match result {
                Ok(playlist) => DriverEvent::PlaylistLoaded { attach, playlist },
                Err(error) => DriverEvent::PlaylistFailed { attach, error },
            };
            if tx.send(event).is_err() {
                debug!("Playback driver stopped before {} was resolved", url);
            }
        });
    }
}
