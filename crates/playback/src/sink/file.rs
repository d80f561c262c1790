use std::path::{Path, PathBuf};

use hls::MediaSegment;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::{BufferSink, SinkNotifier};
use crate::error::SinkError;

const WRITE_BUFFER_SIZE: usize = 1024 * 1024;

#[derive(Debug)]
enum WriteCommand {
    Append(MediaSegment),
    End,
}

/// A sink that concatenates segments into a file.
///
/// Writes happen on a background task; the sink becomes ready once the file
/// is created, and signals idle after each segment is written. Ending a stream
/// flushes the file but keeps it open, so a replacement playlist appends to
/// the same file. The writer stops when the sink is dropped.
pub struct FileSink {
    path: PathBuf,
    tx: mpsc::UnboundedSender<WriteCommand>,
}

impl FileSink {
    /// Spawn the writer task for `path`. The handle resolves to the number of
    /// bytes written once the sink is dropped.
    ///
    /// Must be called within a tokio runtime.
    pub fn create(
        path: impl Into<PathBuf>,
        notifier: SinkNotifier,
    ) -> (Self, JoinHandle<Result<u64, SinkError>>) {
        let path = path.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_writer(path.clone(), rx, notifier));
        (Self { path, tx }, handle)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BufferSink for FileSink {
    fn append(&mut self, segment: MediaSegment) -> Result<(), SinkError> {
        self.tx
            .send(WriteCommand::Append(segment))
            .map_err(|_| SinkError::Closed)
    }

    fn end_of_stream(&mut self) {
        if self.tx.send(WriteCommand::End).is_err() {
            debug!("File writer for {} already stopped", self.path.display());
        }
    }
}

async fn run_writer(
    path: PathBuf,
    mut rx: mpsc::UnboundedReceiver<WriteCommand>,
    notifier: SinkNotifier,
) -> Result<u64, SinkError> {
    let file = match File::create(&path).await {
        Ok(file) => file,
        Err(e) => {
            error!("Failed to create {}: {}", path.display(), e);
            let err = SinkError::from(e);
            notifier.error(err.clone());
            return Err(err);
        }
    };
    debug!("Created output file {}", path.display());
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
    let mut bytes_written = 0u64;
    notifier.ready();

    while let Some(command) = rx.recv().await {
        match command {
            WriteCommand::Append(segment) => {
                match writer.write_all(&segment.data).await {
                    Ok(()) => {
                        bytes_written += segment.size() as u64;
                    }
                    Err(e) => {
                        error!("Failed to write {} to {}: {}", segment, path.display(), e);
                        notifier.error(e.into());
                    }
                }
                notifier.idle();
            }
            WriteCommand::End => {
                if let Err(e) = flush_and_sync(&mut writer).await {
                    error!("Failed to flush {}: {}", path.display(), e);
                } else {
                    debug!(
                        "End of stream, {} bytes flushed to {}",
                        bytes_written,
                        path.display()
                    );
                }
            }
        }
    }

    flush_and_sync(&mut writer).await?;
    info!(
        "Finished writing {} bytes to {}",
        bytes_written,
        path.display()
    );
    Ok(bytes_written)
}

async fn flush_and_sync(writer: &mut BufWriter<File>) -> std::io::Result<()> {
    writer.flush().await?;
    writer.get_ref().sync_all().await
}
