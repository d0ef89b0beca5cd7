// announcer-core/src/announcer/round.rs

//! One training round: open a train stream, upload both datasets over it and
//! collect the trainer's acknowledgement.
//!
//! The two uploads only produce chunks into a bounded queue. A single writer
//! drains the queue into the stream, so the stream has exactly one sender.

use tokio::sync::mpsc;

use super::upload::{upload_dataset, UploadStats};
use super::Announcer;
use crate::dataset::Dataset;
use crate::error::{AnnouncerError, Result};
use crate::trainer::{TrainChunk, TrainStream, TrainerClient};

/// Chunks waiting for the writer. Each holds up to one upload buffer.
const UPLOAD_QUEUE_CAPACITY: usize = 2;

const FINALIZE_STAGE: &str = "finalize";

impl Announcer {
    /// Runs one training round bounded by the configured upload timeout.
    pub(crate) async fn train(&self, trainer: &dyn TrainerClient) -> Result<()> {
        let upload_timeout = self.config.trainer.upload_timeout();

        tokio::time::timeout(upload_timeout, self.run_round(trainer))
            .await
            .map_err(|_| AnnouncerError::timeout("training round", upload_timeout))?
    }

    async fn run_round(&self, trainer: &dyn TrainerClient) -> Result<()> {
        let mut stream = trainer.train().await?;
        let (queue, receiver) = mpsc::channel(UPLOAD_QUEUE_CAPACITY);

        let writer = write_chunks(stream.as_mut(), receiver);
        let download = self.upload(Dataset::Download, queue.clone());
        let topology = self.upload(Dataset::NetworkTopology, queue);

        let (written, download, topology) = tokio::join!(writer, download, topology);

        // A writer failure closes the queue, which in turn fails the uploads,
        // so it is the root cause whenever present.
        written?;
        let download =
            download.map_err(|e| AnnouncerError::stage(Dataset::Download.upload_stage(), e))?;
        let topology = topology
            .map_err(|e| AnnouncerError::stage(Dataset::NetworkTopology.upload_stage(), e))?;

        tracing::debug!(
            "Uploaded {} chunks ({} bytes) of download and {} chunks ({} bytes) of topology",
            download.chunks,
            download.bytes,
            topology.chunks,
            topology.bytes
        );

        stream
            .close_and_recv()
            .await
            .map_err(|e| AnnouncerError::stage(FINALIZE_STAGE, e))?;

        tracing::info!("Training round finished");
        Ok(())
    }

    /// Opens `dataset` and queues its chunks. The queue sender is dropped on
    /// return, which lets the writer finish once both uploads are done.
    async fn upload(
        &self,
        dataset: Dataset,
        queue: mpsc::Sender<TrainChunk>,
    ) -> Result<UploadStats> {
        let reader = self.storage.open(dataset).await?;
        upload_dataset(&self.identity, dataset, reader, &queue).await
    }
}

/// Sends every queued chunk on `stream` until all producers are gone.
///
/// On failure the receiver is dropped with the future, so blocked producers
/// fail instead of waiting forever.
async fn write_chunks(
    stream: &mut dyn TrainStream,
    mut receiver: mpsc::Receiver<TrainChunk>,
) -> Result<()> {
    while let Some(chunk) = receiver.recv().await {
        let dataset = chunk.dataset;
        stream
            .send(chunk)
            .await
            .map_err(|e| AnnouncerError::stage(dataset.upload_stage(), e))?;
    }
    Ok(())
}
