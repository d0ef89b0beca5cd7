// announcer-core/src/trainer/client.rs

//! Trainer client implementation.

use std::time::Duration;

use async_trait::async_trait;
use tonic::transport::Channel;

use super::protocol::TrainChunk;
use crate::config::TrainerConfig;
use crate::error::{AnnouncerError, Result};
use crate::grpc::{self, StreamingCall};
use crate::proto::trainer as proto;
use crate::proto::trainer::trainer_client::TrainerClient as TrainerServiceClient;

/// Chunks are up to 1 MiB each; keep only a couple in flight per stream.
const TRAIN_QUEUE_CAPACITY: usize = 2;

/// Trait for trainer client implementations.
#[async_trait]
pub trait TrainerClient: Send + Sync {
    /// Opens a client-streaming training session.
    async fn train(&self) -> Result<Box<dyn TrainStream>>;
}

/// The send side of an open training session.
#[async_trait]
pub trait TrainStream: Send {
    /// Sends one dataset chunk.
    async fn send(&mut self, chunk: TrainChunk) -> Result<()>;

    /// Half-closes the session and waits for the trainer's acknowledgement.
    async fn close_and_recv(self: Box<Self>) -> Result<()>;
}

/// gRPC-based trainer client.
#[derive(Clone)]
pub struct GrpcTrainerClient {
    client: TrainerServiceClient<Channel>,
}

impl GrpcTrainerClient {
    /// Creates a client for the configured trainer.
    ///
    /// The connection is established lazily, so an unavailable trainer fails
    /// individual training rounds rather than startup.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn new(config: &TrainerConfig) -> Result<Self> {
        let connect_timeout = Duration::from_millis(config.connect_timeout_ms);
        let endpoint = grpc::endpoint(&config.addr, connect_timeout)
            .map_err(|e| AnnouncerError::trainer_with_source("invalid trainer address", e))?;

        Ok(Self::with_channel(endpoint.connect_lazy()))
    }

    /// Creates a client over an existing channel.
    pub fn with_channel(channel: Channel) -> Self {
        Self {
            client: TrainerServiceClient::new(channel),
        }
    }
}

#[async_trait]
impl TrainerClient for GrpcTrainerClient {
    async fn train(&self) -> Result<Box<dyn TrainStream>> {
        let mut client = self.client.clone();
        let call = StreamingCall::spawn(TRAIN_QUEUE_CAPACITY, move |requests| async move {
            client.train(requests).await
        });
        Ok(Box::new(GrpcTrainStream { call }))
    }
}

/// An open `trainer.v1.Trainer/Train` call. Dropping it before
/// [`TrainStream::close_and_recv`] aborts the call.
pub struct GrpcTrainStream {
    call: StreamingCall<proto::TrainRequest, ()>,
}

#[async_trait]
impl TrainStream for GrpcTrainStream {
    async fn send(&mut self, chunk: TrainChunk) -> Result<()> {
        self.call
            .send(chunk.into())
            .await
            .map_err(|e| AnnouncerError::trainer_with_source("failed to send train request", e))
    }

    async fn close_and_recv(self: Box<Self>) -> Result<()> {
        self.call
            .close_and_recv()
            .await
            .map_err(|e| {
                AnnouncerError::trainer_with_source("failed to receive train response", e)
            })
    }
}
