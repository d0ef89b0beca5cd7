// announcer-core/src/manager/client.rs

//! Manager client implementation.
//!
//! This module provides the gRPC client the announcer uses to register the
//! scheduler and keep its registration alive.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tonic::transport::Channel;
use tonic::{Request, Status};

use super::backoff::Backoff;
use crate::config::ManagerConfig;
use crate::error::{AnnouncerError, Result};
use crate::grpc::{self, StreamingCall};
use crate::identity::NodeIdentity;
use crate::proto::manager as proto;
use crate::proto::manager::manager_client::ManagerClient as ManagerServiceClient;
use crate::shutdown::ShutdownListener;

/// Keepalive messages are tiny and sent on a timer, one slot is enough.
const KEEP_ALIVE_QUEUE_CAPACITY: usize = 1;

/// Trait for manager client implementations.
#[async_trait]
pub trait ManagerClient: Send + Sync {
    /// Registers this scheduler with the manager, or refreshes its record.
    async fn update_scheduler(&self, identity: &NodeIdentity) -> Result<()>;

    /// Sends keepalive messages every `interval` until `shutdown` fires.
    ///
    /// Stream failures are handled inside the client; this only returns once
    /// shutdown was observed.
    async fn keep_alive(
        &self,
        interval: Duration,
        identity: NodeIdentity,
        shutdown: ShutdownListener,
    );
}

/// gRPC-based manager client.
pub struct GrpcManagerClient {
    config: ManagerConfig,
    client: ManagerServiceClient<Channel>,
    backoff: Backoff,
}

impl GrpcManagerClient {
    /// Connects to the manager service.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or the manager is unreachable.
    pub async fn connect(config: ManagerConfig) -> Result<Self> {
        let connect_timeout = Duration::from_millis(config.connect_timeout_ms);
        let endpoint = grpc::endpoint(&config.addr, connect_timeout)
            .map_err(|e| AnnouncerError::manager_with_source("invalid manager address", e))?;

        let channel = endpoint.connect().await.map_err(|e| {
            AnnouncerError::manager_with_source(
                format!("failed to connect to manager at {}", config.addr),
                e,
            )
        })?;

        Ok(Self::with_channel(config, channel))
    }

    /// Creates a client over an existing channel.
    pub fn with_channel(config: ManagerConfig, channel: Channel) -> Self {
        let backoff = Backoff::from(&config);
        Self {
            config,
            client: ManagerServiceClient::new(channel),
            backoff,
        }
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.config.request_timeout_ms)
    }

    fn open_keep_alive(&self) -> StreamingCall<proto::KeepAliveRequest, ()> {
        let mut client = self.client.clone();
        StreamingCall::spawn(KEEP_ALIVE_QUEUE_CAPACITY, move |requests| async move {
            client.keep_alive(requests).await
        })
    }

    /// Runs one keepalive stream until shutdown or the first failure.
    async fn run_keep_alive_stream(
        &self,
        mut call: StreamingCall<proto::KeepAliveRequest, ()>,
        interval: Duration,
        request: &proto::KeepAliveRequest,
        shutdown: &mut ShutdownListener,
    ) -> std::result::Result<(), Status> {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.fired() => {
                    let close = call.close_and_recv();
                    return match tokio::time::timeout(self.request_timeout(), close).await {
                        Ok(response) => response,
                        Err(_) => Err(Status::deadline_exceeded("keepalive close timed out")),
                    };
                }
                _ = call.closed() => {
                    return match call.close_and_recv().await {
                        Ok(()) => Err(Status::aborted("manager ended the keepalive stream")),
                        Err(status) => Err(status),
                    };
                }
                _ = ticker.tick() => {
                    call.send(request.clone()).await?;
                }
            }
        }
    }
}

#[async_trait]
impl ManagerClient for GrpcManagerClient {
    async fn update_scheduler(&self, identity: &NodeIdentity) -> Result<()> {
        let mut client = self.client.clone();
        let request = Request::new(proto::UpdateSchedulerRequest::from(identity));
        let call = client.update_scheduler(request);

        let scheduler = tokio::time::timeout(self.request_timeout(), call)
            .await
            .map_err(|_| AnnouncerError::timeout("update scheduler", self.request_timeout()))?
            .map_err(|e| AnnouncerError::manager_with_source("failed to update scheduler", e))?
            .into_inner();

        tracing::info!(
            "Scheduler {} registered to manager (id={}, cluster={})",
            scheduler.hostname,
            scheduler.id,
            scheduler.scheduler_cluster_id
        );
        Ok(())
    }

    async fn keep_alive(
        &self,
        interval: Duration,
        identity: NodeIdentity,
        mut shutdown: ShutdownListener,
    ) {
        let request = proto::KeepAliveRequest::from(&identity);
        let mut attempt = 0u32;

        loop {
            let started = Instant::now();
            let call = self.open_keep_alive();
            let result = self
                .run_keep_alive_stream(call, interval, &request, &mut shutdown)
                .await;

            match result {
                Ok(()) => return,
                Err(status) if shutdown.is_fired() => {
                    tracing::debug!("Keepalive stream closed with error on shutdown: {}", status);
                    return;
                }
                Err(status) => {
                    tracing::warn!("Keepalive to manager {} failed: {}", self.config.addr, status);
                }
            }

            // A stream that stayed up longer than the backoff ceiling counts
            // as recovered.
            if started.elapsed() >= self.backoff.max_delay {
                attempt = 0;
            }
            let delay = self.backoff.delay_for_attempt(attempt);
            attempt = attempt.saturating_add(1);
            tokio::select! {
                _ = shutdown.fired() => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
