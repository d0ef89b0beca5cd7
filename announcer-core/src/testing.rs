// announcer-core/src/testing.rs

//! In-memory collaborators shared by the announcer's unit tests.

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, ReadBuf};

use crate::announcer::Announcer;
use crate::config::AnnouncerConfig;
use crate::dataset::Dataset;
use crate::error::{AnnouncerError, Result};
use crate::identity::NodeIdentity;
use crate::manager::ManagerClient;
use crate::shutdown::ShutdownListener;
use crate::storage::{DatasetReader, DatasetStorage};
use crate::trainer::{TrainChunk, TrainStream, TrainerClient};

/// A valid configuration with the trainer enabled, ticking every second.
pub(crate) fn test_config() -> AnnouncerConfig {
    let mut config = AnnouncerConfig::default();
    config.server.host = "scheduler-0".to_string();
    config.server.advertise_ip = "10.0.0.2".parse().unwrap();
    config.server.advertise_port = 8002;
    config.host.idc = "idc-1".to_string();
    config.manager.scheduler_cluster_id = 1;
    config.trainer.enable = true;
    config.trainer.interval_ms = 1_000;
    config.trainer.upload_timeout_ms = 10_000;
    config
}

pub(crate) fn test_identity() -> NodeIdentity {
    NodeIdentity::from_config(&test_config())
}

pub(crate) async fn announcer_with(
    config: AnnouncerConfig,
    manager: Arc<MockManager>,
    storage: Arc<MockStorage>,
    trainer: Option<Arc<MockTrainer>>,
) -> Result<Announcer> {
    let trainer = trainer.map(|t| t as Arc<dyn TrainerClient>);
    Announcer::new(config, manager, storage, trainer).await
}

/// Counts how many wrapped readers were dropped.
pub(crate) struct TrackedReader<R> {
    inner: R,
    released: Arc<AtomicUsize>,
}

impl<R> TrackedReader<R> {
    pub(crate) fn new(inner: R, released: Arc<AtomicUsize>) -> Self {
        Self { inner, released }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for TrackedReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl<R> Drop for TrackedReader<R> {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

// Manager

#[derive(Default)]
pub(crate) struct MockManager {
    fail_registration: bool,
    registrations: AtomicUsize,
    keepalive_started: AtomicUsize,
    keepalive_stopped: AtomicUsize,
    heartbeats: AtomicUsize,
}

impl MockManager {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_registration: true,
            ..Default::default()
        })
    }

    pub(crate) fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    pub(crate) fn heartbeats(&self) -> usize {
        self.heartbeats.load(Ordering::SeqCst)
    }

    pub(crate) fn keepalive_started(&self) -> usize {
        self.keepalive_started.load(Ordering::SeqCst)
    }

    pub(crate) fn keepalive_stopped(&self) -> usize {
        self.keepalive_stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ManagerClient for MockManager {
    async fn update_scheduler(&self, _identity: &NodeIdentity) -> Result<()> {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        if self.fail_registration {
            return Err(AnnouncerError::manager("manager unavailable"));
        }
        Ok(())
    }

    async fn keep_alive(
        &self,
        interval: Duration,
        _identity: NodeIdentity,
        mut shutdown: ShutdownListener,
    ) {
        self.keepalive_started.fetch_add(1, Ordering::SeqCst);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.fired() => break,
                _ = tokio::time::sleep(interval) => {
                    self.heartbeats.fetch_add(1, Ordering::SeqCst);
                }
            }
        }
        self.keepalive_stopped.fetch_add(1, Ordering::SeqCst);
    }
}

// Storage

#[derive(Debug, Clone)]
pub(crate) enum DatasetSource {
    Bytes(Vec<u8>),
    Missing,
    /// Yields `prefix`, then fails.
    ReadError { prefix: Vec<u8> },
}

pub(crate) struct MockStorage {
    download: DatasetSource,
    network_topology: DatasetSource,
    opened: AtomicUsize,
    released: Arc<AtomicUsize>,
}

impl MockStorage {
    pub(crate) fn new(download: DatasetSource, network_topology: DatasetSource) -> Arc<Self> {
        Arc::new(Self {
            download,
            network_topology,
            opened: AtomicUsize::new(0),
            released: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Readers handed out so far.
    pub(crate) fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Readers dropped so far.
    pub(crate) fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    fn reader(&self, dataset: Dataset, source: &DatasetSource) -> Result<DatasetReader> {
        let reader: DatasetReader = match source {
            DatasetSource::Missing => {
                return Err(AnnouncerError::storage(
                    dataset.name(),
                    format!("no {dataset} dataset found"),
                ))
            }
            DatasetSource::Bytes(data) => {
                Box::new(TrackedReader::new(Cursor::new(data.clone()), self.released.clone()))
            }
            DatasetSource::ReadError { prefix } => {
                let mut builder = tokio_test::io::Builder::new();
                if !prefix.is_empty() {
                    builder.read(prefix);
                }
                builder.read_error(io::Error::new(io::ErrorKind::Other, "disk failure"));
                Box::new(TrackedReader::new(builder.build(), self.released.clone()))
            }
        };
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(reader)
    }
}

#[async_trait]
impl DatasetStorage for MockStorage {
    async fn open_download(&self) -> Result<DatasetReader> {
        self.reader(Dataset::Download, &self.download)
    }

    async fn open_network_topology(&self) -> Result<DatasetReader> {
        self.reader(Dataset::NetworkTopology, &self.network_topology)
    }

    fn storage_type(&self) -> &'static str {
        "memory"
    }
}

// Trainer

#[derive(Debug, Clone, Default)]
pub(crate) struct TrainerBehavior {
    pub fail_open: bool,
    /// Sends beyond this many per stream are rejected.
    pub fail_send_after: Option<usize>,
    /// How long the trainer takes to acknowledge a closed stream.
    pub finalize_delay: Duration,
    /// Only the first this many streams are delayed. All of them when unset.
    pub slow_rounds: Option<usize>,
    pub fail_finalize: bool,
}

#[derive(Default)]
struct TrainerState {
    opened: AtomicUsize,
    finalized: AtomicUsize,
    sent: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    chunks: Mutex<Vec<TrainChunk>>,
}

pub(crate) struct MockTrainer {
    behavior: TrainerBehavior,
    state: Arc<TrainerState>,
}

impl MockTrainer {
    pub(crate) fn new(behavior: TrainerBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            state: Arc::new(TrainerState::default()),
        })
    }

    /// Streams opened so far.
    pub(crate) fn opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    /// Streams acknowledged so far.
    pub(crate) fn finalized(&self) -> usize {
        self.state.finalized.load(Ordering::SeqCst)
    }

    /// Chunks accepted so far.
    pub(crate) fn sent(&self) -> usize {
        self.state.sent.load(Ordering::SeqCst)
    }

    /// Highest number of streams open at the same time.
    pub(crate) fn max_active(&self) -> usize {
        self.state.max_active.load(Ordering::SeqCst)
    }

    pub(crate) fn chunks(&self, dataset: Dataset) -> Vec<TrainChunk> {
        self.state
            .chunks
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.dataset == dataset)
            .cloned()
            .collect()
    }

    pub(crate) fn chunk_sizes(&self, dataset: Dataset) -> Vec<usize> {
        self.chunks(dataset).iter().map(|c| c.payload.len()).collect()
    }

    pub(crate) fn payload(&self, dataset: Dataset) -> Vec<u8> {
        self.chunks(dataset).into_iter().flat_map(|c| c.payload).collect()
    }
}

#[async_trait]
impl TrainerClient for MockTrainer {
    async fn train(&self) -> Result<Box<dyn TrainStream>> {
        if self.behavior.fail_open {
            return Err(AnnouncerError::trainer("trainer unavailable"));
        }

        let round = self.state.opened.fetch_add(1, Ordering::SeqCst);
        let active = self.state.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_active.fetch_max(active, Ordering::SeqCst);

        Ok(Box::new(MockTrainStream {
            behavior: self.behavior.clone(),
            state: self.state.clone(),
            round,
            sent: 0,
        }))
    }
}

struct MockTrainStream {
    behavior: TrainerBehavior,
    state: Arc<TrainerState>,
    round: usize,
    sent: usize,
}

#[async_trait]
impl TrainStream for MockTrainStream {
    async fn send(&mut self, chunk: TrainChunk) -> Result<()> {
        if self.behavior.fail_send_after.is_some_and(|limit| self.sent >= limit) {
            return Err(AnnouncerError::trainer("send rejected"));
        }
        self.sent += 1;
        self.state.sent.fetch_add(1, Ordering::SeqCst);
        self.state.chunks.lock().unwrap().push(chunk);
        Ok(())
    }

    async fn close_and_recv(self: Box<Self>) -> Result<()> {
        let slow = self.behavior.slow_rounds.map_or(true, |n| self.round < n);
        if slow && !self.behavior.finalize_delay.is_zero() {
            tokio::time::sleep(self.behavior.finalize_delay).await;
        }
        if self.behavior.fail_finalize {
            return Err(AnnouncerError::trainer("trainer rejected dataset"));
        }
        self.state.finalized.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for MockTrainStream {
    fn drop(&mut self) {
        self.state.active.fetch_sub(1, Ordering::SeqCst);
    }
}
