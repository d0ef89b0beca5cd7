// announcer-core/src/announcer/mod.rs

//! The scheduler announcer service.
//!
//! An [`Announcer`] registers the scheduler with the manager when it is
//! created. [`Announcer::serve`] then keeps the registration alive in the
//! background and, when a trainer is configured, uploads the collected
//! datasets to it once per training interval until [`Announcer::stop`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use announcer_core::{Announcer, AnnouncerConfig, GrpcManagerClient, LocalDatasetStorage};
//!
//! # async fn example() -> announcer_core::Result<()> {
//! let config = AnnouncerConfig::from_file("announcer.toml")?;
//! let manager = GrpcManagerClient::connect(config.manager.clone()).await?;
//! let storage = LocalDatasetStorage::new(&config.storage).await?;
//!
//! let announcer =
//!     Arc::new(Announcer::new(config, Arc::new(manager), Arc::new(storage), None).await?);
//! let serving = tokio::spawn({
//!     let announcer = Arc::clone(&announcer);
//!     async move { announcer.serve().await }
//! });
//!
//! announcer.stop().await;
//! serving.await.ok();
//! # Ok(())
//! # }
//! ```

mod round;
mod upload;

pub use upload::UPLOAD_BUFFER_SIZE;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::AnnouncerConfig;
use crate::error::{AnnouncerError, Result};
use crate::identity::NodeIdentity;
use crate::manager::ManagerClient;
use crate::shutdown::ShutdownSignal;
use crate::storage::DatasetStorage;
use crate::trainer::TrainerClient;

/// Announces this scheduler to the manager and feeds its datasets to the
/// trainer.
pub struct Announcer {
    config: AnnouncerConfig,
    identity: NodeIdentity,
    manager: Arc<dyn ManagerClient>,
    trainer: Option<Arc<dyn TrainerClient>>,
    storage: Arc<dyn DatasetStorage>,
    shutdown: ShutdownSignal,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
    serving: AtomicBool,
}

impl Announcer {
    /// Validates `config` and registers the scheduler with the manager.
    ///
    /// When a trainer is supplied its schedule is checked even if
    /// `trainer.enable` is off, since the training loop will run on it.
    /// Registration is attempted exactly once. Nothing runs in the background
    /// until [`Announcer::serve`] is called.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or registration fails.
    pub async fn new(
        config: AnnouncerConfig,
        manager: Arc<dyn ManagerClient>,
        storage: Arc<dyn DatasetStorage>,
        trainer: Option<Arc<dyn TrainerClient>>,
    ) -> Result<Self> {
        config.validate()?;
        if trainer.is_some() {
            config.trainer.validate()?;
        }
        let identity = NodeIdentity::from_config(&config);

        manager.update_scheduler(&identity).await?;
        tracing::info!(
            "Announcer registered {} ({}:{}) in cluster {}",
            identity.hostname,
            identity.ip,
            identity.port,
            identity.cluster_id
        );

        Ok(Self {
            config,
            identity,
            manager,
            trainer,
            storage,
            shutdown: ShutdownSignal::new(),
            heartbeat: Mutex::new(None),
            serving: AtomicBool::new(false),
        })
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    pub fn has_trainer(&self) -> bool {
        self.trainer.is_some()
    }

    /// Starts the keepalive task and, with a trainer configured, runs the
    /// training loop until [`Announcer::stop`] is called.
    ///
    /// Without a trainer this returns as soon as the keepalive task is
    /// running.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error if the announcer is already serving or was
    /// stopped.
    pub async fn serve(&self) -> Result<()> {
        if self.shutdown.is_triggered() {
            return Err(AnnouncerError::lifecycle("announcer was stopped"));
        }
        if self.serving.swap(true, Ordering::SeqCst) {
            return Err(AnnouncerError::lifecycle("announcer is already serving"));
        }

        self.start_heartbeat().await;

        match &self.trainer {
            Some(trainer) => self.run_training_loop(trainer.as_ref()).await,
            None => tracing::info!("Trainer disabled, datasets will not be uploaded"),
        }
        Ok(())
    }

    /// Stops both loops and waits for the keepalive task to finish.
    ///
    /// A training round already in flight is left to complete or time out.
    /// Calling this more than once is harmless.
    pub async fn stop(&self) {
        if !self.shutdown.trigger() {
            tracing::debug!("Announcer already stopping");
        }

        let heartbeat = self.heartbeat.lock().await.take();
        if let Some(handle) = heartbeat {
            if let Err(e) = handle.await {
                tracing::warn!("Keepalive task ended abnormally: {}", e);
            }
        }
        tracing::info!("Announcer stopped");
    }

    async fn start_heartbeat(&self) {
        let manager = Arc::clone(&self.manager);
        let identity = self.identity.clone();
        let interval = self.config.manager.keepalive_interval();
        let shutdown = self.shutdown.subscribe();

        let mut heartbeat = self.heartbeat.lock().await;
        *heartbeat = Some(tokio::spawn(async move {
            manager.keep_alive(interval, identity, shutdown).await;
        }));
        tracing::info!("Keepalive to manager started, interval {:?}", interval);
    }

    async fn run_training_loop(&self, trainer: &dyn TrainerClient) {
        let period = self.config.trainer.interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut shutdown = self.shutdown.subscribe();

        tracing::info!("Training loop started, interval {:?}", period);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.fired() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.train(trainer).await {
                        tracing::error!("Training round failed: {}", e);
                    }
                }
            }
        }
        tracing::info!("Training loop stopped");
    }
}
