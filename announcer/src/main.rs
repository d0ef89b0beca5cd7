//! Scheduler Announcer Daemon
//!
//! This binary registers a scheduler with the manager, keeps the registration
//! alive and, when enabled, uploads the scheduler's datasets to the trainer.
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings
//! scheduler-announcer
//!
//! # Start with configuration file
//! scheduler-announcer --config announcer.toml
//!
//! # Override a single value through the environment
//! SCHEDULER_TRAINER_ENABLE=true scheduler-announcer --config announcer.toml
//! ```

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use announcer_core::{
    Announcer, AnnouncerConfig, DatasetStorage, GrpcManagerClient, GrpcTrainerClient,
    LocalDatasetStorage, TrainerClient,
};

/// Scheduler Announcer
#[derive(Parser, Debug)]
#[command(name = "scheduler-announcer")]
#[command(
    about = "Registers a scheduler with the manager and uploads its datasets to the trainer"
)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn load_config(args: &Args) -> announcer_core::Result<AnnouncerConfig> {
    let config = match &args.config {
        Some(path) => AnnouncerConfig::from_file(path)?,
        None => AnnouncerConfig::default(),
    };
    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let filter = tracing_subscriber::filter::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(&args)?;

    tracing::info!("Starting scheduler announcer");
    tracing::info!(
        "  Scheduler: {} ({}:{})",
        config.server.host,
        config.server.advertise_ip,
        config.server.advertise_port
    );
    tracing::info!(
        "  Manager: {} (cluster {})",
        config.manager.addr,
        config.manager.scheduler_cluster_id
    );

    let manager = Arc::new(GrpcManagerClient::connect(config.manager.clone()).await?);
    let storage: Arc<dyn DatasetStorage> =
        Arc::new(LocalDatasetStorage::new(&config.storage).await?);
    tracing::info!(
        "  Storage: {} ({})",
        config.storage.base_dir.display(),
        storage.storage_type()
    );

    let trainer: Option<Arc<dyn TrainerClient>> = if config.trainer.enable {
        tracing::info!(
            "  Trainer: {} (every {:?})",
            config.trainer.addr,
            config.trainer.interval()
        );
        Some(Arc::new(GrpcTrainerClient::new(&config.trainer)?))
    } else {
        None
    };

    let announcer = Arc::new(Announcer::new(config, manager, storage, trainer).await?);

    let serving = tokio::spawn({
        let announcer = Arc::clone(&announcer);
        async move { announcer.serve().await }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down announcer...");

    announcer.stop().await;
    serving.await??;

    Ok(())
}
