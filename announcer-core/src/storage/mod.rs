// announcer-core/src/storage/mod.rs

//! Storage of the datasets the scheduler collects.
//!
//! The announcer consumes datasets through the [`DatasetStorage`] trait. The
//! [`LocalDatasetStorage`] backend reads the CSV files the scheduler writes
//! into its data directory, including rotated backups.
//!
//! # Example
//!
//! ```no_run
//! use announcer_core::config::StorageConfig;
//! use announcer_core::storage::{DatasetStorage, LocalDatasetStorage};
//! use tokio::io::AsyncReadExt;
//!
//! # async fn example() -> announcer_core::Result<()> {
//! let storage = LocalDatasetStorage::new(&StorageConfig::default()).await?;
//!
//! let mut reader = storage.open_download().await?;
//! let mut records = Vec::new();
//! reader.read_to_end(&mut records).await.unwrap();
//! # Ok(())
//! # }
//! ```

mod local;
mod traits;

pub use local::LocalDatasetStorage;
pub use traits::{DatasetReader, DatasetStorage};
