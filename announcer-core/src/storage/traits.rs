// announcer-core/src/storage/traits.rs

//! Dataset storage abstraction used by the announcer.
//!
//! Storage hands out readable byte streams of the datasets collected by the
//! scheduler. The announcer never interprets their content.

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::dataset::Dataset;
use crate::error::Result;

/// A readable stream over one dataset. Dropping it releases the underlying
/// files.
pub type DatasetReader = Box<dyn AsyncRead + Send + Unpin>;

/// Source of the datasets uploaded to the trainer.
#[async_trait]
pub trait DatasetStorage: Send + Sync {
    /// Opens the download records collected so far.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset does not exist or cannot be opened.
    async fn open_download(&self) -> Result<DatasetReader>;

    /// Opens the network topology samples collected so far.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset does not exist or cannot be opened.
    async fn open_network_topology(&self) -> Result<DatasetReader>;

    /// Opens the given dataset.
    async fn open(&self, dataset: Dataset) -> Result<DatasetReader> {
        match dataset {
            Dataset::Download => self.open_download().await,
            Dataset::NetworkTopology => self.open_network_topology().await,
        }
    }

    /// Returns the storage type name (e.g., "local").
    fn storage_type(&self) -> &'static str;
}
