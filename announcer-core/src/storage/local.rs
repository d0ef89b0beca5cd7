// announcer-core/src/storage/local.rs

//! Local filesystem dataset storage.
//!
//! Each dataset is an active CSV file plus zero or more rotated backups in
//! the same directory:
//!
//! ```text
//! data/
//!   download-2024-05-01T10-00-00.000.csv
//!   download.csv
//!   networktopology-2024-05-01T10-00-00.000.csv
//!   networktopology.csv
//! ```
//!
//! Opening a dataset yields one stream over the backups in name order,
//! followed by the active file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, File};
use tokio::io::AsyncReadExt;

use super::traits::{DatasetReader, DatasetStorage};
use crate::config::StorageConfig;
use crate::dataset::Dataset;
use crate::error::{AnnouncerError, Result};

const DOWNLOAD_FILE_PREFIX: &str = "download";
const NETWORK_TOPOLOGY_FILE_PREFIX: &str = "networktopology";
const CSV_FILE_EXT: &str = "csv";

/// Dataset storage backed by CSV files in a local directory.
#[derive(Debug)]
pub struct LocalDatasetStorage {
    /// Directory holding the dataset files.
    base_dir: PathBuf,
}

impl LocalDatasetStorage {
    /// Creates a new `LocalDatasetStorage` instance from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base directory cannot be created.
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let base_dir = config.base_dir.clone();

        if !fs::try_exists(&base_dir).await.unwrap_or(false) {
            fs::create_dir_all(&base_dir).await.map_err(|e| {
                AnnouncerError::storage_with_source(&base_dir, "failed to create base directory", e)
            })?;
        }

        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn file_prefix(dataset: Dataset) -> &'static str {
        match dataset {
            Dataset::Download => DOWNLOAD_FILE_PREFIX,
            Dataset::NetworkTopology => NETWORK_TOPOLOGY_FILE_PREFIX,
        }
    }

    /// Lists the files of a dataset in upload order: backups first, the
    /// active file last.
    async fn dataset_files(&self, dataset: Dataset) -> Result<Vec<PathBuf>> {
        let prefix = Self::file_prefix(dataset);
        let active_name = format!("{prefix}.{CSV_FILE_EXT}");
        let backup_prefix = format!("{prefix}-");
        let csv_suffix = format!(".{CSV_FILE_EXT}");

        let mut entries = fs::read_dir(&self.base_dir).await.map_err(|e| {
            AnnouncerError::storage_with_source(&self.base_dir, "failed to list directory", e)
        })?;

        let mut backups = Vec::new();
        let mut active = None;
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            AnnouncerError::storage_with_source(&self.base_dir, "failed to list directory", e)
        })? {
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }

            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };

            if name == active_name {
                active = Some(entry.path());
            } else if name.starts_with(&backup_prefix) && name.ends_with(&csv_suffix) {
                backups.push(entry.path());
            }
        }

        backups.sort();
        backups.extend(active);

        if backups.is_empty() {
            return Err(AnnouncerError::storage(
                self.base_dir.join(active_name),
                format!("no {dataset} dataset found"),
            ));
        }

        Ok(backups)
    }

    async fn open_dataset(&self, dataset: Dataset) -> Result<DatasetReader> {
        let files = self.dataset_files(dataset).await?;

        let mut reader: DatasetReader = Box::new(tokio::io::empty());
        for path in files {
            let file = File::open(&path).await.map_err(|e| {
                AnnouncerError::storage_with_source(&path, "failed to open dataset file", e)
            })?;
            reader = Box::new(reader.chain(file));
        }

        Ok(reader)
    }
}

#[async_trait]
impl DatasetStorage for LocalDatasetStorage {
    async fn open_download(&self) -> Result<DatasetReader> {
        self.open_dataset(Dataset::Download).await
    }

    async fn open_network_topology(&self) -> Result<DatasetReader> {
        self.open_dataset(Dataset::NetworkTopology).await
    }

    fn storage_type(&self) -> &'static str {
        "local"
    }
}
