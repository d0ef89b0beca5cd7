// announcer-core/src/config.rs

//! Configuration management for the scheduler announcer.
//!
//! This module provides configuration parsing from TOML files, environment
//! variable overrides, and validation of configuration values.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AnnouncerError, Result};
use crate::hostname;

// Top-level announcer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnouncerConfig {
    pub server: ServerConfig,
    pub host: HostConfig,
    pub manager: ManagerConfig,
    pub trainer: TrainerConfig,
    pub storage: StorageConfig,
}

/// Address this scheduler advertises to the manager and trainer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Hostname reported to the manager.
    pub host: String,
    /// IP reported to the manager.
    pub advertise_ip: IpAddr,
    /// Port reported to the manager.
    pub advertise_port: u16,
}

/// Placement tags of this host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub idc: String,
    pub location: String,
}

/// Manager connection and keepalive options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Manager gRPC address (host:port).
    pub addr: String,
    /// Scheduler cluster this node belongs to.
    pub scheduler_cluster_id: u64,
    /// Interval between keepalive messages.
    pub keepalive_interval_ms: u64,
    pub connect_timeout_ms: u64,
    /// Timeout for the registration call.
    pub request_timeout_ms: u64,
    // Initial delay before re-opening a broken keepalive stream.
    pub reconnect_delay_ms: u64,
    // Upper bound of the keepalive reconnect backoff.
    pub max_reconnect_delay_ms: u64,
}

/// Trainer connection and upload schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Whether datasets are uploaded to a trainer at all.
    pub enable: bool,
    /// Trainer gRPC address (host:port).
    pub addr: String,
    /// Interval between training rounds.
    pub interval_ms: u64,
    /// Deadline of a whole training round, from stream open to acknowledgement.
    pub upload_timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

// Dataset storage options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    // Directory holding the collected dataset files.
    pub base_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_default(),
            advertise_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            advertise_port: 8002,
        }
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:65003".to_string(),
            scheduler_cluster_id: 1,
            keepalive_interval_ms: 5_000,
            connect_timeout_ms: 5_000,
            request_timeout_ms: 30_000,
            reconnect_delay_ms: 1_000,
            max_reconnect_delay_ms: 30_000,
        }
    }
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            enable: false,
            addr: "127.0.0.1:9090".to_string(),
            interval_ms: 7 * 24 * 60 * 60 * 1000, // 7 days
            upload_timeout_ms: 60 * 60 * 1000,    // 1 hour
            connect_timeout_ms: 5_000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./data"),
        }
    }
}

impl ManagerConfig {
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }
}

impl TrainerConfig {
    /// Checks the training schedule.
    ///
    /// # Errors
    ///
    /// Returns an error if the round interval or the upload timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(AnnouncerError::config(
                "trainer.interval_ms must be greater than 0",
            ));
        }
        if self.upload_timeout_ms == 0 {
            return Err(AnnouncerError::config(
                "trainer.upload_timeout_ms must be greater than 0",
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_millis(self.upload_timeout_ms)
    }
}

impl FromStr for AnnouncerConfig {
    type Err = AnnouncerError;

    /// Parse configuration from a TOML string.
    fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s)
            .map_err(|e| AnnouncerError::config_with_source("failed to parse TOML config", e))
    }
}

fn env_parse<T: FromStr>(key: &str, target: &mut T) {
    if let Ok(val) = std::env::var(key) {
        if let Ok(v) = val.parse() {
            *target = v;
        }
    }
}

impl AnnouncerConfig {
    // Load configuration from a TOML file.
    //
    // The result is not validated, so environment overrides can still be
    // applied before calling `validate`.
    //
    // # Errors
    //
    // Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnnouncerError::storage_with_source(path, "failed to read config file", e)
        })?;
        content.parse()
    }

    // Apply environment variable overrides.
    //
    // Environment variables are prefixed with `SCHEDULER_` and use underscores
    // to separate nested fields. For example:
    // - `SCHEDULER_SERVER_HOST` overrides `server.host`
    // - `SCHEDULER_MANAGER_ADDR` overrides `manager.addr`
    // - `SCHEDULER_TRAINER_ENABLE` overrides `trainer.enable`
    // Values that fail to parse are ignored.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(val) = std::env::var("SCHEDULER_SERVER_HOST") {
            self.server.host = val;
        }
        env_parse("SCHEDULER_SERVER_ADVERTISE_IP", &mut self.server.advertise_ip);
        env_parse("SCHEDULER_SERVER_ADVERTISE_PORT", &mut self.server.advertise_port);

        // Host overrides
        if let Ok(val) = std::env::var("SCHEDULER_HOST_IDC") {
            self.host.idc = val;
        }
        if let Ok(val) = std::env::var("SCHEDULER_HOST_LOCATION") {
            self.host.location = val;
        }

        // Manager overrides
        if let Ok(val) = std::env::var("SCHEDULER_MANAGER_ADDR") {
            self.manager.addr = val;
        }
        env_parse(
            "SCHEDULER_MANAGER_SCHEDULER_CLUSTER_ID",
            &mut self.manager.scheduler_cluster_id,
        );
        env_parse(
            "SCHEDULER_MANAGER_KEEPALIVE_INTERVAL_MS",
            &mut self.manager.keepalive_interval_ms,
        );
        env_parse(
            "SCHEDULER_MANAGER_CONNECT_TIMEOUT_MS",
            &mut self.manager.connect_timeout_ms,
        );
        env_parse(
            "SCHEDULER_MANAGER_REQUEST_TIMEOUT_MS",
            &mut self.manager.request_timeout_ms,
        );

        // Trainer overrides
        env_parse("SCHEDULER_TRAINER_ENABLE", &mut self.trainer.enable);
        if let Ok(val) = std::env::var("SCHEDULER_TRAINER_ADDR") {
            self.trainer.addr = val;
        }
        env_parse("SCHEDULER_TRAINER_INTERVAL_MS", &mut self.trainer.interval_ms);
        env_parse(
            "SCHEDULER_TRAINER_UPLOAD_TIMEOUT_MS",
            &mut self.trainer.upload_timeout_ms,
        );

        // Storage overrides
        if let Ok(val) = std::env::var("SCHEDULER_STORAGE_BASE_DIR") {
            self.storage.base_dir = PathBuf::from(val);
        }

        self
    }

    // Validate all configuration values.
    //
    // # Errors
    //
    // Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        // Server validation
        if self.server.host.is_empty() {
            return Err(AnnouncerError::config("server.host must not be empty"));
        }
        if self.server.advertise_port == 0 {
            return Err(AnnouncerError::config(
                "server.advertise_port must be greater than 0",
            ));
        }

        // Manager validation
        if self.manager.addr.is_empty() {
            return Err(AnnouncerError::config("manager.addr must not be empty"));
        }
        if self.manager.scheduler_cluster_id == 0 {
            return Err(AnnouncerError::config(
                "manager.scheduler_cluster_id must be greater than 0",
            ));
        }
        if self.manager.keepalive_interval_ms == 0 {
            return Err(AnnouncerError::config(
                "manager.keepalive_interval_ms must be greater than 0",
            ));
        }
        if self.manager.connect_timeout_ms == 0 || self.manager.request_timeout_ms == 0 {
            return Err(AnnouncerError::config(
                "manager timeouts must be greater than 0",
            ));
        }
        if self.manager.reconnect_delay_ms > self.manager.max_reconnect_delay_ms {
            return Err(AnnouncerError::config(
                "manager.reconnect_delay_ms must not exceed manager.max_reconnect_delay_ms",
            ));
        }

        // Trainer validation, only relevant when uploads are enabled
        if self.trainer.enable {
            if self.trainer.addr.is_empty() {
                return Err(AnnouncerError::config("trainer.addr must not be empty"));
            }
            if self.trainer.connect_timeout_ms == 0 {
                return Err(AnnouncerError::config(
                    "trainer.connect_timeout_ms must be greater than 0",
                ));
            }
            self.trainer.validate()?;
        }

        Ok(())
    }
}
