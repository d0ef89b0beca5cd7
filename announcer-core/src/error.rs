// announcer-core/src/error.rs

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum AnnouncerError {

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Storage error at '{path}': {message}")]
    Storage {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Manager error: {message}")]
    Manager {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Trainer error: {message}")]
    Trainer {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A failure inside one step of a training round, tagged with the step name.
    #[error("{stage}: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<AnnouncerError>,
    },

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: String,
        timeout: Duration,
    },

    #[error("Lifecycle error: {message}")]
    Lifecycle {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, AnnouncerError>;

// Convenience constructors
impl AnnouncerError {

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn storage(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn storage_with_source(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn manager(message: impl Into<String>) -> Self {
        Self::Manager {
            message: message.into(),
            source: None,
        }
    }

    pub fn manager_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Manager {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn trainer(message: impl Into<String>) -> Self {
        Self::Trainer {
            message: message.into(),
            source: None,
        }
    }

    pub fn trainer_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Trainer {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn stage(stage: &'static str, source: AnnouncerError) -> Self {
        Self::Stage {
            stage,
            source: Box::new(source),
        }
    }

    pub fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout,
        }
    }

    pub fn lifecycle(message: impl Into<String>) -> Self {
        Self::Lifecycle {
            message: message.into(),
        }
    }

    /// Returns the stage tag if this error was raised by a training round step.
    pub fn stage_name(&self) -> Option<&'static str> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
