// announcer-core/src/lib.rs

//! Scheduler Announcer - Core Library
//!
//! This crate keeps a scheduler node registered with the manager and
//! periodically streams the datasets it collected to the trainer. It provides
//! the announcer service, the collaborator traits it runs against, and gRPC
//! and local-disk implementations of those collaborators.

pub mod config;
pub mod error;
pub mod hostname;
pub mod identity;
pub mod shutdown;

// Re-export commonly used types for convenience
pub use config::AnnouncerConfig;
pub use error::{AnnouncerError, Result};
pub use identity::NodeIdentity;
pub use shutdown::{ShutdownListener, ShutdownSignal};

pub mod dataset;
pub use dataset::Dataset;

pub mod storage;
pub use storage::{DatasetReader, DatasetStorage, LocalDatasetStorage};

// Include generated protobuf code
pub mod proto {
    //! Generated messages, clients and servers of the manager and trainer
    //! gRPC services.

    pub mod manager {
        include!("proto/manager.v2.rs");
    }

    pub mod trainer {
        include!("proto/trainer.v1.rs");
    }
}
mod grpc;

pub mod manager;
pub use manager::{GrpcManagerClient, ManagerClient};

pub mod trainer;
pub use trainer::{GrpcTrainerClient, TrainChunk, TrainStream, TrainerClient};

pub mod announcer;
pub use announcer::{Announcer, UPLOAD_BUFFER_SIZE};

#[cfg(test)]
mod testing;
