// announcer-core/src/trainer/mod.rs

//! Trainer streaming client.
//!
//! A training round opens one [`TrainStream`], sends every dataset chunk on
//! it and finally half-closes it to collect the trainer's acknowledgement.

mod client;
pub mod protocol;

pub use client::{GrpcTrainStream, GrpcTrainerClient, TrainStream, TrainerClient};
pub use protocol::TrainChunk;
