// announcer-core/src/manager/mod.rs

//! Manager control-plane client.
//!
//! The announcer registers the scheduler once and then keeps the registration
//! alive through [`ManagerClient::keep_alive`], which owns its own reconnect
//! policy.

mod backoff;
mod client;
mod protocol;

pub use backoff::Backoff;
pub use client::{GrpcManagerClient, ManagerClient};
