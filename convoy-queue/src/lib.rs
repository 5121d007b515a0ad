//! Work-queue storage client with transparent blob overflow
//!
//! This crate provides functionality to:
//! - Exchange serialized messages between worker processes via a hosted
//!   queue service
//! - Route oversize message bodies through a companion blob store behind a
//!   small on-queue reference
//! - Track received deliveries so acknowledgement-by-value finds the raw
//!   handle that backs each message
//! - Ride out the availability window of freshly created queues and
//!   containers with bounded, jittered retries

#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

pub mod codec;
pub mod config;
pub mod error;
pub mod gateway;
pub mod observer;
pub mod overflow;
pub mod provider;
pub mod registry;
pub mod retry;

pub use codec::{OverflowRef, QueuePayload};
pub use config::{DEFAULT_TEMPORARY_CONTAINER, MAX_IN_FLIGHT, MAX_IN_FLIGHT_DAYS, StorageConfig};
pub use error::{Result, SerializationError, StorageError};
pub use gateway::QueueClient;
pub use observer::{NullObserver, StorageObserver};
pub use overflow::OverflowStore;
pub use provider::QueueStorage;
pub use registry::InFlightRegistry;
pub use retry::{ProvisioningRetry, RetryConfig};
