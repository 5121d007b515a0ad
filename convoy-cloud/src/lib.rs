//! Abstract cloud storage surface for the convoy work-queue client
//!
//! This crate defines the primitive queue and blob operations the rest of
//! the workspace is written against:
//! - [`QueueService`]: named queues, receipt-handle acknowledgement,
//!   visibility windows
//! - [`BlobService`]: named containers of byte blobs with absence-tolerant
//!   reads
//! - [`MemoryQueueService`] / [`MemoryBlobService`]: complete in-memory
//!   implementations for tests and single-process use
//! - [`FaultyQueueService`] / [`FaultyBlobService`]: fault-injecting
//!   wrappers for exercising retry and lazy-creation paths

#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

pub mod blob;
pub mod error;
pub mod fault;
pub mod memory;
pub mod queue;

pub use blob::BlobService;
pub use error::{CloudError, Result};
pub use fault::{FaultyBlobService, FaultyQueueService};
pub use memory::{DEFAULT_VISIBILITY_TIMEOUT, MemoryBlobService, MemoryQueueService};
pub use queue::{QueueService, RawMessage, ReceiptHandle};
