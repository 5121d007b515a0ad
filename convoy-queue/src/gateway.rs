//! Queue service gateway.
//!
//! Thin wrapper over the primitive queue operations that bakes in two
//! policies the provider relies on:
//! - missing queues read as empty (receive, clear, count, delete) so drain
//!   logic stays idempotent
//! - a missing queue on enqueue is created on the spot, with the bounded
//!   provisioning retry absorbing the create-then-use window

use std::sync::Arc;

use tracing::debug;

use convoy_cloud::{QueueService, RawMessage, ReceiptHandle};

use crate::{error::Result, retry::ProvisioningRetry};

/// Gateway to the hosted queue service.
#[derive(Debug, Clone)]
pub struct QueueClient {
    queues: Arc<dyn QueueService>,
    retry: ProvisioningRetry,
}

impl QueueClient {
    /// Create a gateway over `queues`.
    pub fn new(queues: Arc<dyn QueueService>, retry: ProvisioningRetry) -> Self {
        Self { queues, retry }
    }

    /// List queue names starting with `prefix`.
    ///
    /// # Errors
    /// If the listing fails.
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self.queues.list_queues(prefix).await?)
    }

    /// Enqueue a payload, creating the queue on first use.
    ///
    /// # Errors
    /// If the enqueue fails for any reason other than the queue missing, or
    /// if the queue stays unavailable after creation for the whole retry
    /// budget.
    pub async fn enqueue(&self, queue: &str, payload: &[u8]) -> Result<()> {
        match self.queues.put_message(queue, payload).await {
            Err(e) if e.is_queue_not_found() => {
                debug!(queue, "creating queue on first use");
                self.queues.create_queue(queue).await?;
                self.retry
                    .run(|| self.queues.put_message(queue, payload))
                    .await
            }
            other => Ok(other?),
        }
    }

    /// Receive up to `max` raw messages. A missing queue reads as empty.
    ///
    /// # Errors
    /// If the receive fails.
    pub async fn receive(&self, queue: &str, max: usize) -> Result<Vec<RawMessage>> {
        match self.queues.get_messages(queue, max).await {
            Ok(messages) => Ok(messages),
            Err(e) if e.is_queue_not_found() => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Acknowledge one delivery. Not-found outcomes are the caller's to
    /// judge: they are benign during cleanup and meaningful elsewhere.
    ///
    /// # Errors
    /// If the acknowledgement fails, including
    /// [`CloudError::MessageNotFound`](convoy_cloud::CloudError::MessageNotFound)
    /// for stale handles.
    pub async fn ack(&self, queue: &str, handle: &ReceiptHandle) -> Result<()> {
        Ok(self.queues.delete_message(queue, handle).await?)
    }

    /// Remove every message from the queue. A missing queue is a no-op.
    ///
    /// # Errors
    /// If the clear fails.
    pub async fn clear(&self, queue: &str) -> Result<()> {
        match self.queues.clear(queue).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_queue_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the queue. Returns `false` when it did not exist.
    ///
    /// # Errors
    /// If the delete fails.
    pub async fn delete_queue(&self, queue: &str) -> Result<bool> {
        match self.queues.delete_queue(queue).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_queue_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Approximate queue depth. A missing queue counts as zero.
    ///
    /// # Errors
    /// If the count fails.
    pub async fn approximate_count(&self, queue: &str) -> Result<usize> {
        match self.queues.approximate_count(queue).await {
            Ok(count) => Ok(count),
            Err(e) if e.is_queue_not_found() => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}
