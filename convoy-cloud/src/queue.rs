//! Queue service abstraction.
//!
//! Models the primitive surface of a hosted message queue: named queues of
//! opaque byte payloads, at-least-once delivery with per-delivery receipt
//! handles, and approximate depth counters.

use async_trait::async_trait;

use crate::Result;

/// Per-delivery acknowledgement token.
///
/// A handle is minted on every receive and is the only way to delete that
/// specific delivery. Receiving the same stored message again (after its
/// visibility window lapses) mints a fresh pop receipt and invalidates the
/// previous one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceiptHandle {
    /// Service-assigned identifier of the stored message.
    pub message_id: String,
    /// Receipt for the current delivery attempt.
    pub pop_receipt: String,
}

/// A received message: the acknowledgement handle plus the raw payload.
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// Handle required to acknowledge this delivery.
    pub handle: ReceiptHandle,
    /// Opaque payload bytes exactly as enqueued.
    pub body: Vec<u8>,
}

/// Primitive operations of a hosted queue service.
///
/// Implementations must surface a distinguishable
/// [`CloudError::QueueNotFound`](crate::CloudError::QueueNotFound) whenever
/// the named queue does not exist; higher layers rely on that signal for
/// lazy creation and for treating missing queues as empty.
#[async_trait]
pub trait QueueService: Send + Sync + std::fmt::Debug {
    /// List queue names starting with `prefix`.
    async fn list_queues(&self, prefix: &str) -> Result<Vec<String>>;

    /// Create a queue. Creating a queue that already exists is a no-op.
    async fn create_queue(&self, queue: &str) -> Result<()>;

    /// Delete a queue and everything in it.
    async fn delete_queue(&self, queue: &str) -> Result<()>;

    /// Append a message to the queue.
    async fn put_message(&self, queue: &str, body: &[u8]) -> Result<()>;

    /// Receive up to `max` messages.
    ///
    /// Received messages stay stored but become invisible to further
    /// receives until acknowledged or until their visibility window lapses.
    async fn get_messages(&self, queue: &str, max: usize) -> Result<Vec<RawMessage>>;

    /// Acknowledge (delete) one delivery by its receipt handle.
    async fn delete_message(&self, queue: &str, handle: &ReceiptHandle) -> Result<()>;

    /// Remove every message from the queue, leaving the queue itself.
    async fn clear(&self, queue: &str) -> Result<()>;

    /// Approximate number of stored messages, including invisible ones.
    async fn approximate_count(&self, queue: &str) -> Result<usize>;
}
