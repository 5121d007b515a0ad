//! In-memory queue and blob services.
//!
//! These implementations back tests and transient single-process setups.
//! They reproduce the behaviors the real services are relied on for:
//! distinguishable not-found errors, per-delivery pop receipts, visibility
//! windows on receive, and absence-tolerant blob reads.

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::{Arc, RwLock},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use ulid::Ulid;

use crate::{BlobService, CloudError, QueueService, RawMessage, ReceiptHandle, Result};

/// Default visibility window applied to received messages.
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct StoredMessage {
    id: String,
    body: Vec<u8>,
    /// Receipt of the latest delivery, if the message was ever received.
    pop_receipt: Option<String>,
    /// Until this instant the message is hidden from receives.
    invisible_until: Option<Instant>,
}

impl StoredMessage {
    fn is_visible(&self, now: Instant) -> bool {
        self.invisible_until.is_none_or(|until| until <= now)
    }
}

/// In-memory queue service.
///
/// Messages are stored per queue in arrival order. A receive marks each
/// returned message invisible for the configured visibility window and
/// mints a fresh pop receipt, so stale receipts fail acknowledgement with
/// [`CloudError::MessageNotFound`] exactly like a hosted queue would.
///
/// # Concurrency
/// A single `RwLock` guards the queue map. Lock poisoning is recovered by
/// taking the inner value; the maps stay structurally valid regardless of
/// where a panic interrupted an operation.
#[derive(Debug, Clone)]
pub struct MemoryQueueService {
    queues: Arc<RwLock<HashMap<String, VecDeque<StoredMessage>>>>,
    visibility_timeout: Duration,
}

impl MemoryQueueService {
    /// Create an empty queue service with the default visibility window.
    #[must_use]
    pub fn new() -> Self {
        Self::with_visibility_timeout(DEFAULT_VISIBILITY_TIMEOUT)
    }

    /// Create an empty queue service with a custom visibility window.
    ///
    /// Short windows make handle-expiry behavior observable in tests.
    #[must_use]
    pub fn with_visibility_timeout(visibility_timeout: Duration) -> Self {
        Self {
            queues: Arc::new(RwLock::new(HashMap::new())),
            visibility_timeout,
        }
    }

    /// Number of queues currently present.
    #[must_use]
    pub fn queue_count(&self) -> usize {
        self.queues
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

impl Default for MemoryQueueService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueService for MemoryQueueService {
    async fn list_queues(&self, prefix: &str) -> Result<Vec<String>> {
        let queues = self.queues.read()?;
        let mut names: Vec<_> = queues
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect();
        names.sort();
        Ok(names)
    }

    async fn create_queue(&self, queue: &str) -> Result<()> {
        self.queues.write()?.entry(queue.to_string()).or_default();
        Ok(())
    }

    async fn delete_queue(&self, queue: &str) -> Result<()> {
        self.queues
            .write()?
            .remove(queue)
            .map(|_| ())
            .ok_or_else(|| CloudError::QueueNotFound(queue.to_string()))
    }

    async fn put_message(&self, queue: &str, body: &[u8]) -> Result<()> {
        let mut queues = self.queues.write()?;
        let messages = queues
            .get_mut(queue)
            .ok_or_else(|| CloudError::QueueNotFound(queue.to_string()))?;
        messages.push_back(StoredMessage {
            id: Ulid::new().to_string(),
            body: body.to_vec(),
            pop_receipt: None,
            invisible_until: None,
        });
        Ok(())
    }

    async fn get_messages(&self, queue: &str, max: usize) -> Result<Vec<RawMessage>> {
        let now = Instant::now();
        let mut queues = self.queues.write()?;
        let messages = queues
            .get_mut(queue)
            .ok_or_else(|| CloudError::QueueNotFound(queue.to_string()))?;

        let mut received = Vec::new();
        for message in messages.iter_mut() {
            if received.len() >= max {
                break;
            }
            if !message.is_visible(now) {
                continue;
            }
            let receipt = Ulid::new().to_string();
            message.pop_receipt = Some(receipt.clone());
            message.invisible_until = Some(now + self.visibility_timeout);
            received.push(RawMessage {
                handle: ReceiptHandle {
                    message_id: message.id.clone(),
                    pop_receipt: receipt,
                },
                body: message.body.clone(),
            });
        }
        Ok(received)
    }

    async fn delete_message(&self, queue: &str, handle: &ReceiptHandle) -> Result<()> {
        let mut queues = self.queues.write()?;
        let messages = queues
            .get_mut(queue)
            .ok_or_else(|| CloudError::QueueNotFound(queue.to_string()))?;

        let position = messages.iter().position(|message| {
            message.id == handle.message_id
                && message.pop_receipt.as_deref() == Some(handle.pop_receipt.as_str())
        });
        match position {
            Some(index) => {
                messages.remove(index);
                Ok(())
            }
            None => Err(CloudError::MessageNotFound {
                queue: queue.to_string(),
                message_id: handle.message_id.clone(),
            }),
        }
    }

    async fn clear(&self, queue: &str) -> Result<()> {
        let mut queues = self.queues.write()?;
        queues
            .get_mut(queue)
            .ok_or_else(|| CloudError::QueueNotFound(queue.to_string()))?
            .clear();
        Ok(())
    }

    async fn approximate_count(&self, queue: &str) -> Result<usize> {
        let queues = self.queues.read()?;
        queues
            .get(queue)
            .map(VecDeque::len)
            .ok_or_else(|| CloudError::QueueNotFound(queue.to_string()))
    }
}

/// In-memory blob store.
///
/// Containers are maps of blob name to bytes. `BTreeMap` keeps listings in
/// name order, which also keeps date-prefixed names in expiry order.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobService {
    containers: Arc<RwLock<HashMap<String, BTreeMap<String, Vec<u8>>>>>,
}

impl MemoryBlobService {
    /// Create an empty blob store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs in `container`, `0` when it does not exist.
    #[must_use]
    pub fn blob_count(&self, container: &str) -> usize {
        self.containers
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(container)
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl BlobService for MemoryBlobService {
    async fn create_container(&self, container: &str) -> Result<()> {
        self.containers
            .write()?
            .entry(container.to_string())
            .or_default();
        Ok(())
    }

    async fn upload(&self, container: &str, blob: &str, body: &[u8]) -> Result<()> {
        let mut containers = self.containers.write()?;
        let blobs = containers
            .get_mut(container)
            .ok_or_else(|| CloudError::ContainerNotFound(container.to_string()))?;
        blobs.insert(blob.to_string(), body.to_vec());
        Ok(())
    }

    async fn download(&self, container: &str, blob: &str) -> Result<Option<Vec<u8>>> {
        let containers = self.containers.read()?;
        Ok(containers
            .get(container)
            .and_then(|blobs| blobs.get(blob))
            .cloned())
    }

    async fn delete_blob(&self, container: &str, blob: &str) -> Result<bool> {
        let mut containers = self.containers.write()?;
        Ok(containers
            .get_mut(container)
            .is_some_and(|blobs| blobs.remove(blob).is_some()))
    }

    async fn exists(&self, container: &str, blob: &str) -> Result<bool> {
        let containers = self.containers.read()?;
        Ok(containers
            .get(container)
            .is_some_and(|blobs| blobs.contains_key(blob)))
    }

    async fn list_blobs(&self, container: &str, prefix: &str) -> Result<Vec<String>> {
        let containers = self.containers.read()?;
        Ok(containers.get(container).map_or_else(Vec::new, |blobs| {
            blobs
                .keys()
                .filter(|name| name.starts_with(prefix))
                .cloned()
                .collect()
        }))
    }
}
