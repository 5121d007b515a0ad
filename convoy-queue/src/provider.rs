//! The queue storage provider.
//!
//! [`QueueStorage`] is the public face of this crate: typed put/get/delete
//! against named queues, with oversize bodies transparently parked in the
//! blob store and in-flight deliveries tracked so acknowledgement can find
//! the raw handle that backs each value.
//!
//! One instance is meant to be shared across the workers of a process.
//! The only mutable shared state is the in-flight record map, guarded by a
//! mutex that is released before any cloud call.

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use convoy_cloud::{BlobService, QueueService, RawMessage};

use crate::{
    codec::{self, OverflowRef, QueuePayload},
    config::StorageConfig,
    error::Result,
    gateway::QueueClient,
    observer::{NullObserver, StorageObserver},
    overflow::OverflowStore,
    registry::InFlightRegistry,
    retry::ProvisioningRetry,
};

/// Typed work-queue client over a queue service and a blob store.
#[derive(Debug, Clone)]
pub struct QueueStorage {
    queue: QueueClient,
    overflow: OverflowStore,
    registry: Arc<InFlightRegistry>,
    observer: Arc<dyn StorageObserver>,
    config: StorageConfig,
}

impl QueueStorage {
    /// Create a provider over the given services.
    #[must_use]
    pub fn new(
        queues: Arc<dyn QueueService>,
        blobs: Arc<dyn BlobService>,
        config: StorageConfig,
    ) -> Self {
        let retry = ProvisioningRetry::new(config.retry.clone());
        Self {
            queue: QueueClient::new(queues, retry.clone()),
            overflow: OverflowStore::new(blobs, config.temporary_container.clone(), retry),
            registry: Arc::new(InFlightRegistry::new()),
            observer: Arc::new(NullObserver),
            config,
        }
    }

    /// Replace the observer. The default observer ignores everything, which
    /// is what a provider embedded in a logging pipeline must keep.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn StorageObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Handle to the in-flight record map, for instrumentation.
    #[must_use]
    pub fn in_flight(&self) -> &Arc<InFlightRegistry> {
        &self.registry
    }

    /// List queue names starting with `prefix`.
    ///
    /// # Errors
    /// If the listing fails.
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        self.queue.list(prefix).await
    }

    /// Receive up to `count` messages from `queue`.
    ///
    /// Direct payloads decode in place; overflow wrappers are resolved from
    /// the blob store. A wrapper whose blob is gone (reclaimed by the
    /// expiry sweep, typically) is dropped from the batch and its queue
    /// message acknowledged, since the data it pointed at no longer exists.
    /// Every returned message is recorded in flight until
    /// [`delete`](Self::delete).
    ///
    /// # Errors
    /// If the receive itself fails, or a payload is malformed.
    pub async fn get<T>(&self, queue: &str, count: usize) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send,
    {
        let raw = self.queue.receive(queue, count).await?;
        if raw.is_empty() {
            return Ok(Vec::new());
        }

        // Decode pass: record everything in flight before any blob I/O.
        // Slots keep arrival order stable while wrappers resolve.
        let mut slots: Vec<Option<T>> = Vec::with_capacity(raw.len());
        let mut wrappers: Vec<(usize, RawMessage, OverflowRef)> = Vec::new();
        for message in raw {
            match codec::decode_payload::<T>(&message.body)? {
                QueuePayload::Direct(value) => {
                    let key = codec::payload_body(&message.body).to_vec();
                    self.registry.insert_or_append(key, message, false);
                    slots.push(Some(value));
                }
                QueuePayload::Overflow(reference) => {
                    let key = codec::payload_body(&message.body).to_vec();
                    self.registry.insert_or_append(key, message.clone(), true);
                    let index = slots.len();
                    slots.push(None);
                    wrappers.push((index, message, reference));
                }
            }
        }

        for (index, message, reference) in wrappers {
            let wrapper_key = codec::payload_body(&message.body);
            match self.overflow.get(&reference).await? {
                None => {
                    warn!(queue, blob = %reference.blob, "overflow body missing, dropping stranded wrapper");
                    self.observer.wrapper_orphaned(queue, &reference.blob);
                    if let Err(e) = self.queue.ack(queue, &message.handle).await {
                        debug!(queue, error = %e, "could not acknowledge stranded wrapper");
                    }
                    self.registry.remove(wrapper_key);
                }
                Some(body) => match codec::decode::<T>(&body) {
                    Ok(value) => {
                        // From here on the value's own encoding is the
                        // in-flight identity, the same key a later
                        // delete(value) computes.
                        self.registry.rekey(wrapper_key, body);
                        slots[index] = Some(value);
                    }
                    Err(e) => {
                        warn!(queue, blob = %reference.blob, error = %e, "overflow body undecodable, skipping message");
                        self.registry.remove(wrapper_key);
                    }
                },
            }
        }

        let values: Vec<T> = slots.into_iter().flatten().collect();
        self.observer.messages_received(queue, values.len());
        Ok(values)
    }

    /// Enqueue one message.
    ///
    /// Bodies at or above the configured size threshold are uploaded to the
    /// temporary container under a date-prefixed name and replaced on the
    /// queue by a reference. The queue is created on first use.
    ///
    /// # Errors
    /// If encoding, the blob upload, or the enqueue fails.
    pub async fn put<T>(&self, queue: &str, message: &T) -> Result<()>
    where
        T: Serialize + Sync,
    {
        let body = codec::encode(message)?;
        let payload = if body.len() >= self.config.max_message_size {
            let blob = OverflowStore::expiring_name(queue);
            self.overflow.put(&blob, &body).await?;
            let reference = OverflowRef {
                container: self.overflow.container().to_string(),
                blob,
            };
            debug!(queue, blob = %reference.blob, bytes = body.len(), "routed oversize message through overflow store");
            self.observer.message_stored(queue, body.len(), true);
            codec::frame_overflow(&reference)?
        } else {
            self.observer.message_stored(queue, body.len(), false);
            codec::frame_direct(&body)
        };
        self.queue.enqueue(queue, &payload).await
    }

    /// Enqueue a batch of messages.
    ///
    /// Each message is enqueued independently; a failure part-way leaves
    /// the earlier messages on the queue.
    ///
    /// # Errors
    /// On the first message that fails to enqueue.
    pub async fn put_range<T>(&self, queue: &str, messages: &[T]) -> Result<()>
    where
        T: Serialize + Sync,
    {
        for message in messages {
            self.put(queue, message).await?;
        }
        Ok(())
    }

    /// Acknowledge one received message by value.
    ///
    /// Returns `false` when the value is not in flight here, or when its
    /// handle had already gone stale server-side (queue cleared or deleted,
    /// visibility window lapsed); in both cases there is nothing left to
    /// acknowledge and the in-flight record is dropped rather than retried
    /// forever. When several in-flight deliveries share this value, one
    /// call acknowledges the oldest.
    ///
    /// # Errors
    /// If encoding fails, the blob delete fails, or the acknowledgement
    /// fails for a reason other than a stale handle.
    pub async fn delete<T>(&self, queue: &str, message: &T) -> Result<bool>
    where
        T: Serialize + Sync,
    {
        let key = codec::encode(message)?;
        self.delete_by_key(queue, &key).await
    }

    /// Acknowledge a batch of received messages by value. Returns how many
    /// deliveries were actually acknowledged.
    ///
    /// # Errors
    /// As [`delete`](Self::delete), on the first message that fails.
    pub async fn delete_range<T>(&self, queue: &str, messages: &[T]) -> Result<usize>
    where
        T: Serialize + Sync,
    {
        let mut acked = 0;
        for message in messages {
            if self.delete(queue, message).await? {
                acked += 1;
            }
        }
        Ok(acked)
    }

    async fn delete_by_key(&self, queue: &str, key: &[u8]) -> Result<bool> {
        // Copy the front delivery out; the record map stays untouched until
        // the cloud calls below have settled.
        let Some((front, overflowing)) = self.registry.lookup_front(key) else {
            return Ok(false);
        };

        if overflowing {
            match codec::decode_overflow_ref(&front.body) {
                Ok(reference) => self.overflow.delete(&reference).await?,
                Err(e) => {
                    warn!(queue, error = %e, "in-flight record marked overflowing but payload is no reference");
                }
            }
        }

        let acked = match self.queue.ack(queue, &front.handle).await {
            Ok(()) => true,
            Err(e) if e.is_not_found() => {
                debug!(queue, error = %e, "handle no longer valid, dropping in-flight record");
                false
            }
            Err(e) => return Err(e),
        };

        self.registry.pop_front(key);
        if acked {
            self.observer.message_acked(queue);
        }
        Ok(acked)
    }

    /// Remove every message from `queue`. A missing queue is a no-op.
    ///
    /// In-flight records for the queue are left alone; their handles will
    /// come back stale on the next [`delete`](Self::delete), which cleans
    /// them up.
    ///
    /// # Errors
    /// If the clear fails.
    pub async fn clear(&self, queue: &str) -> Result<()> {
        self.queue.clear(queue).await
    }

    /// Delete `queue` entirely. Returns `false` when it did not exist.
    ///
    /// # Errors
    /// If the delete fails.
    pub async fn delete_queue(&self, queue: &str) -> Result<bool> {
        self.queue.delete_queue(queue).await
    }

    /// Approximate number of messages in `queue`, zero when missing.
    ///
    /// # Errors
    /// If the count fails.
    pub async fn approximate_count(&self, queue: &str) -> Result<usize> {
        self.queue.approximate_count(queue).await
    }

    /// Reclaim overflow blobs whose expiry date has passed. Returns the
    /// number of blobs deleted.
    ///
    /// # Errors
    /// If the sweep fails.
    pub async fn sweep_expired(&self) -> Result<usize> {
        let deleted = self.overflow.sweep_expired().await?;
        self.observer.overflow_swept(deleted);
        Ok(deleted)
    }
}
