//! Fault-injecting service wrappers.
//!
//! Wrap any [`QueueService`] or [`BlobService`] and queue up errors for the
//! write paths. Downstream crates use these to exercise lazy-creation and
//! retry handling without a cloud account: inject a couple of
//! [`CloudError::TransientUnavailable`] failures and watch the caller back
//! off and recover.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use tracing::debug;

use crate::{BlobService, CloudError, QueueService, RawMessage, ReceiptHandle, Result};

fn pop_fault(faults: &Mutex<VecDeque<CloudError>>) -> Option<CloudError> {
    faults
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .pop_front()
}

/// Queue service wrapper that fails enqueues with scripted errors.
#[derive(Debug)]
pub struct FaultyQueueService {
    inner: Arc<dyn QueueService>,
    put_faults: Mutex<VecDeque<CloudError>>,
    put_attempts: AtomicUsize,
}

impl FaultyQueueService {
    /// Wrap `inner`, initially with no scripted faults.
    #[must_use]
    pub fn new(inner: Arc<dyn QueueService>) -> Self {
        Self {
            inner,
            put_faults: Mutex::new(VecDeque::new()),
            put_attempts: AtomicUsize::new(0),
        }
    }

    /// Script `fault` to be returned by the next un-scripted
    /// [`put_message`](QueueService::put_message) call. Faults are consumed
    /// in FIFO order.
    pub fn fail_next_put(&self, fault: CloudError) {
        self.put_faults
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(fault);
    }

    /// Total `put_message` attempts observed, including failed ones.
    #[must_use]
    pub fn put_attempts(&self) -> usize {
        self.put_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueueService for FaultyQueueService {
    async fn list_queues(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.list_queues(prefix).await
    }

    async fn create_queue(&self, queue: &str) -> Result<()> {
        self.inner.create_queue(queue).await
    }

    async fn delete_queue(&self, queue: &str) -> Result<()> {
        self.inner.delete_queue(queue).await
    }

    async fn put_message(&self, queue: &str, body: &[u8]) -> Result<()> {
        self.put_attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(fault) = pop_fault(&self.put_faults) {
            debug!(queue, %fault, "injecting scripted enqueue fault");
            return Err(fault);
        }
        self.inner.put_message(queue, body).await
    }

    async fn get_messages(&self, queue: &str, max: usize) -> Result<Vec<RawMessage>> {
        self.inner.get_messages(queue, max).await
    }

    async fn delete_message(&self, queue: &str, handle: &ReceiptHandle) -> Result<()> {
        self.inner.delete_message(queue, handle).await
    }

    async fn clear(&self, queue: &str) -> Result<()> {
        self.inner.clear(queue).await
    }

    async fn approximate_count(&self, queue: &str) -> Result<usize> {
        self.inner.approximate_count(queue).await
    }
}

/// Blob service wrapper that fails uploads with scripted errors.
#[derive(Debug)]
pub struct FaultyBlobService {
    inner: Arc<dyn BlobService>,
    upload_faults: Mutex<VecDeque<CloudError>>,
    upload_attempts: AtomicUsize,
}

impl FaultyBlobService {
    /// Wrap `inner`, initially with no scripted faults.
    #[must_use]
    pub fn new(inner: Arc<dyn BlobService>) -> Self {
        Self {
            inner,
            upload_faults: Mutex::new(VecDeque::new()),
            upload_attempts: AtomicUsize::new(0),
        }
    }

    /// Script `fault` to be returned by the next un-scripted
    /// [`upload`](BlobService::upload) call. Faults are consumed in FIFO
    /// order.
    pub fn fail_next_upload(&self, fault: CloudError) {
        self.upload_faults
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(fault);
    }

    /// Total `upload` attempts observed, including failed ones.
    #[must_use]
    pub fn upload_attempts(&self) -> usize {
        self.upload_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobService for FaultyBlobService {
    async fn create_container(&self, container: &str) -> Result<()> {
        self.inner.create_container(container).await
    }

    async fn upload(&self, container: &str, blob: &str, body: &[u8]) -> Result<()> {
        self.upload_attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(fault) = pop_fault(&self.upload_faults) {
            debug!(container, blob, %fault, "injecting scripted upload fault");
            return Err(fault);
        }
        self.inner.upload(container, blob, body).await
    }

    async fn download(&self, container: &str, blob: &str) -> Result<Option<Vec<u8>>> {
        self.inner.download(container, blob).await
    }

    async fn delete_blob(&self, container: &str, blob: &str) -> Result<bool> {
        self.inner.delete_blob(container, blob).await
    }

    async fn exists(&self, container: &str, blob: &str) -> Result<bool> {
        self.inner.exists(container, blob).await
    }

    async fn list_blobs(&self, container: &str, prefix: &str) -> Result<Vec<String>> {
        self.inner.list_blobs(container, prefix).await
    }
}
