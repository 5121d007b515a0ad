//! Instrumented services shared by the provider integration tests.

use std::sync::{
    Arc, RwLock,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;

use convoy_cloud::{
    BlobService, MemoryBlobService, MemoryQueueService, QueueService, RawMessage, ReceiptHandle,
    Result,
};
use convoy_queue::StorageObserver;

type Probe = Arc<dyn Fn() + Send + Sync>;

fn fire(probe: &RwLock<Option<Probe>>) {
    let guard = probe
        .read()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    if let Some(probe) = guard.as_ref() {
        probe();
    }
}

/// Queue service that runs a caller-installed probe at the start of every
/// operation. Tests use it to observe provider state (such as lock status)
/// at the moment of each simulated network call.
pub struct ProbeQueueService {
    inner: MemoryQueueService,
    probe: RwLock<Option<Probe>>,
}

impl std::fmt::Debug for ProbeQueueService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeQueueService")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl ProbeQueueService {
    pub fn new() -> Self {
        Self {
            inner: MemoryQueueService::new(),
            probe: RwLock::new(None),
        }
    }

    pub fn set_probe(&self, probe: impl Fn() + Send + Sync + 'static) {
        *self
            .probe
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(Arc::new(probe));
    }
}

#[async_trait]
impl QueueService for ProbeQueueService {
    async fn list_queues(&self, prefix: &str) -> Result<Vec<String>> {
        fire(&self.probe);
        self.inner.list_queues(prefix).await
    }

    async fn create_queue(&self, queue: &str) -> Result<()> {
        fire(&self.probe);
        self.inner.create_queue(queue).await
    }

    async fn delete_queue(&self, queue: &str) -> Result<()> {
        fire(&self.probe);
        self.inner.delete_queue(queue).await
    }

    async fn put_message(&self, queue: &str, body: &[u8]) -> Result<()> {
        fire(&self.probe);
        self.inner.put_message(queue, body).await
    }

    async fn get_messages(&self, queue: &str, max: usize) -> Result<Vec<RawMessage>> {
        fire(&self.probe);
        self.inner.get_messages(queue, max).await
    }

    async fn delete_message(&self, queue: &str, handle: &ReceiptHandle) -> Result<()> {
        fire(&self.probe);
        self.inner.delete_message(queue, handle).await
    }

    async fn clear(&self, queue: &str) -> Result<()> {
        fire(&self.probe);
        self.inner.clear(queue).await
    }

    async fn approximate_count(&self, queue: &str) -> Result<usize> {
        fire(&self.probe);
        self.inner.approximate_count(queue).await
    }
}

/// Blob service analogue of [`ProbeQueueService`].
pub struct ProbeBlobService {
    inner: MemoryBlobService,
    probe: RwLock<Option<Probe>>,
}

impl std::fmt::Debug for ProbeBlobService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeBlobService")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl ProbeBlobService {
    pub fn new() -> Self {
        Self {
            inner: MemoryBlobService::new(),
            probe: RwLock::new(None),
        }
    }

    pub fn set_probe(&self, probe: impl Fn() + Send + Sync + 'static) {
        *self
            .probe
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(Arc::new(probe));
    }
}

#[async_trait]
impl BlobService for ProbeBlobService {
    async fn create_container(&self, container: &str) -> Result<()> {
        fire(&self.probe);
        self.inner.create_container(container).await
    }

    async fn upload(&self, container: &str, blob: &str, body: &[u8]) -> Result<()> {
        fire(&self.probe);
        self.inner.upload(container, blob, body).await
    }

    async fn download(&self, container: &str, blob: &str) -> Result<Option<Vec<u8>>> {
        fire(&self.probe);
        self.inner.download(container, blob).await
    }

    async fn delete_blob(&self, container: &str, blob: &str) -> Result<bool> {
        fire(&self.probe);
        self.inner.delete_blob(container, blob).await
    }

    async fn exists(&self, container: &str, blob: &str) -> Result<bool> {
        fire(&self.probe);
        self.inner.exists(container, blob).await
    }

    async fn list_blobs(&self, container: &str, prefix: &str) -> Result<Vec<String>> {
        fire(&self.probe);
        self.inner.list_blobs(container, prefix).await
    }
}

/// Observer that counts every event it sees.
#[derive(Debug, Default)]
pub struct CountingObserver {
    pub stored: AtomicUsize,
    pub overflowed: AtomicUsize,
    pub received: AtomicUsize,
    pub acked: AtomicUsize,
    pub orphaned: AtomicUsize,
}

impl StorageObserver for CountingObserver {
    fn message_stored(&self, _queue: &str, _bytes: usize, overflowed: bool) {
        self.stored.fetch_add(1, Ordering::SeqCst);
        if overflowed {
            self.overflowed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn messages_received(&self, _queue: &str, count: usize) {
        self.received.fetch_add(count, Ordering::SeqCst);
    }

    fn message_acked(&self, _queue: &str) {
        self.acked.fetch_add(1, Ordering::SeqCst);
    }

    fn wrapper_orphaned(&self, _queue: &str, _blob: &str) {
        self.orphaned.fetch_add(1, Ordering::SeqCst);
    }
}
