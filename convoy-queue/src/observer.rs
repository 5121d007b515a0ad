//! Optional observation hooks for storage activity.
//!
//! A [`QueueStorage`](crate::QueueStorage) is constructed with the
//! [`NullObserver`] unless told otherwise. Keeping the observer optional
//! matters for one consumer in particular: a logging pipeline that ships
//! its records through a provider must build that provider observer-free,
//! or every observation would feed back into the pipeline observing it.

/// Hooks invoked by the provider as messages move through it.
///
/// All hooks default to no-ops; implementations override what they count.
/// Hooks are called outside the in-flight lock and must not block.
pub trait StorageObserver: Send + Sync + std::fmt::Debug {
    /// A message was enqueued. `overflowed` is set when the body was routed
    /// through the blob store.
    fn message_stored(&self, _queue: &str, _bytes: usize, _overflowed: bool) {}

    /// A batch of messages was received and handed to the caller.
    fn messages_received(&self, _queue: &str, _count: usize) {}

    /// A delivery was acknowledged.
    fn message_acked(&self, _queue: &str) {}

    /// A received wrapper pointed at a blob that no longer exists; the
    /// wrapping queue message was dropped.
    fn wrapper_orphaned(&self, _queue: &str, _blob: &str) {}

    /// An expiry sweep of the overflow container finished.
    fn overflow_swept(&self, _deleted: usize) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl StorageObserver for NullObserver {}
