//! Integration tests for the queue storage provider.

mod support;

use std::sync::{Arc, atomic::Ordering};

use serde::{Deserialize, Serialize};

use convoy_cloud::{BlobService, MemoryBlobService, MemoryQueueService, QueueService};
use convoy_queue::{DEFAULT_TEMPORARY_CONTAINER, QueueStorage, RetryConfig, StorageConfig, codec};
use support::{CountingObserver, ProbeBlobService, ProbeQueueService};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Task {
    id: u32,
    name: String,
}

fn task(id: u32, name: &str) -> Task {
    Task {
        id,
        name: name.to_string(),
    }
}

fn test_config() -> StorageConfig {
    StorageConfig {
        max_message_size: 64 * 1024,
        retry: RetryConfig::immediate(3),
        ..StorageConfig::default()
    }
}

fn storage() -> (QueueStorage, Arc<MemoryQueueService>, Arc<MemoryBlobService>) {
    let queues = Arc::new(MemoryQueueService::new());
    let blobs = Arc::new(MemoryBlobService::new());
    let storage = QueueStorage::new(
        queues.clone() as Arc<dyn QueueService>,
        blobs.clone() as Arc<dyn BlobService>,
        test_config(),
    );
    (storage, queues, blobs)
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Calls an unsupported method")]
async fn test_small_message_round_trip() {
    let (storage, _, _) = storage();
    let message = task(1, "resize");

    storage.put("q1", &message).await.expect("put");
    let received: Vec<Task> = storage.get("q1", 10).await.expect("get");
    assert_eq!(received, vec![message.clone()]);

    assert!(storage.delete("q1", &message).await.expect("delete"));
    assert!(
        !storage.delete("q1", &message).await.expect("second delete"),
        "nothing left in flight to acknowledge"
    );
    assert_eq!(storage.approximate_count("q1").await.expect("count"), 0);
    assert!(storage.in_flight().is_empty());
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Calls an unsupported method")]
async fn test_oversize_message_routes_through_blob_store() {
    let (storage, _, blobs) = storage();
    let message = task(2, &"x".repeat(100_000));
    let encoded = codec::encode(&message).expect("encode");

    storage.put("q1", &message).await.expect("put");

    // The queue carries only a reference; the body sits in the temporary
    // container under a date-prefixed name.
    let names = blobs
        .list_blobs(DEFAULT_TEMPORARY_CONTAINER, "")
        .await
        .expect("list");
    assert_eq!(names.len(), 1);
    let expires = chrono::Utc::now() + chrono::Duration::days(7);
    assert!(
        names[0].starts_with(&format!("{}/q1/", expires.format("%Y-%m-%d"))),
        "unexpected blob name {}",
        names[0]
    );
    assert_eq!(
        blobs
            .download(DEFAULT_TEMPORARY_CONTAINER, &names[0])
            .await
            .expect("download"),
        Some(encoded),
        "blob bytes are exactly the message encoding"
    );

    let received: Vec<Task> = storage.get("q1", 10).await.expect("get");
    assert_eq!(received, vec![message.clone()]);

    assert!(storage.delete("q1", &message).await.expect("delete"));
    assert_eq!(
        blobs.blob_count(DEFAULT_TEMPORARY_CONTAINER),
        0,
        "acknowledgement reclaims the overflow blob"
    );
    assert_eq!(storage.approximate_count("q1").await.expect("count"), 0);
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Calls an unsupported method")]
async fn test_value_identical_duplicates_accumulate_handles() {
    let (storage, _, _) = storage();
    let message = task(3, "dedup-me");

    storage.put("q1", &message).await.expect("put");
    storage.put("q1", &message).await.expect("put");

    let received: Vec<Task> = storage.get("q1", 10).await.expect("get");
    assert_eq!(received.len(), 2);
    assert_eq!(
        storage.in_flight().len(),
        1,
        "equal values share one in-flight record"
    );

    assert!(storage.delete("q1", &message).await.expect("first delete"));
    assert!(storage.delete("q1", &message).await.expect("second delete"));
    assert!(
        !storage.delete("q1", &message).await.expect("third delete"),
        "both handles are spent"
    );
    assert_eq!(storage.approximate_count("q1").await.expect("count"), 0);
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Calls an unsupported method")]
async fn test_stranded_wrapper_is_dropped_and_acked() {
    let (storage, _, blobs) = storage();
    let observer = Arc::new(CountingObserver::default());
    let storage = storage.with_observer(observer.clone());
    let message = task(4, &"y".repeat(100_000));

    storage.put("q1", &message).await.expect("put");

    // Reclaim the blob out from under the wrapper, as the expiry sweep
    // eventually would.
    let names = blobs
        .list_blobs(DEFAULT_TEMPORARY_CONTAINER, "")
        .await
        .expect("list");
    assert!(
        blobs
            .delete_blob(DEFAULT_TEMPORARY_CONTAINER, &names[0])
            .await
            .expect("delete")
    );

    let received: Vec<Task> = storage.get("q1", 10).await.expect("get");
    assert!(received.is_empty(), "stranded wrapper is not delivered");
    assert_eq!(
        storage.approximate_count("q1").await.expect("count"),
        0,
        "the wrapping queue message was acknowledged"
    );
    assert!(storage.in_flight().is_empty());
    assert_eq!(observer.orphaned.load(Ordering::SeqCst), 1);
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Calls an unsupported method")]
async fn test_put_creates_missing_queue() {
    let (storage, _, _) = storage();

    storage.put("brand-new", &task(5, "first")).await.expect("put");
    assert_eq!(
        storage.approximate_count("brand-new").await.expect("count"),
        1
    );
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Calls an unsupported method")]
async fn test_missing_queue_reads_as_empty() {
    let (storage, _, _) = storage();

    let received: Vec<Task> = storage.get("ghost", 10).await.expect("get");
    assert!(received.is_empty());
    storage.clear("ghost").await.expect("clear is a no-op");
    assert!(!storage.delete_queue("ghost").await.expect("delete_queue"));
    assert_eq!(storage.approximate_count("ghost").await.expect("count"), 0);
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Calls an unsupported method")]
async fn test_clear_leaves_stale_records_that_delete_drops() {
    let (storage, _, _) = storage();
    let message = task(6, "doomed");

    storage.put("q1", &message).await.expect("put");
    let received: Vec<Task> = storage.get("q1", 10).await.expect("get");
    assert_eq!(received.len(), 1);

    // Clearing the queue does not touch in-flight bookkeeping.
    storage.clear("q1").await.expect("clear");
    assert_eq!(storage.in_flight().len(), 1);

    // The handle is gone server-side; delete reports false and the stale
    // record is dropped instead of being retried forever.
    assert!(!storage.delete("q1", &message).await.expect("delete"));
    assert!(storage.in_flight().is_empty());
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Calls an unsupported method")]
async fn test_put_range_and_delete_range() {
    let (storage, _, _) = storage();
    let batch = vec![task(7, "a"), task(8, "b"), task(9, "c")];

    storage.put_range("q1", &batch).await.expect("put_range");
    assert_eq!(storage.approximate_count("q1").await.expect("count"), 3);

    let received: Vec<Task> = storage.get("q1", 10).await.expect("get");
    assert_eq!(received.len(), 3);

    assert_eq!(
        storage.delete_range("q1", &batch).await.expect("delete_range"),
        3
    );
    assert_eq!(
        storage.delete_range("q1", &batch).await.expect("delete_range"),
        0,
        "nothing in flight on the second pass"
    );
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Calls an unsupported method")]
async fn test_list_delegates_with_prefix() {
    let (storage, _, _) = storage();

    for queue in ["jobs-a", "jobs-b", "other"] {
        storage.put(queue, &task(10, "x")).await.expect("put");
    }

    let listed = storage.list("jobs-").await.expect("list");
    assert_eq!(listed, vec!["jobs-a".to_string(), "jobs-b".to_string()]);
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Calls an unsupported method")]
async fn test_sweep_reclaims_only_expired_blobs() {
    let (storage, _, blobs) = storage();

    storage
        .put("q1", &task(11, &"z".repeat(100_000)))
        .await
        .expect("put");
    blobs
        .upload(DEFAULT_TEMPORARY_CONTAINER, "2001-01-01/q1/stale", b"old")
        .await
        .expect("upload");

    assert_eq!(storage.sweep_expired().await.expect("sweep"), 1);
    assert_eq!(
        blobs.blob_count(DEFAULT_TEMPORARY_CONTAINER),
        1,
        "the live overflow blob survives"
    );
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Calls an unsupported method")]
async fn test_observer_sees_the_message_lifecycle() {
    let (storage, _, _) = storage();
    let observer = Arc::new(CountingObserver::default());
    let storage = storage.with_observer(observer.clone());

    let small = task(12, "small");
    let large = task(13, &"w".repeat(100_000));
    storage.put("q1", &small).await.expect("put");
    storage.put("q1", &large).await.expect("put");

    let received: Vec<Task> = storage.get("q1", 10).await.expect("get");
    assert_eq!(received.len(), 2);

    assert!(storage.delete("q1", &small).await.expect("delete"));
    assert!(storage.delete("q1", &large).await.expect("delete"));

    assert_eq!(observer.stored.load(Ordering::SeqCst), 2);
    assert_eq!(observer.overflowed.load(Ordering::SeqCst), 1);
    assert_eq!(observer.received.load(Ordering::SeqCst), 2);
    assert_eq!(observer.acked.load(Ordering::SeqCst), 2);
    assert_eq!(observer.orphaned.load(Ordering::SeqCst), 0);
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Calls an unsupported method")]
async fn test_in_flight_lock_is_never_held_across_cloud_calls() {
    let queues = Arc::new(ProbeQueueService::new());
    let blobs = Arc::new(ProbeBlobService::new());
    let storage = QueueStorage::new(
        queues.clone() as Arc<dyn QueueService>,
        blobs.clone() as Arc<dyn BlobService>,
        test_config(),
    );

    let registry = storage.in_flight().clone();
    queues.set_probe({
        let registry = registry.clone();
        move || {
            assert!(
                !registry.is_locked(),
                "in-flight lock held across a queue service call"
            );
        }
    });
    blobs.set_probe({
        let registry = registry.clone();
        move || {
            assert!(
                !registry.is_locked(),
                "in-flight lock held across a blob service call"
            );
        }
    });

    // Drive every code path that touches both the registry and the cloud:
    // direct and overflow puts, a mixed get, acknowledgements, a stranded
    // wrapper, and the sweep.
    let small = task(14, "probe-small");
    let large = task(15, &"v".repeat(100_000));
    storage.put("q1", &small).await.expect("put");
    storage.put("q1", &large).await.expect("put");

    let received: Vec<Task> = storage.get("q1", 10).await.expect("get");
    assert_eq!(received.len(), 2);

    assert!(storage.delete("q1", &small).await.expect("delete"));
    assert!(storage.delete("q1", &large).await.expect("delete"));

    let stranded = task(16, &"u".repeat(100_000));
    storage.put("q1", &stranded).await.expect("put");
    let names = blobs
        .list_blobs(DEFAULT_TEMPORARY_CONTAINER, "")
        .await
        .expect("list");
    for name in names {
        blobs
            .delete_blob(DEFAULT_TEMPORARY_CONTAINER, &name)
            .await
            .expect("delete");
    }
    let received: Vec<Task> = storage.get("q1", 10).await.expect("get");
    assert!(received.is_empty());

    storage.sweep_expired().await.expect("sweep");
    assert!(storage.in_flight().is_empty());
}
