//! Blob store abstraction.
//!
//! Named containers of named byte blobs. Reads never throw for absence:
//! a missing blob is `None`/`false`/empty, which lets callers distinguish
//! "gone" from "broken" without probing error strings. Only writes surface
//! [`CloudError::ContainerNotFound`](crate::CloudError::ContainerNotFound),
//! the signal used for lazy container creation.

use async_trait::async_trait;

use crate::Result;

/// Primitive operations of a hosted blob store.
#[async_trait]
pub trait BlobService: Send + Sync + std::fmt::Debug {
    /// Create a container. Creating a container that already exists is a
    /// no-op.
    async fn create_container(&self, container: &str) -> Result<()>;

    /// Write a blob, replacing any previous content.
    async fn upload(&self, container: &str, blob: &str, body: &[u8]) -> Result<()>;

    /// Read a blob. Returns `None` when the blob (or its container) does
    /// not exist.
    async fn download(&self, container: &str, blob: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a blob. Returns `false` when there was nothing to delete.
    async fn delete_blob(&self, container: &str, blob: &str) -> Result<bool>;

    /// Check blob existence without fetching its content.
    async fn exists(&self, container: &str, blob: &str) -> Result<bool>;

    /// List blob names starting with `prefix`. A missing container lists as
    /// empty.
    async fn list_blobs(&self, container: &str, prefix: &str) -> Result<Vec<String>>;
}
