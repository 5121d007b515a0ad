//! Overflow store gateway.
//!
//! Oversize message bodies do not ride the queue; they are parked in a
//! blob container and replaced on the queue by a small reference. Blob
//! names are date-prefixed with their expiry so a sweep can reclaim bodies
//! whose wrapping queue message is long gone.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};
use ulid::Ulid;

use convoy_cloud::BlobService;

use crate::{
    codec::OverflowRef,
    config::MAX_IN_FLIGHT_DAYS,
    error::Result,
    retry::ProvisioningRetry,
};

/// Gateway to the blob container hosting overflowed message bodies.
#[derive(Debug, Clone)]
pub struct OverflowStore {
    blobs: Arc<dyn BlobService>,
    container: String,
    retry: ProvisioningRetry,
}

impl OverflowStore {
    /// Create a gateway writing into `container`.
    pub fn new(
        blobs: Arc<dyn BlobService>,
        container: impl Into<String>,
        retry: ProvisioningRetry,
    ) -> Self {
        Self {
            blobs,
            container: container.into(),
            retry,
        }
    }

    /// Container this gateway writes into.
    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Allocate a fresh blob name for a body overflowing from `queue`:
    /// `<expiry-date>/<queue>/<ulid>`.
    #[must_use]
    pub fn expiring_name(queue: &str) -> String {
        let expires = Utc::now() + chrono::Duration::days(MAX_IN_FLIGHT_DAYS);
        format!("{}/{queue}/{}", expires.format("%Y-%m-%d"), Ulid::new())
    }

    /// Upload a body, creating the container on first use.
    ///
    /// # Errors
    /// If the upload fails for any reason other than the container missing,
    /// or if the container stays unavailable after creation for the whole
    /// retry budget.
    pub async fn put(&self, blob: &str, body: &[u8]) -> Result<()> {
        match self.blobs.upload(&self.container, blob, body).await {
            Err(e) if e.is_container_not_found() => {
                debug!(container = %self.container, "creating overflow container on first use");
                self.blobs.create_container(&self.container).await?;
                self.retry
                    .run(|| self.blobs.upload(&self.container, blob, body))
                    .await
            }
            other => Ok(other?),
        }
    }

    /// Fetch an overflowed body. `None` means the blob is gone, which the
    /// caller treats as a stranded reference rather than an error.
    ///
    /// # Errors
    /// If the download fails.
    pub async fn get(&self, reference: &OverflowRef) -> Result<Option<Vec<u8>>> {
        Ok(self
            .blobs
            .download(&reference.container, &reference.blob)
            .await?)
    }

    /// Delete an overflowed body. Best-effort: a blob that is already gone
    /// is fine.
    ///
    /// # Errors
    /// If the delete fails.
    pub async fn delete(&self, reference: &OverflowRef) -> Result<()> {
        self.blobs
            .delete_blob(&reference.container, &reference.blob)
            .await?;
        Ok(())
    }

    /// Delete every blob in the container whose expiry-date prefix has
    /// passed. Returns the number of blobs deleted.
    ///
    /// Names that do not start with a `YYYY-MM-DD/` prefix are skipped;
    /// they were not written by this client.
    ///
    /// # Errors
    /// If listing fails, or a delete fails mid-sweep.
    pub async fn sweep_expired(&self) -> Result<usize> {
        let today = Utc::now().date_naive();
        let names = self.blobs.list_blobs(&self.container, "").await?;

        let mut deleted = 0;
        for name in names {
            let Some(prefix) = name.split('/').next() else {
                continue;
            };
            let Ok(expires) = chrono::NaiveDate::parse_from_str(prefix, "%Y-%m-%d") else {
                warn!(blob = %name, "skipping blob without an expiry-date prefix");
                continue;
            };
            if expires < today && self.blobs.delete_blob(&self.container, &name).await? {
                deleted += 1;
            }
        }
        if deleted > 0 {
            debug!(container = %self.container, deleted, "swept expired overflow blobs");
        }
        Ok(deleted)
    }
}
