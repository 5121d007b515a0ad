//! Error types for the cloud service abstractions.
//!
//! Every queue and blob operation returns [`CloudError`]. The variants are
//! deliberately coarse: callers care about whether the target resource is
//! missing, whether the failure is a transient availability window worth
//! retrying, or whether it is fatal and must surface.

use std::io;

use thiserror::Error;

/// Failure surfaced by a queue or blob service.
#[derive(Debug, Error)]
pub enum CloudError {
    /// The named queue does not exist.
    #[error("Queue not found: {0}")]
    QueueNotFound(String),

    /// The named blob container does not exist.
    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    /// The receipt handle no longer matches a live delivery (the message was
    /// already acknowledged, the receipt went stale, or the queue was
    /// cleared out from under it).
    #[error("Message {message_id} not found in queue {queue}")]
    MessageNotFound {
        /// Queue the acknowledgement targeted.
        queue: String,
        /// Identifier from the stale receipt handle.
        message_id: String,
    },

    /// The resource exists but is briefly unusable, typically the window
    /// right after a queue or container was created or deleted.
    #[error("Resource temporarily unavailable: {0}")]
    TransientUnavailable(String),

    /// Underlying transport or storage I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Any other service-side failure.
    #[error("Cloud service error: {0}")]
    Service(String),
}

impl CloudError {
    /// Returns `true` if the target queue was missing.
    #[must_use]
    pub const fn is_queue_not_found(&self) -> bool {
        matches!(self, Self::QueueNotFound(_))
    }

    /// Returns `true` if the target container was missing.
    #[must_use]
    pub const fn is_container_not_found(&self) -> bool {
        matches!(self, Self::ContainerNotFound(_))
    }

    /// Returns `true` if the referenced message or receipt was missing.
    #[must_use]
    pub const fn is_message_not_found(&self) -> bool {
        matches!(self, Self::MessageNotFound { .. })
    }

    /// Returns `true` for any missing-resource variant.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::QueueNotFound(_) | Self::ContainerNotFound(_) | Self::MessageNotFound { .. }
        )
    }

    /// Returns `true` if the failure is a transient availability window and
    /// retrying after a short backoff is reasonable.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::TransientUnavailable(_))
    }
}

/// Specialized `Result` type for cloud service operations.
pub type Result<T> = std::result::Result<T, CloudError>;

// Convenience conversion for lock poisoning inside in-memory services
impl<T> From<std::sync::PoisonError<T>> for CloudError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::Service(format!("Lock poisoned: {e}"))
    }
}
