//! Error types for the queue storage client.
//!
//! Failures split into wire-format problems ([`SerializationError`]) and
//! cloud-side problems ([`CloudError`] passed through, or
//! [`StorageError::RetryExhausted`] when a bounded retry gave up). Missing
//! queues and containers are mostly absorbed before they reach callers; what
//! does surface here is what the caller genuinely has to deal with.

use thiserror::Error;

use convoy_cloud::CloudError;

/// Wire-format errors from encoding or decoding queue payloads.
#[derive(Debug, Error)]
pub enum SerializationError {
    /// Encoding a message failed.
    #[error("Encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// Decoding a message failed.
    #[error("Decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    /// The payload's discriminator byte names no known payload shape.
    #[error("Unknown payload tag: {0:#04x}")]
    UnknownTag(u8),

    /// The payload carried no bytes at all.
    #[error("Empty queue payload")]
    EmptyPayload,
}

/// Top-level error type for queue storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// The underlying queue or blob service failed.
    #[error("Cloud service error: {0}")]
    Cloud(#[from] CloudError),

    /// A freshly created queue or container stayed unavailable for the
    /// whole retry budget.
    #[error("Retry budget exhausted after {attempts} attempts: {last}")]
    RetryExhausted {
        /// Attempts made, including the first.
        attempts: u32,
        /// The final transient error observed.
        #[source]
        last: CloudError,
    },
}

impl StorageError {
    /// Returns `true` if the failure stems from a missing queue, container,
    /// or message.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Cloud(e) if e.is_not_found())
    }

    /// Returns `true` if the failure is transient (either directly, or as
    /// the last error of an exhausted retry budget).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Cloud(e) => e.is_transient(),
            Self::RetryExhausted { last, .. } => last.is_transient(),
            Self::Serialization(_) => false,
        }
    }
}

/// Specialized `Result` type for queue storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
