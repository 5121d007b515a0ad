//! Service start/stop state persisted in the blob store
//!
//! Long-running services check a shared flag to know whether an operator
//! wants them running. The flag is one tiny blob per service under a fixed
//! name prefix, so any process with blob access can flip it and every
//! worker sees the change on its next poll. This crate is a pure key-value
//! facade over the blob store; it knows nothing about the queue client.

#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

use std::{collections::BTreeSet, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use convoy_cloud::{BlobService, CloudError};

/// Container holding the per-service state blobs.
pub const DEFAULT_STATE_CONTAINER: &str = "convoy-services";

/// Name prefix of every state blob inside the container.
pub const STATE_PREFIX: &str = "service-state/";

/// Errors from the service state store.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The underlying blob service failed.
    #[error("Cloud service error: {0}")]
    Cloud(#[from] CloudError),

    /// A state blob held something other than a known state.
    #[error("Unrecognized state {value:?} for service {service}")]
    InvalidState {
        /// Service whose blob was unreadable.
        service: String,
        /// The offending blob content, lossily decoded.
        value: String,
    },
}

/// Specialized `Result` type for control operations.
pub type Result<T> = std::result::Result<T, ControlError>;

/// Whether a service should be running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceState {
    /// The service should run.
    Started,
    /// The service should idle.
    Stopped,
}

impl ServiceState {
    /// The opposite state.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Started => Self::Stopped,
            Self::Stopped => Self::Started,
        }
    }

    const fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::Started => b"Started",
            Self::Stopped => b"Stopped",
        }
    }

    fn parse(service: &str, body: &[u8]) -> Result<Self> {
        match body {
            b"Started" => Ok(Self::Started),
            b"Stopped" => Ok(Self::Stopped),
            other => Err(ControlError::InvalidState {
                service: service.to_string(),
                value: String::from_utf8_lossy(other).into_owned(),
            }),
        }
    }
}

/// Blob-backed registry of per-service start/stop flags.
#[derive(Debug, Clone)]
pub struct ServiceStateStore {
    blobs: Arc<dyn BlobService>,
    container: String,
    /// Services hidden from [`list`](Self::list); they can still be read
    /// and written by name.
    hidden: BTreeSet<String>,
}

impl ServiceStateStore {
    /// Create a store over the default container with nothing hidden.
    #[must_use]
    pub fn new(blobs: Arc<dyn BlobService>) -> Self {
        Self {
            blobs,
            container: DEFAULT_STATE_CONTAINER.to_string(),
            hidden: BTreeSet::new(),
        }
    }

    /// Use a different container.
    #[must_use]
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    /// Hide the named services from [`list`](Self::list). Useful for
    /// internal services an operator console should not offer to toggle.
    #[must_use]
    pub fn with_hidden_services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hidden = services.into_iter().map(Into::into).collect();
        self
    }

    fn blob_name(service: &str) -> String {
        format!("{STATE_PREFIX}{service}")
    }

    /// Write a service's state, creating the container on first use.
    ///
    /// # Errors
    /// If the write fails.
    pub async fn set(&self, service: &str, state: ServiceState) -> Result<()> {
        let name = Self::blob_name(service);
        match self
            .blobs
            .upload(&self.container, &name, state.as_bytes())
            .await
        {
            Err(e) if e.is_container_not_found() => {
                self.blobs.create_container(&self.container).await?;
                self.blobs
                    .upload(&self.container, &name, state.as_bytes())
                    .await?;
            }
            other => other?,
        }
        debug!(service, ?state, "service state written");
        Ok(())
    }

    /// Read a service's state. `None` when no flag has been written yet.
    ///
    /// # Errors
    /// If the read fails or the blob content is unrecognized.
    pub async fn get(&self, service: &str) -> Result<Option<ServiceState>> {
        let body = self
            .blobs
            .download(&self.container, &Self::blob_name(service))
            .await?;
        body.map(|body| ServiceState::parse(service, &body))
            .transpose()
    }

    /// Flip a service's state and return the new value. A service with no
    /// flag yet starts from [`ServiceState::Started`], so the first toggle
    /// stops it.
    ///
    /// # Errors
    /// If the read or write fails.
    pub async fn toggle(&self, service: &str) -> Result<ServiceState> {
        let current = self.get(service).await?.unwrap_or(ServiceState::Started);
        let next = current.toggled();
        self.set(service, next).await?;
        Ok(next)
    }

    /// List every visible service with a written flag, in name order.
    ///
    /// # Errors
    /// If the listing or any read fails.
    pub async fn list(&self) -> Result<Vec<(String, ServiceState)>> {
        let names = self
            .blobs
            .list_blobs(&self.container, STATE_PREFIX)
            .await?;

        let mut states = Vec::new();
        for name in names {
            let Some(service) = name.strip_prefix(STATE_PREFIX) else {
                continue;
            };
            if self.hidden.contains(service) {
                continue;
            }
            if let Some(state) = self.get(service).await? {
                states.push((service.to_string(), state));
            }
        }
        Ok(states)
    }

    /// Remove a service's flag. Removing a flag that was never written is
    /// fine.
    ///
    /// # Errors
    /// If the delete fails.
    pub async fn remove(&self, service: &str) -> Result<()> {
        self.blobs
            .delete_blob(&self.container, &Self::blob_name(service))
            .await?;
        Ok(())
    }
}
