//! Configuration for the queue storage client.

use std::time::Duration;

use serde::Deserialize;

use crate::retry::RetryConfig;

/// Longest a received message is expected to stay unacknowledged.
///
/// Overflow blob names carry an expiry date this far in the future; the
/// sweep in [`OverflowStore`](crate::OverflowStore) deletes blobs whose
/// date has passed.
pub const MAX_IN_FLIGHT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// [`MAX_IN_FLIGHT`] in whole days, as encoded into blob names.
pub const MAX_IN_FLIGHT_DAYS: i64 = 7;

/// Container that hosts overflowed message bodies. Shared with any external
/// cleanup tooling.
pub const DEFAULT_TEMPORARY_CONTAINER: &str = "convoy-temporary";

const fn default_max_message_size() -> usize {
    64 * 1024
}

fn default_temporary_container() -> String {
    DEFAULT_TEMPORARY_CONTAINER.to_string()
}

/// Tunables for [`QueueStorage`](crate::QueueStorage).
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Serialized messages of this size or larger are routed through the
    /// blob store instead of riding the queue directly. Derived from the
    /// queue service's payload limit.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    /// Container for overflowed message bodies.
    #[serde(default = "default_temporary_container")]
    pub temporary_container: String,

    /// Retry budget for freshly created queues and containers.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_message_size: default_max_message_size(),
            temporary_container: default_temporary_container(),
            retry: RetryConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StorageConfig::default();
        assert_eq!(config.max_message_size, 64 * 1024);
        assert_eq!(config.temporary_container, DEFAULT_TEMPORARY_CONTAINER);
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: StorageConfig = ron::from_str("(max_message_size: 1024)").expect("parse");
        assert_eq!(config.max_message_size, 1024);
        assert_eq!(config.temporary_container, DEFAULT_TEMPORARY_CONTAINER);

        let config: StorageConfig =
            ron::from_str("(retry: (max_attempts: 2))").expect("parse");
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.base_delay_ms, 50);
    }
}
