//! Delivery Configuration
//!
//! Limits applied to outgoing messages and the optional housekeeping knobs for the
//! correlation tracker.

use core::time::Duration;
use serde::{Deserialize, Serialize};

use crate::{CourierError, Result};

// ----------------------------------------------------------------------------
// Delivery Configuration
// ----------------------------------------------------------------------------

/// Configuration for message delivery behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Maximum title length in characters
    pub max_title_length: usize,
    /// Maximum content length in characters
    pub max_content_length: usize,
    /// Age after which an unacknowledged correlation entry may be purged.
    /// `None` keeps entries until acknowledged.
    pub stale_correlation_ttl_secs: Option<u64>,
    /// Upper bound on messages pushed by a single reconnect replay.
    /// `None` replays every unconfirmed message.
    pub replay_batch_limit: Option<usize>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_title_length: 256,
            max_content_length: 32768,
            stale_correlation_ttl_secs: None,
            replay_batch_limit: None,
        }
    }
}

impl DeliveryConfig {
    /// Small limits and a short purge window, for tests
    pub fn testing() -> Self {
        Self {
            max_title_length: 64,
            max_content_length: 1024,
            stale_correlation_ttl_secs: Some(60),
            replay_batch_limit: None,
        }
    }

    /// Tight limits for constrained deployments
    pub fn strict() -> Self {
        Self {
            max_title_length: 128,
            max_content_length: 4096,
            stale_correlation_ttl_secs: Some(86400 * 7),
            replay_batch_limit: Some(500),
        }
    }

    /// Purge window as a duration, if configured
    pub fn stale_correlation_ttl(&self) -> Option<Duration> {
        self.stale_correlation_ttl_secs.map(Duration::from_secs)
    }

    /// Reject configurations that would refuse every message
    pub fn validate(&self) -> Result<()> {
        if self.max_title_length == 0 {
            return Err(CourierError::configuration(
                "max_title_length must be greater than zero",
            ));
        }
        if self.max_content_length == 0 {
            return Err(CourierError::configuration(
                "max_content_length must be greater than zero",
            ));
        }
        if self.replay_batch_limit == Some(0) {
            return Err(CourierError::configuration(
                "replay_batch_limit must be greater than zero when set",
            ));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
