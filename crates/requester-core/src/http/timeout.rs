//! Timeout configuration for HTTP requests
//!
//! Timeouts are enforced by the transport. A request that runs out of time
//! surfaces as [`Error::TransportTimeout`](crate::Error::TransportTimeout)
//! and is never retried.

use std::time::Duration;
use serde::{Deserialize, Serialize};

/// Timeout configuration for HTTP requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Connection timeout - time to establish a connection
    pub connect_timeout: Duration,
    /// Request timeout - total time for one attempt, body included
    pub request_timeout: Option<Duration>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl TimeoutConfig {
    /// Create a new timeout configuration
    pub fn new(connect_timeout: Duration, request_timeout: Option<Duration>) -> Self {
        Self {
            connect_timeout,
            request_timeout,
        }
    }

    /// Create a slow timeout configuration (for large archive downloads)
    pub fn slow() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            request_timeout: Some(Duration::from_secs(300)), // 5 minutes
        }
    }

    /// Override the request timeout
    pub fn with_request_timeout(&self, timeout: Duration) -> Self {
        let mut config = self.clone();
        config.request_timeout = Some(timeout);
        config
    }

    /// Validate timeout configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.connect_timeout.is_zero() {
            return Err("Connect timeout cannot be zero".to_string());
        }

        if let Some(request_timeout) = self.request_timeout {
            if request_timeout.is_zero() {
                return Err("Request timeout cannot be zero".to_string());
            }

            // Request timeout should be >= connect timeout
            if request_timeout < self.connect_timeout {
                return Err("Request timeout should be >= connect timeout".to_string());
            }
        }

        Ok(())
    }
}
