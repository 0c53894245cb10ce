//! Runtime timeout settings.
//!
//! # Design Decisions
//! - Every upstream operation has a deadline: dial per attempt, header wait
//!   per request, cold-start wait per request
//! - Timeout errors are distinct from other forwarding errors in logs, but
//!   the client always sees 502

use std::time::Duration;

use crate::config::TimeoutConfig;

/// Timeouts consumed by the dialer and the upstream handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub keep_alive: Duration,
    pub response_header: Duration,
    pub workload_replicas: Duration,
}

impl From<&TimeoutConfig> for Timeouts {
    fn from(config: &TimeoutConfig) -> Self {
        Self {
            connect: Duration::from_millis(config.connect_ms),
            keep_alive: Duration::from_millis(config.keep_alive_ms),
            response_header: Duration::from_millis(config.response_header_ms),
            workload_replicas: Duration::from_millis(config.workload_replicas_ms),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::from(&TimeoutConfig::default())
    }
}
