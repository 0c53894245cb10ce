//! Workload readiness, used to detect cold starts.
//!
//! # Data Flow
//! ```text
//! endpoint watcher (external)
//!     → ReadinessSource::set / ReadinessTracker::set(key, ready)
//!
//! Upstream handler
//!     → ready_replicas(key) == Some(0)  → cold start
//!     → subscribe(key) and wait for ready > 0 (bounded)
//! ```
//!
//! A key with no readiness data is treated as warm: the interceptor can run
//! without an endpoint feed and simply forwards.

use std::time::Duration;

use tokio::sync::watch;

pub mod tracker;

pub use tracker::ReadinessTracker;

/// Reports how many replicas of a workload are ready.
pub trait ReadinessSource: Send + Sync {
    /// Ready replicas for a routing key, `None` when nothing is known.
    fn ready_replicas(&self, key: &str) -> Option<u32>;

    /// Watch ready replicas for a routing key.
    fn subscribe(&self, key: &str) -> watch::Receiver<u32>;
}

/// Error waiting for a workload to become ready.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WaitError {
    #[error("no ready replicas for {key} after {waited:?}")]
    Timeout { key: String, waited: Duration },
    #[error("readiness feed for {0} closed")]
    Closed(String),
}

/// Wait until the workload behind `key` has at least one ready replica.
pub async fn wait_for_ready(
    source: &dyn ReadinessSource,
    key: &str,
    timeout: Duration,
) -> Result<(), WaitError> {
    let mut rx = source.subscribe(key);
    let woke = tokio::time::timeout(timeout, async {
        rx.wait_for(|ready| *ready > 0).await.map(|_| ())
    })
    .await;

    match woke {
        Ok(Ok(())) => Ok(()),
        Ok(Err(_)) => Err(WaitError::Closed(key.to_string())),
        Err(_) => Err(WaitError::Timeout {
            key: key.to_string(),
            waited: timeout,
        }),
    }
}
