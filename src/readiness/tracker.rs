//! In-memory readiness tracker.

use dashmap::DashMap;
use tokio::sync::watch;

use crate::readiness::ReadinessSource;

/// Ready-replica counts per routing key, each behind a watch channel.
#[derive(Debug, Default)]
pub struct ReadinessTracker {
    workloads: DashMap<String, watch::Sender<u32>>,
}

impl ReadinessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current ready replicas for a key and wake waiters.
    pub fn set(&self, key: &str, ready: u32) {
        let previous = self
            .workloads
            .entry(key.to_string())
            .or_insert_with(|| watch::channel(ready).0)
            .send_replace(ready);
        if previous != ready {
            tracing::debug!(routing_key = %key, previous, ready, "Workload readiness changed");
        }
    }

    /// Forget a key; subsequent lookups report no data.
    pub fn remove(&self, key: &str) {
        self.workloads.remove(key);
    }
}

impl ReadinessSource for ReadinessTracker {
    fn ready_replicas(&self, key: &str) -> Option<u32> {
        self.workloads.get(key).map(|tx| *tx.borrow())
    }

    fn subscribe(&self, key: &str) -> watch::Receiver<u32> {
        self.workloads
            .entry(key.to_string())
            .or_insert_with(|| watch::channel(0).0)
            .subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readiness::{wait_for_ready, WaitError};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn unknown_key_has_no_data() {
        let tracker = ReadinessTracker::new();
        assert_eq!(tracker.ready_replicas("ns/app"), None);
        tracker.set("ns/app", 0);
        assert_eq!(tracker.ready_replicas("ns/app"), Some(0));
        tracker.remove("ns/app");
        assert_eq!(tracker.ready_replicas("ns/app"), None);
    }

    #[tokio::test]
    async fn waiter_wakes_when_replicas_appear() {
        let tracker = Arc::new(ReadinessTracker::new());
        tracker.set("ns/app", 0);

        let t = tracker.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            t.set("ns/app", 1);
        });

        wait_for_ready(tracker.as_ref(), "ns/app", Duration::from_secs(2))
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn waiter_times_out() {
        let tracker = ReadinessTracker::new();
        tracker.set("ns/app", 0);
        let err = wait_for_ready(&tracker, "ns/app", Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, WaitError::Timeout { .. }));
    }
}
