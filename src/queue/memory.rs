//! In-memory pending-request counter.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::queue::{QueueCounter, QueueError};

/// Counter backed by a concurrent map; safe for many simultaneous requests.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    counts: DashMap<String, i64>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a key at zero so it is reported before its first request.
    pub fn ensure_key(&self, key: &str) {
        self.counts.entry(key.to_string()).or_insert(0);
    }

    /// Stop tracking a key.
    pub fn remove_key(&self, key: &str) {
        self.counts.remove(key);
    }

    /// Track exactly `keys` after a route reload.
    ///
    /// Keys no longer routed are dropped once idle; a stale key that still has
    /// requests in flight is kept so its decrements land, and goes on the
    /// next reload. Returns the dropped keys.
    pub fn sync_keys<I>(&self, keys: I) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        let keep: HashSet<String> = keys.into_iter().collect();
        for key in &keep {
            self.ensure_key(key);
        }

        let mut removed = Vec::new();
        self.counts.retain(|key, count| {
            if keep.contains(key) || *count != 0 {
                return true;
            }
            removed.push(key.clone());
            false
        });
        removed
    }
}

#[async_trait]
impl QueueCounter for MemoryQueue {
    async fn increase(&self, key: &str, delta: i64) -> Result<(), QueueError> {
        *self.counts.entry(key.to_string()).or_insert(0) += delta;
        Ok(())
    }

    async fn decrease(&self, key: &str, delta: i64) -> Result<(), QueueError> {
        let mut count = self.counts.entry(key.to_string()).or_insert(0);
        *count -= delta;
        if *count < 0 {
            *count = 0;
            return Err(QueueError::Negative(key.to_string()));
        }
        Ok(())
    }

    async fn current_for_host(&self, key: &str) -> Option<i64> {
        self.counts.get(key).map(|c| *c)
    }

    async fn current(&self) -> HashMap<String, i64> {
        self.counts
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn increase_and_decrease_balance() {
        let queue = MemoryQueue::new();
        assert_eq!(queue.current_for_host("ns/app").await, None);

        queue.increase("ns/app", 1).await.unwrap();
        queue.increase("ns/app", 1).await.unwrap();
        assert_eq!(queue.current_for_host("ns/app").await, Some(2));

        queue.decrease("ns/app", 1).await.unwrap();
        queue.decrease("ns/app", 1).await.unwrap();
        assert_eq!(queue.current_for_host("ns/app").await, Some(0));
    }

    #[tokio::test]
    async fn decrease_below_zero_clamps() {
        let queue = MemoryQueue::new();
        let err = queue.decrease("ns/app", 1).await.unwrap_err();
        assert_eq!(err, QueueError::Negative("ns/app".into()));
        assert_eq!(queue.current_for_host("ns/app").await, Some(0));
    }

    #[tokio::test]
    async fn concurrent_updates_are_not_lost() {
        let queue = Arc::new(MemoryQueue::new());
        let mut handles = Vec::new();
        for _ in 0..50 {
            let q = queue.clone();
            handles.push(tokio::spawn(async move {
                q.increase("ns/app", 1).await.unwrap();
                q.decrease("ns/app", 1).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(queue.current_for_host("ns/app").await, Some(0));
    }

    #[tokio::test]
    async fn snapshot_includes_ensured_keys() {
        let queue = MemoryQueue::new();
        queue.ensure_key("ns/idle");
        queue.increase("ns/busy", 3).await.unwrap();
        let snapshot = queue.current().await;
        assert_eq!(snapshot["ns/idle"], 0);
        assert_eq!(snapshot["ns/busy"], 3);
        queue.remove_key("ns/idle");
        assert!(!queue.current().await.contains_key("ns/idle"));
    }

    #[tokio::test]
    async fn sync_drops_idle_stale_keys_only() {
        let queue = MemoryQueue::new();
        queue.ensure_key("ns/old-idle");
        queue.increase("ns/old-busy", 1).await.unwrap();
        queue.ensure_key("ns/kept");

        let removed = queue.sync_keys(["ns/kept".to_string(), "ns/new".to_string()]);
        assert_eq!(removed, vec!["ns/old-idle".to_string()]);

        let snapshot = queue.current().await;
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot["ns/new"], 0);
        assert_eq!(snapshot["ns/old-busy"], 1);

        queue.decrease("ns/old-busy", 1).await.unwrap();
        assert!(queue.sync_keys(["ns/kept".to_string(), "ns/new".to_string()]).contains(&"ns/old-busy".to_string()));
        assert!(!queue.current().await.contains_key("ns/old-busy"));
    }
}
