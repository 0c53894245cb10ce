//! Pending-request counting.
//!
//! # Data Flow
//! ```text
//! Counting middleware
//!     → QueueCounter::increase(key, 1)      (before forwarding)
//!     → QueueCounter::decrease(key, 1)      (after the response completes)
//!     → QueueCounter::current_for_host(key) (republished as a gauge)
//!
//! External scaler
//!     → admin /queue → QueueCounter::current()
//! ```
//!
//! The counter is an external collaborator; `memory.rs` is the in-process
//! implementation used by the binary and the tests.

use std::collections::HashMap;

use async_trait::async_trait;

pub mod memory;

pub use memory::MemoryQueue;

/// Errors surfaced by a counter backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("pending count for {0} would drop below zero")]
    Negative(String),
    #[error("counter backend unavailable: {0}")]
    Unavailable(String),
}

/// Maps a routing key to its number of in-flight requests.
#[async_trait]
pub trait QueueCounter: Send + Sync {
    async fn increase(&self, key: &str, delta: i64) -> Result<(), QueueError>;

    async fn decrease(&self, key: &str, delta: i64) -> Result<(), QueueError>;

    /// Current value for a key, `None` if the key is unknown.
    async fn current_for_host(&self, key: &str) -> Option<i64>;

    /// Snapshot of every key.
    async fn current(&self) -> HashMap<String, i64>;
}
