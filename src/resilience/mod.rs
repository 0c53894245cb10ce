//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → dialer.rs (connect, retry on failure with backoff.rs schedule)
//!     → timeouts.rs (connect per attempt, response headers per request)
//!     → On exhaustion: ForwardError → 502
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Only dials are retried; a request reaching the backend is never resent
//! - Jittered backoff prevents a thundering herd on a waking workload

pub mod backoff;
pub mod dialer;
pub mod timeouts;

pub use backoff::Backoff;
pub use dialer::{DialError, RetryingConnector};
pub use timeouts::Timeouts;
