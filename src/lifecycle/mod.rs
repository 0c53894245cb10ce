//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → servers stop accepting, probe loop exits,
//!     counting coordination tasks release their decrements
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!
//! Per-request cleanup (signaler.rs):
//!     Response done → one-shot signal → deferred decrement
//! ```

pub mod shutdown;
pub mod signaler;
pub mod signals;

pub use shutdown::Shutdown;
pub use signaler::{SignalError, SignalWaiter, Signaler};
