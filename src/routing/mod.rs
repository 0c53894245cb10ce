//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path, headers)
//!     → table.rs (route lookup over an atomic snapshot)
//!     → matcher.rs (evaluate match conditions, rank specificity)
//!     → Return: matched Target or None
//!
//! Matched Target
//!     → target.rs (routing key, primary and failover streams)
//! ```
//!
//! # Design Decisions
//! - The table is a trait so the pipeline runs without a cluster
//! - Routes are recompiled on reload and swapped whole
//! - Deterministic: same input always matches same target

pub mod matcher;
pub mod table;
pub mod target;

pub use table::{RoutingTable, StaticRoutingTable};
pub use target::{build_stream, StreamError, Target};
