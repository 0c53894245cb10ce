//! Interceptor middleware chain.
//!
//! # Data Flow
//! ```text
//! request-id → trace (logging) → metrics.rs → routing.rs → counting.rs → upstream
//! ```

pub mod counting;
pub mod metrics;
pub mod routing;

pub use counting::{counting_middleware, CountingState, InFlight};
pub use metrics::metrics_middleware;
pub use routing::{routing_middleware, RoutingState};
