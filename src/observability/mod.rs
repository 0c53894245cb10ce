//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, pretty or JSON)
//!     → metrics.rs (request counts, pending-request gauges)
//!     → propagation.rs (trace headers on forwarded requests)
//!
//! Consumers:
//!     → stdout log collection
//!     → Prometheus scrape of the exporter listener
//!     → downstream tracers reading traceparent / B3 headers
//! ```
//!
//! # Design Decisions
//! - Request ID flows through all subsystems
//! - Metrics are cheap (facade macros, no-ops without an exporter)
//! - Trace propagation is off unless enabled in config

pub mod logging;
pub mod metrics;
pub mod propagation;

pub use logging::init_logging;
pub use metrics::{init_metrics, Collector, Collectors, PrometheusCollector};
pub use propagation::{propagate, TraceContext};
