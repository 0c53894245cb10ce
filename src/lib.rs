//! HTTP interceptor for scale-to-zero workloads.
//!
//! Sits in front of every scaled service, counts in-flight requests per
//! workload for an external scaler, and holds or redirects traffic while a
//! workload wakes from zero replicas.

pub mod admin;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod placeholder;
pub mod proxy;
pub mod queue;
pub mod readiness;
pub mod resilience;
pub mod routing;

pub use config::schema::InterceptorConfig;
pub use http::{Dependencies, InterceptorServer};
pub use lifecycle::Shutdown;
