//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer (probe.rs)
//!     → run every registered check in order (check.rs)
//!     → store healthy/unhealthy in one atomic
//!
//! kube-probe / load-balancer health checker request
//!     → Routing middleware finds no target
//!     → Probe::response (200 OK or 503 Service Unavailable)
//! ```
//!
//! # Design Decisions
//! - Health describes the interceptor itself, not its backends
//! - One loop per process; shutdown is its only exit

pub mod check;
pub mod probe;

pub use check::{FnCheck, HealthCheck, HealthCheckError, RoutingTableSynced};
pub use probe::{probe_handler, Probe};

/// User-agent prefixes sent by platform health checkers.
const PROBE_USER_AGENTS: &[&str] = &["kube-probe/", "GoogleHC/"];

/// True when the user agent belongs to a known health-check prober.
pub fn is_probe_user_agent(user_agent: &str) -> bool {
    PROBE_USER_AGENTS.iter().any(|p| user_agent.starts_with(p))
}
