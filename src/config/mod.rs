//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → InterceptorConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → routing targets swapped atomically
//! ```
//!
//! Timeouts and the backoff schedule are read once at startup; only routing
//! targets follow reloads.

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    DialBackoffConfig, FailoverConfig, InterceptorConfig, ListenerConfig, ObservabilityConfig,
    PlaceholderConfig, ProbeConfig, PropagatorKind, ScalingConfig, TargetConfig, TimeoutConfig,
    TracingConfig, UpstreamConfig,
};
