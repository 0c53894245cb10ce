//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the interceptor.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the interceptor.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct InterceptorConfig {
    /// Listener configuration (proxy and admin bind addresses).
    pub listener: ListenerConfig,

    /// Dial and wait timeouts.
    pub timeouts: TimeoutConfig,

    /// Backoff schedule for upstream dial retries.
    pub dial_backoff: DialBackoffConfig,

    /// Upstream connection settings.
    pub upstream: UpstreamConfig,

    /// Trace context propagation.
    pub tracing: TracingConfig,

    /// Health probe loop settings.
    pub probe: ProbeConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Statically configured routing targets.
    pub routes: Vec<TargetConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Proxy bind address (e.g., "0.0.0.0:8080").
    pub proxy_address: String,

    /// Admin bind address serving queue counts and probes.
    pub admin_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            proxy_address: "0.0.0.0:8080".to_string(),
            admin_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Timeout configuration for upstream operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Per-attempt TCP connect timeout in milliseconds.
    pub connect_ms: u64,

    /// TCP keep-alive interval in milliseconds.
    pub keep_alive_ms: u64,

    /// Time allowed between sending the request and receiving response headers.
    pub response_header_ms: u64,

    /// How long a cold request waits for the workload to report ready replicas.
    pub workload_replicas_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 500,
            keep_alive_ms: 1_000,
            response_header_ms: 500,
            workload_replicas_ms: 20_000,
        }
    }
}

/// Dial retry schedule. The first delay equals the connect timeout.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DialBackoffConfig {
    /// Multiplier applied to the delay after every failed attempt.
    pub factor: f64,

    /// Fraction of each delay added as random jitter (0.0 - 1.0).
    pub jitter: f64,

    /// Total number of dial attempts.
    pub steps: u32,

    /// Upper bound for a single delay in milliseconds (0 = uncapped).
    pub max_delay_ms: u64,
}

impl Default for DialBackoffConfig {
    fn default() -> Self {
        Self {
            factor: 1.5,
            jitter: 0.1,
            steps: 5,
            max_delay_ms: 0,
        }
    }
}

/// Upstream connection settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Build `https://` streams instead of `http://`.
    pub tls: bool,
}

/// Trace context propagation settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TracingConfig {
    /// Enable extraction and injection of trace headers.
    pub enabled: bool,

    /// Header format emitted on forwarded requests.
    pub propagator: PropagatorKind,
}

/// Outbound trace header format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PropagatorKind {
    /// W3C `traceparent`.
    #[default]
    TraceContext,
    /// B3 multi-header (`X-B3-*`).
    B3,
}

/// Health probe loop settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Interval between health check cycles in milliseconds.
    pub interval_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self { interval_ms: 1_000 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json: bool,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Prometheus exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:2223".to_string(),
        }
    }
}

/// A scaled workload and the requests routed to it.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TargetConfig {
    /// Name of the owning scaled resource.
    pub name: String,

    /// Namespace of the owning scaled resource.
    pub namespace: String,

    /// Generation of the owning resource; bumps invalidate cached templates.
    pub generation: i64,

    /// Hosts served by this target. `*` matches any host, `*.example.com` any subdomain.
    pub hosts: Vec<String>,

    /// Path prefixes served by this target (empty = all paths).
    pub path_prefixes: Vec<String>,

    /// Headers that must be present with the given values.
    pub headers: HashMap<String, String>,

    /// Backing service name.
    pub service: String,

    /// Backing service port.
    pub port: u16,

    /// Workload (deployment) being scaled.
    pub workload: String,

    /// Scaling bounds consumed by the external scaler.
    pub scaling: ScalingConfig,

    /// Optional failover service used when the workload stays cold.
    pub failover: Option<FailoverConfig>,

    /// Optional cold-start placeholder page.
    pub placeholder: Option<PlaceholderConfig>,
}

/// Scaling bounds for a target.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScalingConfig {
    pub min_replicas: u32,
    pub max_replicas: u32,
    /// Pending requests per replica the scaler aims for.
    pub target_pending_requests: u32,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            min_replicas: 0,
            max_replicas: 100,
            target_pending_requests: 100,
        }
    }
}

/// Failover service for cold workloads.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FailoverConfig {
    pub service: String,
    pub port: u16,
    /// How long to wait for the primary workload before failing over.
    #[serde(default = "default_failover_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_failover_timeout_ms() -> u64 {
    30_000
}

impl FailoverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Placeholder page served while a workload has no ready replicas.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlaceholderConfig {
    /// Serve the placeholder at all.
    pub enabled: bool,

    /// Response status code.
    pub status_code: u16,

    /// Page refresh interval in seconds.
    pub refresh_interval_secs: u32,

    /// Extra response headers.
    pub headers: HashMap<String, String>,

    /// Inline template content.
    pub content: Option<String>,

    /// Name of a config map holding the template.
    pub content_config_map: Option<String>,

    /// Key inside the config map.
    pub content_config_map_key: Option<String>,
}

pub const DEFAULT_PLACEHOLDER_KEY: &str = "template.html";

impl Default for PlaceholderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            status_code: 503,
            refresh_interval_secs: 5,
            headers: HashMap::new(),
            content: None,
            content_config_map: None,
            content_config_map_key: None,
        }
    }
}

impl PlaceholderConfig {
    /// Config map key, falling back to the default key.
    pub fn config_map_key(&self) -> &str {
        self.content_config_map_key
            .as_deref()
            .unwrap_or(DEFAULT_PLACEHOLDER_KEY)
    }
}
