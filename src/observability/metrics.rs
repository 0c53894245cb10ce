//! Metrics collection and exposition.
//!
//! # Metrics
//! - `interceptor_request_count_total` (counter): requests by method, path,
//!   status code and host
//! - `interceptor_pending_request_count` (gauge): in-flight requests per
//!   routing key
//!
//! # Design Decisions
//! - Components record through a `Collectors` registry handed to them at
//!   construction; there is no global collector list
//! - The Prometheus exporter is optional; without it the `metrics` macros
//!   are no-ops

use std::net::SocketAddr;
use std::sync::Arc;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Sink for interceptor metrics.
pub trait Collector: Send + Sync {
    fn record_request_count(&self, method: &str, path: &str, status: u16, host: &str);

    fn record_pending_request_count(&self, host: &str, value: i64);
}

/// Fan-out over every registered collector.
#[derive(Clone, Default)]
pub struct Collectors {
    inner: Arc<Vec<Arc<dyn Collector>>>,
}

impl Collectors {
    pub fn new(collectors: Vec<Arc<dyn Collector>>) -> Self {
        Self {
            inner: Arc::new(collectors),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn record_request_count(&self, method: &str, path: &str, status: u16, host: &str) {
        for collector in self.inner.iter() {
            collector.record_request_count(method, path, status, host);
        }
    }

    pub fn record_pending_request_count(&self, host: &str, value: i64) {
        for collector in self.inner.iter() {
            collector.record_pending_request_count(host, value);
        }
    }
}

impl std::fmt::Debug for Collectors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collectors").field("len", &self.len()).finish()
    }
}

/// Records through the `metrics` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusCollector;

impl Collector for PrometheusCollector {
    fn record_request_count(&self, method: &str, path: &str, status: u16, host: &str) {
        metrics::counter!(
            "interceptor_request_count_total",
            "method" => method.to_string(),
            "path" => path.to_string(),
            "code" => status.to_string(),
            "host" => host.to_string()
        )
        .increment(1);
    }

    fn record_pending_request_count(&self, host: &str, value: i64) {
        metrics::gauge!("interceptor_pending_request_count", "host" => host.to_string()).set(value as f64);
    }
}

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}
