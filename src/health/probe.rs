//! Interceptor health state machine.
//!
//! # States
//! - Healthy: every check passed on the last cycle
//! - Unhealthy: some check failed, or no cycle has completed yet
//!
//! # State Transitions
//! ```text
//! Unhealthy → Healthy: a full cycle with every check passing
//! Healthy → Unhealthy: the first failing check (remaining checks skipped)
//! ```
//!
//! The state is a single atomic written only by the check loop; handlers read
//! it without locking and never wait on the loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tokio::sync::broadcast;
use tokio::time;

use crate::health::check::HealthCheck;

pub struct Probe {
    healthy: AtomicBool,
    checks: Vec<Arc<dyn HealthCheck>>,
}

impl Probe {
    /// Starts unhealthy until the first cycle completes.
    pub fn new(checks: Vec<Arc<dyn HealthCheck>>) -> Self {
        Self {
            healthy: AtomicBool::new(false),
            checks,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    /// 200 when healthy, 503 otherwise.
    pub fn status(&self) -> StatusCode {
        if self.is_healthy() {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }

    /// Run every check once, in order, and store the outcome.
    pub async fn check_once(&self) -> bool {
        let mut healthy = true;
        for check in &self.checks {
            if let Err(e) = check.check().await {
                tracing::warn!(check = check.name(), error = %e, "Health check failed");
                healthy = false;
                break;
            }
        }

        let previous = self.healthy.swap(healthy, Ordering::AcqRel);
        if previous != healthy {
            tracing::info!(healthy, "Interceptor health changed");
        }
        healthy
    }

    /// Run checks on a fixed interval until shutdown.
    pub async fn run(self: Arc<Self>, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval = ?interval, checks = self.checks.len(), "Health probe starting");

        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_once().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health probe received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Plain-text response reflecting the current state.
    pub fn response(&self) -> Response {
        let status = self.status();
        (status, status.canonical_reason().unwrap_or_default()).into_response()
    }
}

/// Axum handler serving the probe state.
pub async fn probe_handler(State(probe): State<Arc<Probe>>) -> Response {
    probe.response()
}
