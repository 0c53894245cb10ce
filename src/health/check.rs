//! Health check functions run by the probe loop.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::routing::RoutingTable;

/// A failed health check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("health check {name} failed: {reason}")]
pub struct HealthCheckError {
    pub name: String,
    pub reason: String,
}

impl HealthCheckError {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// A single health check.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self) -> Result<(), HealthCheckError>;
}

/// Adapts an async closure into a [`HealthCheck`].
pub struct FnCheck<F> {
    name: String,
    f: F,
}

impl<F> FnCheck<F> {
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

#[async_trait]
impl<F, Fut> HealthCheck for FnCheck<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HealthCheckError>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> Result<(), HealthCheckError> {
        (self.f)().await
    }
}

/// Healthy once the routing table has received its first targets.
pub struct RoutingTableSynced {
    table: Arc<dyn RoutingTable>,
}

impl RoutingTableSynced {
    pub fn new(table: Arc<dyn RoutingTable>) -> Self {
        Self { table }
    }
}

#[async_trait]
impl HealthCheck for RoutingTableSynced {
    fn name(&self) -> &str {
        "routing-table-synced"
    }

    async fn check(&self) -> Result<(), HealthCheckError> {
        if self.table.has_synced() {
            Ok(())
        } else {
            Err(HealthCheckError::new(self.name(), "routing table has not synced"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::StaticRoutingTable;

    #[tokio::test]
    async fn fn_check_runs_closure() {
        let check = FnCheck::new("always", || async { Ok(()) });
        assert_eq!(check.name(), "always");
        assert!(check.check().await.is_ok());
    }

    #[tokio::test]
    async fn routing_table_check_follows_sync_state() {
        let table = Arc::new(StaticRoutingTable::new());
        let check = RoutingTableSynced::new(table.clone());
        assert!(check.check().await.is_err());

        table.replace(Vec::new());
        assert!(check.check().await.is_ok());
    }
}
