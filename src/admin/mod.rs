//! Admin surface for the external scaler and operators.
//!
//! # Endpoints
//! - `GET /queue`: pending request counts per routing key
//! - `GET /routing_table`: every known target
//! - `GET /livez`, `GET /readyz`: interceptor health
//! - `GET /status`: version and summary
//!
//! Served on its own listener so it is never routed as proxy traffic.

pub mod handlers;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::health::Probe;
use crate::queue::QueueCounter;
use crate::routing::RoutingTable;

use self::handlers::*;

#[derive(Clone)]
pub struct AdminState {
    pub queue: Arc<dyn QueueCounter>,
    pub table: Arc<dyn RoutingTable>,
    pub probe: Arc<Probe>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/queue", get(get_queue))
        .route("/routing_table", get(get_routing_table))
        .route("/livez", get(get_probe))
        .route("/readyz", get(get_probe))
        .route("/status", get(get_status))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TargetConfig;
    use crate::queue::MemoryQueue;
    use crate::routing::StaticRoutingTable;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn state(queue: Arc<MemoryQueue>) -> AdminState {
        let table = StaticRoutingTable::from_targets(vec![TargetConfig {
            name: "app".into(),
            namespace: "ns".into(),
            hosts: vec!["app.example.com".into()],
            service: "app".into(),
            port: 80,
            ..Default::default()
        }]);
        AdminState {
            queue,
            table: Arc::new(table),
            probe: Arc::new(Probe::new(Vec::new())),
        }
    }

    async fn get_json(router: Router, path: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
    }

    #[tokio::test]
    async fn queue_reports_counts() {
        let queue = Arc::new(MemoryQueue::new());
        queue.increase("ns/app", 2).await.unwrap();

        let (status, body) = get_json(setup_admin_router(state(queue)), "/queue").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ns/app"], 2);
    }

    #[tokio::test]
    async fn routing_table_lists_targets() {
        let (_, body) = get_json(setup_admin_router(state(Arc::new(MemoryQueue::new()))), "/routing_table").await;
        assert_eq!(body[0]["routing_key"], "ns/app");
        assert_eq!(body[0]["target"]["port"], 80);
    }

    #[tokio::test]
    async fn probes_reflect_health() {
        let router = setup_admin_router(state(Arc::new(MemoryQueue::new())));
        let response = router
            .oneshot(Request::get("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
