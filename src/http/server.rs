//! HTTP server setup.
//!
//! # Responsibilities
//! - Assemble the middleware chain around the forwarding handler
//! - Record the peer address for `X-Forwarded-For`
//! - Bind to a listener and drain on shutdown
//!
//! # Design Decisions
//! - Every path falls through to one handler; routing happens in middleware,
//!   not in the axum router
//! - Collaborators arrive as trait objects so tests can swap them

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::middleware::from_fn_with_state;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::InterceptorConfig;
use crate::health::Probe;
use crate::http::middleware::{
    counting_middleware, metrics_middleware, routing_middleware, CountingState, RoutingState,
};
use crate::http::request::{request_id, MakeRequestUuid, REQUEST_ID_HEADER};
use crate::lifecycle::Shutdown;
use crate::observability::Collectors;
use crate::placeholder::{ConfigSource, PlaceholderHandler};
use crate::proxy::{forward, TlsSetupError, Upstream};
use crate::queue::QueueCounter;
use crate::readiness::ReadinessSource;
use crate::routing::matcher::request_host;
use crate::routing::RoutingTable;

/// External collaborators of the proxy pipeline.
#[derive(Clone)]
pub struct Dependencies {
    pub table: Arc<dyn RoutingTable>,
    pub queue: Arc<dyn QueueCounter>,
    pub readiness: Arc<dyn ReadinessSource>,
    pub config_source: Arc<dyn ConfigSource>,
    pub collectors: Collectors,
    pub probe: Arc<Probe>,
    pub shutdown: Shutdown,
}

/// The proxy listener.
pub struct InterceptorServer {
    router: Router,
    shutdown: Shutdown,
}

impl InterceptorServer {
    pub fn new(config: &InterceptorConfig, deps: Dependencies) -> Result<Self, TlsSetupError> {
        let shutdown = deps.shutdown.clone();
        Ok(Self {
            router: Self::build_router(config, deps)?,
            shutdown,
        })
    }

    /// request-id → trace → metrics → routing → counting → upstream
    fn build_router(config: &InterceptorConfig, deps: Dependencies) -> Result<Router, TlsSetupError> {
        let placeholder = Arc::new(PlaceholderHandler::new(deps.config_source));
        let upstream = Upstream::new(config, deps.readiness, placeholder)?;

        let counting = CountingState {
            queue: deps.queue,
            collectors: deps.collectors.clone(),
            shutdown: deps.shutdown,
        };
        let routing = RoutingState {
            table: deps.table,
            probe: deps.probe,
            tls: config.upstream.tls,
        };

        let router = Router::new()
            .fallback(forward)
            .with_state(upstream)
            .layer(from_fn_with_state(counting, counting_middleware))
            .layer(from_fn_with_state(routing, routing_middleware))
            .layer(from_fn_with_state(deps.collectors, metrics_middleware))
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %req.method(),
                    uri = %req.uri(),
                    host = %request_host(req).unwrap_or_default(),
                    request_id = %request_id(req.headers()),
                )
            }))
            .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
            .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid));
        Ok(router)
    }

    /// The assembled router, for driving the pipeline without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until shutdown is triggered, then drain open connections.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Proxy server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(Shutdown::triggered(self.shutdown.subscribe()))
            .await?;

        tracing::info!("Proxy server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TargetConfig;
    use crate::placeholder::MemoryConfigSource;
    use crate::queue::MemoryQueue;
    use crate::readiness::ReadinessTracker;
    use crate::routing::StaticRoutingTable;
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    fn server() -> InterceptorServer {
        let target = TargetConfig {
            name: "app".into(),
            namespace: "ns".into(),
            hosts: vec!["app.example.com".into()],
            service: "app".into(),
            port: 80,
            ..Default::default()
        };
        let config = InterceptorConfig {
            routes: vec![target.clone()],
            ..Default::default()
        };
        let deps = Dependencies {
            table: Arc::new(StaticRoutingTable::from_targets(vec![target])),
            queue: Arc::new(MemoryQueue::new()),
            readiness: Arc::new(ReadinessTracker::new()),
            config_source: Arc::new(MemoryConfigSource::new()),
            collectors: Collectors::default(),
            probe: Arc::new(Probe::new(Vec::new())),
            shutdown: Shutdown::new(),
        };
        InterceptorServer::new(&config, deps).unwrap()
    }

    #[tokio::test]
    async fn unrouted_request_gets_404_with_request_id() {
        let response = server()
            .router()
            .oneshot(
                Request::get("/")
                    .header("host", "other.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key(&REQUEST_ID_HEADER));
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Not Found");
    }

    #[tokio::test]
    async fn health_checker_reports_readiness() {
        let response = server()
            .router()
            .oneshot(
                Request::get("/healthz")
                    .header("host", "other.example.com")
                    .header("user-agent", "kube-probe/1.30")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
