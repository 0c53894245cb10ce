//! Forwarding handler.
//!
//! # Responsibilities
//! - Read the routing outcome from the request context (500 if absent)
//! - Detect cold starts and serve the placeholder, wait, or fail over
//! - Rewrite the request for the upstream and forward it once
//! - Stream the response back, tunnelling upgraded connections
//!
//! # Design Decisions
//! - No retries above the dialer; every failure is a single 502
//! - The response is never written before the upstream head arrives, so a
//!   502 never follows a partial response

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Extensions, HeaderName, HeaderValue, Request, StatusCode, Version};
use axum::response::{IntoResponse, Response};
use tracing::Instrument;
use url::Url;

use crate::config::{InterceptorConfig, TracingConfig};
use crate::http::middleware::counting::InFlight;
use crate::http::request::{peer_ip, request_id, RequestContext};
use crate::http::response::Static;
use crate::observability::propagation::propagate;
use crate::placeholder::PlaceholderHandler;
use crate::proxy::buffer_pool::BufferPool;
use crate::proxy::forwarded::{append_forwarded_for, is_upgrade_request, origin_form, stream_authority, strip_hop_by_hop};
use crate::proxy::transport::{ResilientTransport, TlsSetupError};
use crate::proxy::tunnel;
use crate::readiness::{wait_for_ready, ReadinessSource};
use crate::resilience::{Backoff, Timeouts};

pub const COLD_START_HEADER: HeaderName = HeaderName::from_static("x-keda-http-cold-start");

/// Everything the forwarding handler needs, cloned per request.
#[derive(Clone)]
pub struct Upstream {
    transport: ResilientTransport,
    readiness: Arc<dyn ReadinessSource>,
    placeholder: Arc<PlaceholderHandler>,
    tracing: TracingConfig,
    timeouts: Timeouts,
    buffers: BufferPool,
}

impl Upstream {
    pub fn new(
        config: &InterceptorConfig,
        readiness: Arc<dyn ReadinessSource>,
        placeholder: Arc<PlaceholderHandler>,
    ) -> Result<Self, TlsSetupError> {
        let timeouts = Timeouts::from(&config.timeouts);
        let backoff = Backoff::from_config(timeouts.connect, &config.dial_backoff);

        Ok(Self {
            transport: ResilientTransport::new(&timeouts, backoff)?,
            readiness,
            placeholder,
            tracing: config.tracing.clone(),
            timeouts,
            buffers: BufferPool::new(),
        })
    }

    pub async fn handle(&self, mut req: Request<Body>) -> Response {
        let Some(ctx) = req.extensions_mut().remove::<RequestContext>() else {
            return Static::internal("no stream resolved for request").into_response();
        };

        let span = tracing::info_span!(
            "upstream",
            routing_key = %ctx.routing_key,
            stream = %ctx.stream,
            cold_start = tracing::field::Empty,
            trace_id = tracing::field::Empty,
        );
        self.forward_routed(ctx, req).instrument(span).await
    }

    async fn forward_routed(&self, ctx: RequestContext, mut req: Request<Body>) -> Response {
        let cold = self.readiness.ready_replicas(&ctx.routing_key) == Some(0);
        tracing::Span::current().record("cold_start", cold);

        let mut stream: &Url = &ctx.stream;
        if cold {
            if ctx.target.placeholder.as_ref().is_some_and(|p| p.enabled) {
                tracing::info!("Workload has no ready replicas, serving placeholder");
                let request_id = request_id(req.headers()).to_string();
                return self.placeholder.serve(&ctx.target, &request_id).await;
            }

            let wait = ctx
                .target
                .failover
                .as_ref()
                .map(|f| f.timeout())
                .unwrap_or(self.timeouts.workload_replicas);
            tracing::info!(wait = ?wait, "Workload has no ready replicas, waiting");

            let started = Instant::now();
            match wait_for_ready(self.readiness.as_ref(), &ctx.routing_key, wait).await {
                Ok(()) => tracing::debug!(elapsed = ?started.elapsed(), "Workload ready"),
                Err(e) => match &ctx.failover {
                    Some(failover) => {
                        tracing::warn!(error = %e, failover = %failover, "Workload still cold, using failover stream");
                        stream = failover;
                    }
                    None => return Static::bad_gateway(e).into_response(),
                },
            }
        }

        let peer = peer_ip(&req);
        let upgrade = is_upgrade_request(req.headers());
        let client_upgrade = upgrade.then(|| hyper::upgrade::on(&mut req));
        let in_flight = req.extensions_mut().remove::<Arc<InFlight>>();
        *req.extensions_mut() = Extensions::new();

        let authority = req.uri().authority().map(|a| a.to_string());
        let uri = origin_form(req.uri());
        *req.uri_mut() = uri;
        *req.version_mut() = Version::HTTP_11;

        let headers = req.headers_mut();
        strip_hop_by_hop(headers, upgrade);
        if let Some(peer) = peer {
            append_forwarded_for(headers, peer);
        }
        if !headers.contains_key(header::HOST) {
            let host = authority
                .or_else(|| stream_authority(stream))
                .and_then(|h| HeaderValue::from_str(&h).ok());
            if let Some(host) = host {
                headers.insert(header::HOST, host);
            }
        }
        if self.tracing.enabled {
            let sent = propagate(headers, self.tracing.propagator);
            tracing::Span::current().record("trace_id", sent.trace_id.as_str());
        }

        let started = Instant::now();
        let mut response = match self.transport.round_trip(stream, req).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(elapsed = ?started.elapsed(), error = %e, "Forwarding failed");
                return Static::bad_gateway(e).into_response();
            }
        };

        let switching = response.status() == StatusCode::SWITCHING_PROTOCOLS;
        if switching {
            match client_upgrade {
                Some(client) => {
                    let upstream = hyper::upgrade::on(&mut response);
                    tunnel::spawn(client, upstream, self.buffers.clone(), ctx.routing_key.clone(), in_flight);
                }
                None => tracing::warn!("Upstream switched protocols without an upgrade request"),
            }
        }

        let headers = response.headers_mut();
        strip_hop_by_hop(headers, switching);
        headers.insert(COLD_START_HEADER, HeaderValue::from_static(if cold { "true" } else { "false" }));

        tracing::debug!(status = response.status().as_u16(), elapsed = ?started.elapsed(), "Forwarded");
        response.map(Body::new)
    }
}

/// Axum fallback handler forwarding every routed request.
pub async fn forward(State(upstream): State<Upstream>, req: Request<Body>) -> Response {
    upstream.handle(req).await
}
