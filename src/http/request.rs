//! Per-request state carried through the middleware chain.
//!
//! # Responsibilities
//! - Hold the matched target and the streams derived from it
//! - Expose the peer address and request id to inner layers
//!
//! # Design Decisions
//! - State travels as a typed request extension, inserted by the Routing
//!   middleware and read by Counting and Upstream; no ambient lookups
//! - Streams are built per request and dropped with it

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use url::Url;

use crate::routing::{StreamError, Target};

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Routing outcome for one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub target: Arc<Target>,
    pub routing_key: String,
    pub stream: Url,
    pub failover: Option<Url>,
}

impl RequestContext {
    /// Resolve both streams for a matched target.
    pub fn resolve(target: Arc<Target>, tls: bool) -> Result<Self, StreamError> {
        let stream = target.stream(tls)?;
        let failover = target.failover_stream(tls).transpose()?;
        Ok(Self {
            routing_key: target.routing_key(),
            target,
            stream,
            failover,
        })
    }
}

/// Address of the connected client, when the server recorded it.
pub fn peer_ip(req: &Request<Body>) -> Option<IpAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

/// The request id set by the request-id layer.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Generates a UUID v4 for requests arriving without an `x-request-id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&uuid::Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}
