//! Routing middleware.
//!
//! Resolves the target for every request and attaches a [`RequestContext`].
//! Requests with no target go to the probe when they come from a platform
//! health checker, and get a 404 otherwise.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::health::{is_probe_user_agent, Probe};
use crate::http::request::RequestContext;
use crate::http::response::Static;
use crate::routing::RoutingTable;

#[derive(Clone)]
pub struct RoutingState {
    pub table: Arc<dyn RoutingTable>,
    pub probe: Arc<Probe>,
    pub tls: bool,
}

pub async fn routing_middleware(State(state): State<RoutingState>, mut req: Request<Body>, next: Next) -> Response {
    let Some(target) = state.table.route(&req) else {
        let user_agent = req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if is_probe_user_agent(user_agent) {
            return state.probe.response();
        }
        return Static::not_found().into_response();
    };

    match RequestContext::resolve(target, state.tls) {
        Ok(ctx) => {
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        Err(e) => Static::internal(e).into_response(),
    }
}
