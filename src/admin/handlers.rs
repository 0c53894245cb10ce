use std::collections::HashMap;

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use crate::admin::AdminState;
use crate::routing::Target;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub healthy: bool,
    pub routes: usize,
}

#[derive(Serialize)]
pub struct RoutingEntry {
    pub routing_key: String,
    pub target: Target,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        healthy: state.probe.is_healthy(),
        routes: state.table.targets().len(),
    })
}

/// Pending request counts keyed by routing key.
pub async fn get_queue(State(state): State<AdminState>) -> Json<HashMap<String, i64>> {
    Json(state.queue.current().await)
}

pub async fn get_routing_table(State(state): State<AdminState>) -> Json<Vec<RoutingEntry>> {
    let entries = state
        .table
        .targets()
        .iter()
        .map(|t| RoutingEntry {
            routing_key: t.routing_key(),
            target: t.as_ref().clone(),
        })
        .collect();
    Json(entries)
}

pub async fn get_probe(State(state): State<AdminState>) -> Response {
    state.probe.response()
}
