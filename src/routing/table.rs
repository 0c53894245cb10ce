//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up the most specific target for a request
//! - Swap the whole route set atomically on reload
//!
//! # Design Decisions
//! - Readers load an `ArcSwap` snapshot, never a lock
//! - Most specific wins: host rank, then path prefix length, then header count
//! - Ties keep configuration order

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::Request;

use crate::routing::matcher::{request_host, HeaderMatcher, HostMatcher, Matcher, PathPrefixMatcher};
use crate::routing::target::Target;

/// Maps an inbound request to the target serving it.
pub trait RoutingTable: Send + Sync {
    /// Resolve the target for a request, if any.
    fn route(&self, req: &Request<Body>) -> Option<Arc<Target>>;

    /// True once the table has received its first set of targets.
    fn has_synced(&self) -> bool;

    /// Snapshot of every known target.
    fn targets(&self) -> Vec<Arc<Target>>;
}

#[derive(Debug)]
struct CompiledRoute {
    target: Arc<Target>,
    hosts: Vec<HostMatcher>,
    paths: Vec<PathPrefixMatcher>,
    headers: Vec<HeaderMatcher>,
}

impl CompiledRoute {
    fn compile(target: Target) -> Self {
        let hosts = target.hosts.iter().map(|h| HostMatcher::new(h)).collect();
        let paths = target.path_prefixes.iter().map(PathPrefixMatcher::new).collect();
        let headers = target
            .headers
            .iter()
            .filter_map(|(name, value)| {
                let matcher = HeaderMatcher::new(name, value);
                if matcher.is_none() {
                    tracing::warn!(routing_key = %target.routing_key(), header = %name, "Ignoring invalid header match");
                }
                matcher
            })
            .collect();

        Self {
            target: Arc::new(target),
            hosts,
            paths,
            headers,
        }
    }

    fn score(&self, host: Option<&str>, req: &Request<Body>) -> Option<(usize, usize, usize)> {
        let host_rank = self
            .hosts
            .iter()
            .filter_map(|m| match host {
                Some(h) => m.rank(h),
                None => matches!(m, HostMatcher::Any).then_some(1),
            })
            .max()?;

        let path_rank = if self.paths.is_empty() {
            0
        } else {
            self.paths.iter().filter_map(|m| m.specificity(req)).max()?
        };

        if !self.headers.iter().all(|m| m.matches(req)) {
            return None;
        }

        Some((host_rank, path_rank, self.headers.len()))
    }
}

/// In-memory routing table fed from configuration.
#[derive(Debug)]
pub struct StaticRoutingTable {
    routes: ArcSwap<Vec<CompiledRoute>>,
    synced: AtomicBool,
}

impl StaticRoutingTable {
    /// An empty table that reports itself as not yet synced.
    pub fn new() -> Self {
        Self {
            routes: ArcSwap::from_pointee(Vec::new()),
            synced: AtomicBool::new(false),
        }
    }

    /// A synced table holding the given targets.
    pub fn from_targets(targets: Vec<Target>) -> Self {
        let table = Self::new();
        table.replace(targets);
        table
    }

    /// Atomically replace every route.
    pub fn replace(&self, targets: Vec<Target>) {
        let compiled: Vec<_> = targets.into_iter().map(CompiledRoute::compile).collect();
        tracing::info!(routes = compiled.len(), "Routing table updated");
        self.routes.store(Arc::new(compiled));
        self.synced.store(true, Ordering::Release);
    }
}

impl Default for StaticRoutingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RoutingTable for StaticRoutingTable {
    fn route(&self, req: &Request<Body>) -> Option<Arc<Target>> {
        let routes = self.routes.load();
        let host = request_host(req);

        let mut best: Option<(&CompiledRoute, (usize, usize, usize))> = None;
        for route in routes.iter() {
            if let Some(score) = route.score(host.as_deref(), req) {
                if best.map_or(true, |(_, b)| score > b) {
                    best = Some((route, score));
                }
            }
        }
        best.map(|(route, _)| route.target.clone())
    }

    fn has_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }

    fn targets(&self) -> Vec<Arc<Target>> {
        self.routes.load().iter().map(|r| r.target.clone()).collect()
    }
}
