//! Route matching logic.
//!
//! # Responsibilities
//! - Match host header (exact or wildcard, case-insensitive, port ignored)
//! - Match path prefix on segment boundaries (case-sensitive)
//! - Match required header values
//!
//! # Design Decisions
//! - Each matcher reports a specificity so the table can pick the best route
//! - No regex in the hot path

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request};

/// Trait for matching requests against conditions.
///
/// `specificity` returns `None` when the request does not match, or a rank
/// where larger means more specific.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    fn specificity(&self, req: &Request<Body>) -> Option<usize>;

    fn matches(&self, req: &Request<Body>) -> bool {
        self.specificity(req).is_some()
    }
}

/// Extract the request host without port, lowercased.
///
/// Falls back to the URI authority for HTTP/2 requests without a Host header.
pub fn request_host(req: &Request<Body>) -> Option<String> {
    let raw = req
        .headers()
        .get(axum::http::header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| req.uri().host())?;
    Some(strip_port(raw).to_ascii_lowercase())
}

fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        // [v6]:port
        return rest.split(']').next().unwrap_or(rest);
    }
    match host.rsplit_once(':') {
        Some((h, port)) if port.chars().all(|c| c.is_ascii_digit()) => h,
        _ => host,
    }
}

/// Matches the Host header.
#[derive(Debug, Clone)]
pub enum HostMatcher {
    /// `example.com`
    Exact(String),
    /// `*.example.com`, stored as `.example.com`
    Wildcard(String),
    /// `*`
    Any,
}

impl HostMatcher {
    /// Create a new host matcher from a configured pattern.
    pub fn new(pattern: &str) -> Self {
        let pattern = pattern.trim().to_ascii_lowercase();
        if pattern == "*" {
            HostMatcher::Any
        } else if let Some(suffix) = pattern.strip_prefix('*') {
            HostMatcher::Wildcard(suffix.to_string())
        } else {
            HostMatcher::Exact(strip_port(&pattern).to_string())
        }
    }

    /// Rank against an already extracted host.
    pub fn rank(&self, host: &str) -> Option<usize> {
        match self {
            HostMatcher::Exact(expected) => (expected == host).then_some(3),
            HostMatcher::Wildcard(suffix) => {
                (host.len() > suffix.len() && host.ends_with(suffix.as_str())).then_some(2)
            }
            HostMatcher::Any => Some(1),
        }
    }
}

impl Matcher for HostMatcher {
    fn specificity(&self, req: &Request<Body>) -> Option<usize> {
        match request_host(req) {
            Some(host) => self.rank(&host),
            None => matches!(self, HostMatcher::Any).then_some(1),
        }
    }
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        if !prefix.starts_with('/') {
            prefix.insert(0, '/');
        }
        Self { prefix }
    }
}

impl Matcher for PathPrefixMatcher {
    fn specificity(&self, req: &Request<Body>) -> Option<usize> {
        let path = req.uri().path();
        let rest = path.strip_prefix(self.prefix.as_str())?;
        // "/api" matches "/api" and "/api/x" but not "/apix"
        let boundary = self.prefix.ends_with('/') || rest.is_empty() || rest.starts_with('/');
        boundary.then_some(self.prefix.len())
    }
}

/// Requires a header to carry an exact value.
#[derive(Debug, Clone)]
pub struct HeaderMatcher {
    name: HeaderName,
    value: HeaderValue,
}

impl HeaderMatcher {
    /// Returns `None` for names or values that are not valid HTTP.
    pub fn new(name: &str, value: &str) -> Option<Self> {
        Some(Self {
            name: HeaderName::try_from(name).ok()?,
            value: HeaderValue::try_from(value).ok()?,
        })
    }
}

impl Matcher for HeaderMatcher {
    fn specificity(&self, req: &Request<Body>) -> Option<usize> {
        req.headers()
            .get_all(&self.name)
            .iter()
            .any(|v| v == self.value)
            .then_some(1)
    }
}
