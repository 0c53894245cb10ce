//! Distributed trace context propagation.
//!
//! # Responsibilities
//! - Extract trace context from W3C `traceparent` or B3 multi-headers
//! - Start a new span id for the forwarded hop
//! - Emit only the configured header format
//!
//! # Design Decisions
//! - Inbound trace headers are always removed before injection, so a B3
//!   request forwarded with W3C propagation carries no stale B3 headers
//! - A request without valid context starts a new sampled trace

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use rand::Rng;

use crate::config::PropagatorKind;

const TRACEPARENT: HeaderName = HeaderName::from_static("traceparent");
const TRACESTATE: HeaderName = HeaderName::from_static("tracestate");
const B3_TRACE_ID: HeaderName = HeaderName::from_static("x-b3-traceid");
const B3_SPAN_ID: HeaderName = HeaderName::from_static("x-b3-spanid");
const B3_PARENT_SPAN_ID: HeaderName = HeaderName::from_static("x-b3-parentspanid");
const B3_SAMPLED: HeaderName = HeaderName::from_static("x-b3-sampled");

/// Trace identity for one hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    /// 32 lowercase hex characters.
    pub trace_id: String,
    /// 16 lowercase hex characters.
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub sampled: bool,
}

fn is_hex(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_hexdigit()) && s.bytes().any(|b| b != b'0')
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

fn random_hex(bytes: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..bytes).map(|_| format!("{:02x}", rng.gen::<u8>())).collect()
}

impl TraceContext {
    /// Root context for a request that carried none.
    pub fn new_root() -> Self {
        Self {
            trace_id: random_hex(16),
            span_id: random_hex(8),
            parent_span_id: None,
            sampled: true,
        }
    }

    /// Child context for the next hop, parented on this span.
    pub fn child(&self) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            span_id: random_hex(8),
            parent_span_id: Some(self.span_id.clone()),
            sampled: self.sampled,
        }
    }

    /// Read context from `traceparent`, falling back to B3.
    pub fn extract(headers: &HeaderMap) -> Option<Self> {
        Self::extract_w3c(headers).or_else(|| Self::extract_b3(headers))
    }

    fn extract_w3c(headers: &HeaderMap) -> Option<Self> {
        let value = header_str(headers, &TRACEPARENT)?.to_ascii_lowercase();
        let mut parts = value.split('-');
        let (version, trace_id, span_id, flags) = (parts.next()?, parts.next()?, parts.next()?, parts.next()?);
        if version.len() != 2 || version == "ff" || (version == "00" && parts.next().is_some()) {
            return None;
        }
        if !is_hex(trace_id, 32) || !is_hex(span_id, 16) || flags.len() != 2 {
            return None;
        }
        let flags = u8::from_str_radix(flags, 16).ok()?;

        Some(Self {
            trace_id: trace_id.to_string(),
            span_id: span_id.to_string(),
            parent_span_id: None,
            sampled: flags & 0x01 == 1,
        })
    }

    fn extract_b3(headers: &HeaderMap) -> Option<Self> {
        let trace_id = header_str(headers, &B3_TRACE_ID)?.to_ascii_lowercase();
        let span_id = header_str(headers, &B3_SPAN_ID)?.to_ascii_lowercase();

        let trace_id = match trace_id.len() {
            16 if is_hex(&trace_id, 16) => format!("{trace_id:0>32}"),
            32 if is_hex(&trace_id, 32) => trace_id,
            _ => return None,
        };
        if !is_hex(&span_id, 16) {
            return None;
        }

        let sampled = !matches!(header_str(headers, &B3_SAMPLED), Some("0") | Some("false"));
        let parent_span_id = header_str(headers, &B3_PARENT_SPAN_ID)
            .map(str::to_ascii_lowercase)
            .filter(|p| is_hex(p, 16));

        Some(Self {
            trace_id,
            span_id,
            parent_span_id,
            sampled,
        })
    }

    /// Replace all trace headers with this context in the given format.
    pub fn inject(&self, headers: &mut HeaderMap, kind: PropagatorKind) {
        strip(headers);

        match kind {
            PropagatorKind::TraceContext => {
                let flags = if self.sampled { "01" } else { "00" };
                let value = format!("00-{}-{}-{}", self.trace_id, self.span_id, flags);
                if let Ok(value) = HeaderValue::from_str(&value) {
                    headers.insert(TRACEPARENT, value);
                }
            }
            PropagatorKind::B3 => {
                let pairs = [
                    (B3_TRACE_ID, Some(self.trace_id.as_str())),
                    (B3_SPAN_ID, Some(self.span_id.as_str())),
                    (B3_PARENT_SPAN_ID, self.parent_span_id.as_deref()),
                    (B3_SAMPLED, Some(if self.sampled { "1" } else { "0" })),
                ];
                for (name, value) in pairs {
                    if let Some(value) = value.and_then(|v| HeaderValue::from_str(v).ok()) {
                        headers.insert(name, value);
                    }
                }
            }
        }
    }
}

fn strip(headers: &mut HeaderMap) {
    for name in [TRACEPARENT, TRACESTATE, B3_TRACE_ID, B3_SPAN_ID, B3_PARENT_SPAN_ID, B3_SAMPLED] {
        headers.remove(name);
    }
}

/// Continue (or start) the trace for a forwarded request and rewrite its
/// headers. Returns the context sent upstream.
pub fn propagate(headers: &mut HeaderMap, kind: PropagatorKind) -> TraceContext {
    let outbound = match TraceContext::extract(headers) {
        Some(inbound) => inbound.child(),
        None => TraceContext::new_root(),
    };
    outbound.inject(headers, kind);
    outbound
}
