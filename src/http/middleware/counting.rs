//! Pending-request counting middleware.
//!
//! # Data Flow
//! ```text
//! Request (RequestContext attached)
//!     → increase(key, 1), publish gauge
//!     → spawn coordination task waiting on a one-shot signal
//!     → inner handler runs; response body wrapped with an InFlight guard
//!     → last guard dropped (body done, tunnel closed, client gone, panic)
//!     → signal → coordination task → decrease(key, 1), publish gauge
//! ```
//!
//! # Design Decisions
//! - The decrement is tied to a drop guard, not to a handler return value,
//!   so no response path can skip it
//! - A failed increment skips the decrement and the gauge for that request;
//!   the request itself still proceeds

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use bytes::Bytes;
use http_body::{Frame, SizeHint};

use crate::http::request::RequestContext;
use crate::lifecycle::{Shutdown, Signaler};
use crate::observability::Collectors;
use crate::queue::QueueCounter;

#[derive(Clone)]
pub struct CountingState {
    pub queue: Arc<dyn QueueCounter>,
    pub collectors: Collectors,
    pub shutdown: Shutdown,
}

impl CountingState {
    async fn publish(&self, key: &str) {
        if let Some(value) = self.queue.current_for_host(key).await {
            self.collectors.record_pending_request_count(key, value);
        }
    }
}

/// Held while a request is in flight; dropping the last clone fires the
/// decrement.
#[derive(Debug)]
pub struct InFlight {
    signaler: Signaler,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.signaler.signal();
    }
}

/// Response body that keeps the request counted until it is fully sent or
/// dropped.
struct CountedBody {
    inner: Body,
    _in_flight: Arc<InFlight>,
}

impl http_body::Body for CountedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Bytes>, axum::Error>>> {
        Pin::new(&mut self.inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

pub async fn counting_middleware(State(state): State<CountingState>, mut req: Request<Body>, next: Next) -> Response {
    let Some(key) = req.extensions().get::<RequestContext>().map(|c| c.routing_key.clone()) else {
        return next.run(req).await;
    };

    if let Err(e) = state.queue.increase(&key, 1).await {
        tracing::error!(routing_key = %key, error = %e, "Failed to increase pending request count");
        return next.run(req).await;
    }
    state.publish(&key).await;

    let (signaler, mut waiter) = Signaler::new();
    let shutdown = state.shutdown.subscribe();
    let task_state = state.clone();
    let task_key = key.clone();
    tokio::spawn(async move {
        if let Err(e) = waiter.wait(Shutdown::triggered(shutdown)).await {
            tracing::debug!(routing_key = %task_key, reason = %e, "Releasing pending count without completion signal");
        }
        match task_state.queue.decrease(&task_key, 1).await {
            Ok(()) => task_state.publish(&task_key).await,
            Err(e) => tracing::error!(routing_key = %task_key, error = %e, "Failed to decrease pending request count"),
        }
    });

    let in_flight = Arc::new(InFlight { signaler });
    req.extensions_mut().insert(in_flight.clone());

    next.run(req)
        .await
        .map(|inner| Body::new(CountedBody { inner, _in_flight: in_flight }))
}
