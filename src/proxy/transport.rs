//! One request, one upstream connection.
//!
//! # Responsibilities
//! - Dial the stream through the retrying connector (TLS when `https`)
//! - Run an HTTP/1.1 handshake with upgrade support
//! - Bound the wait for response headers
//!
//! # Design Decisions
//! - The header timeout starts once the request body has been fully written
//!   and ends when the response head arrives; a slow upload never counts
//!   against it, and body streaming in either direction is unbounded
//! - TLS uses the ring provider explicitly, so no process-wide default
//!   provider has to be installed
//! - A fresh connection per request keeps dial retries and timeouts exact

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response, Uri};
use bytes::Bytes;
use http_body::{Body as _, Frame, SizeHint};
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use tokio::sync::oneshot;
use tower::ServiceExt;
use url::Url;

use crate::resilience::{Backoff, RetryingConnector, Timeouts};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Connector = HttpsConnector<RetryingConnector<HttpConnector>>;

/// Why a request could not be forwarded.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("invalid stream {stream}: {source}")]
    InvalidStream {
        stream: String,
        #[source]
        source: axum::http::uri::InvalidUri,
    },
    #[error("dial {stream} failed: {source}")]
    Dial {
        stream: String,
        #[source]
        source: BoxError,
    },
    #[error("handshake with {stream} failed: {source}")]
    Handshake {
        stream: String,
        #[source]
        source: hyper::Error,
    },
    #[error("no response headers from {stream} within {timeout:?}")]
    HeaderTimeout { stream: String, timeout: Duration },
    #[error("request to {stream} failed: {source}")]
    Request {
        stream: String,
        #[source]
        source: hyper::Error,
    },
}

/// TLS client configuration could not be built.
#[derive(Debug, thiserror::Error)]
#[error("TLS client setup failed: {0}")]
pub struct TlsSetupError(#[from] rustls::Error);

/// Request body that reports when it has been fully handed to the connection.
///
/// Fires on end of stream or on drop, whichever comes first.
struct WrittenBody {
    inner: Body,
    written: Option<oneshot::Sender<()>>,
}

impl WrittenBody {
    fn new(inner: Body) -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        let mut body = Self {
            inner,
            written: Some(tx),
        };
        if body.inner.is_end_stream() {
            body.fire();
        }
        (body, rx)
    }

    fn fire(&mut self) {
        if let Some(tx) = self.written.take() {
            let _ = tx.send(());
        }
    }
}

impl http_body::Body for WrittenBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Bytes>, axum::Error>>> {
        let polled = Pin::new(&mut self.inner).poll_frame(cx);
        match &polled {
            Poll::Ready(None) | Poll::Ready(Some(Err(_))) => self.fire(),
            Poll::Ready(Some(Ok(_))) if self.inner.is_end_stream() => self.fire(),
            _ => {}
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for WrittenBody {
    fn drop(&mut self) {
        self.fire();
    }
}

/// Transport with retrying dials and a response-header deadline.
#[derive(Clone)]
pub struct ResilientTransport {
    connector: Connector,
    response_header_timeout: Duration,
}

impl ResilientTransport {
    pub fn new(timeouts: &Timeouts, backoff: Backoff) -> Result<Self, TlsSetupError> {
        let tcp = RetryingConnector::tcp(timeouts, backoff);
        let connector = HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())?
            .https_or_http()
            .enable_http1()
            .wrap_connector(tcp);

        Ok(Self {
            connector,
            response_header_timeout: timeouts.response_header,
        })
    }

    /// Send `req` to `stream` and return the response head with its body.
    ///
    /// `req` must already carry an origin-form URI and a `Host` header.
    pub async fn round_trip(&self, stream: &Url, req: Request<Body>) -> Result<Response<Incoming>, ForwardError> {
        let name = stream.as_str().trim_end_matches('/').to_string();
        let uri: Uri = name.parse().map_err(|source| ForwardError::InvalidStream {
            stream: name.clone(),
            source,
        })?;

        let io = self
            .connector
            .clone()
            .oneshot(uri)
            .await
            .map_err(|source| ForwardError::Dial {
                stream: name.clone(),
                source,
            })?;

        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|source| ForwardError::Handshake {
                stream: name.clone(),
                source,
            })?;

        let conn_stream = name.clone();
        tokio::spawn(async move {
            if let Err(e) = conn.with_upgrades().await {
                tracing::debug!(stream = %conn_stream, error = %e, "Upstream connection closed with error");
            }
        });

        let (parts, body) = req.into_parts();
        let (body, written) = WrittenBody::new(body);
        let send = sender.send_request(Request::from_parts(parts, Body::new(body)));
        tokio::pin!(send);

        // The upstream may answer before reading the whole body.
        tokio::select! {
            res = &mut send => {
                return res.map_err(|source| ForwardError::Request { stream: name, source });
            }
            _ = written => {}
        }

        match tokio::time::timeout(self.response_header_timeout, send).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(source)) => Err(ForwardError::Request { stream: name, source }),
            Err(_) => Err(ForwardError::HeaderTimeout {
                stream: name,
                timeout: self.response_header_timeout,
            }),
        }
    }
}
