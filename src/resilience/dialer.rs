//! Retrying connection establishment.
//!
//! # Responsibilities
//! - Wrap any `Service<Uri>` connector (usually `HttpConnector`)
//! - Retry failed dials on the backoff schedule
//! - Give up after the configured number of attempts
//!
//! # Design Decisions
//! - Only connection establishment is retried; once a connection exists the
//!   request is sent exactly once
//! - The per-attempt connect timeout lives in the inner connector

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use hyper::Uri;
use hyper_util::client::legacy::connect::HttpConnector;
use tower::{Service, ServiceExt};

use crate::resilience::backoff::Backoff;
use crate::resilience::timeouts::Timeouts;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Every dial attempt failed.
#[derive(Debug, thiserror::Error)]
#[error("dial {uri} failed after {attempts} attempts in {elapsed:?}: {source}")]
pub struct DialError {
    pub uri: Uri,
    pub attempts: u32,
    pub elapsed: Duration,
    #[source]
    pub source: BoxError,
}

/// Connector that retries failed dials with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryingConnector<C> {
    inner: C,
    backoff: Arc<Backoff>,
}

impl<C> RetryingConnector<C> {
    pub fn new(inner: C, backoff: Backoff) -> Self {
        Self {
            inner,
            backoff: Arc::new(backoff),
        }
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }
}

impl RetryingConnector<HttpConnector> {
    /// TCP connector with the configured connect timeout and keep-alive.
    pub fn tcp(timeouts: &Timeouts, backoff: Backoff) -> Self {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_nodelay(true);
        http.set_connect_timeout(Some(timeouts.connect));
        http.set_keepalive(Some(timeouts.keep_alive));
        Self::new(http, backoff)
    }
}

impl<C> Service<Uri> for RetryingConnector<C>
where
    C: Service<Uri> + Clone + Send + 'static,
    C::Response: Send,
    C::Error: Into<BoxError> + Send,
    C::Future: Send,
{
    type Response = C::Response;
    type Error = DialError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, uri: Uri) -> Self::Future {
        let mut inner = self.inner.clone();
        let backoff = self.backoff.clone();

        Box::pin(async move {
            let started = Instant::now();
            let mut attempt = 0;

            loop {
                attempt += 1;
                let error: BoxError = match dial(&mut inner, &uri).await {
                    Ok(conn) => {
                        if attempt > 1 {
                            tracing::debug!(%uri, attempt, elapsed = ?started.elapsed(), "Dial succeeded after retry");
                        }
                        return Ok(conn);
                    }
                    Err(e) => e.into(),
                };

                if attempt >= backoff.steps {
                    return Err(DialError {
                        uri,
                        attempts: attempt,
                        elapsed: started.elapsed(),
                        source: error,
                    });
                }

                let delay = backoff.delay(attempt);
                tracing::debug!(%uri, attempt, delay = ?delay, error = %error, "Dial failed, retrying");
                tokio::time::sleep(delay).await;
            }
        })
    }
}

/// One dial attempt through a ready inner connector.
async fn dial<C>(inner: &mut C, uri: &Uri) -> Result<C::Response, C::Error>
where
    C: Service<Uri>,
{
    inner.ready().await?.call(uri.clone()).await
}
