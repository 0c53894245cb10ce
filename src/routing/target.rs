//! Targets and the streams derived from them.
//!
//! A target is owned by the routing table and never mutated once matched.
//! A stream is the concrete URL for one forwarded request and lives only as
//! long as that request.

use url::Url;

use crate::config::schema::{FailoverConfig, TargetConfig};

/// A resolved backend description for a matched route.
pub type Target = TargetConfig;

/// Error building a stream URL from a target.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("target {0} has no port")]
    MissingPort(String),
    #[error("target {key} has no service")]
    MissingService { key: String },
    #[error("invalid stream url {url}: {source}")]
    Invalid {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl TargetConfig {
    /// Identity used to bucket pending-request counts.
    pub fn routing_key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Stream for the primary service.
    pub fn stream(&self, tls: bool) -> Result<Url, StreamError> {
        build_stream(&self.routing_key(), &self.service, &self.namespace, self.port, tls)
    }

    /// Stream for the failover service, if one is configured.
    pub fn failover_stream(&self, tls: bool) -> Option<Result<Url, StreamError>> {
        self.failover.as_ref().map(|FailoverConfig { service, port, .. }| {
            build_stream(&self.routing_key(), service, &self.namespace, *port, tls)
        })
    }
}

/// Build `scheme://service.namespace:port`.
///
/// A service that already looks fully qualified (contains `.` or `:`) is used
/// verbatim so targets can point at external names or literal addresses.
pub fn build_stream(
    key: &str,
    service: &str,
    namespace: &str,
    port: u16,
    tls: bool,
) -> Result<Url, StreamError> {
    if service.is_empty() {
        return Err(StreamError::MissingService { key: key.to_string() });
    }
    if port == 0 {
        return Err(StreamError::MissingPort(key.to_string()));
    }

    let scheme = if tls { "https" } else { "http" };
    let host = if service.contains(':') && !service.starts_with('[') {
        format!("[{service}]")
    } else if service.contains('.') || service.starts_with('[') || namespace.is_empty() {
        service.to_string()
    } else {
        format!("{service}.{namespace}")
    };

    let url = format!("{scheme}://{host}:{port}");
    Url::parse(&url).map_err(|source| StreamError::Invalid { url, source })
}
