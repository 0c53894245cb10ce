//! Terminal responses produced by the interceptor itself.
//!
//! # Responsibilities
//! - Render a fixed status with its canonical reason as the body
//! - Log the cause with the fields of the current request span
//!
//! # Design Decisions
//! - Clients only ever see the status text; the cause stays in the logs
//! - A missing route is not an error and logs at debug

use std::fmt::Display;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

/// Fixed status-code responder.
#[derive(Debug)]
pub struct Static {
    status: StatusCode,
    error: Option<String>,
}

impl Static {
    pub fn new(status: StatusCode) -> Self {
        Self { status, error: None }
    }

    /// Attach the cause, logged but never sent to the client.
    pub fn with_error(mut self, error: impl Display) -> Self {
        self.error = Some(error.to_string());
        self
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    pub fn bad_gateway(error: impl Display) -> Self {
        Self::new(StatusCode::BAD_GATEWAY).with_error(error)
    }

    pub fn internal(error: impl Display) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR).with_error(error)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for Static {
    fn into_response(self) -> Response {
        let status = self.status.as_u16();
        match &self.error {
            Some(error) if self.status.is_server_error() => {
                tracing::error!(status, error = %error, "Request failed");
            }
            Some(error) => tracing::warn!(status, error = %error, "Request rejected"),
            None => tracing::debug!(status, "Static response"),
        }

        let body = self.status.canonical_reason().unwrap_or_default();
        let mut response = (self.status, body).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn renders_reason_phrase() {
        let response = Static::not_found().into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_of(response).await, "Not Found");
    }

    #[tokio::test]
    async fn hides_error_detail() {
        let response = Static::bad_gateway("connection refused (os error 111)").into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_of(response).await, "Bad Gateway");
    }
}
