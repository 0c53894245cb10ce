//! Request count metrics middleware.

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::observability::Collectors;
use crate::routing::matcher::request_host;

pub async fn metrics_middleware(State(collectors): State<Collectors>, req: Request<Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let host = request_host(&req).unwrap_or_default();

    let response = next.run(req).await;
    collectors.record_request_count(&method, &path, response.status().as_u16(), &host);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::Collector;
    use axum::http::StatusCode;
    use axum::middleware::from_fn_with_state;
    use axum::routing::get;
    use axum::Router;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    #[derive(Default)]
    struct Requests(Mutex<Vec<(String, String, u16, String)>>);

    impl Collector for Requests {
        fn record_request_count(&self, method: &str, path: &str, status: u16, host: &str) {
            self.0
                .lock()
                .unwrap()
                .push((method.into(), path.into(), status, host.into()));
        }

        fn record_pending_request_count(&self, _: &str, _: i64) {}
    }

    #[tokio::test]
    async fn records_final_status() {
        let requests = Arc::new(Requests::default());
        let router = Router::new()
            .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
            .layer(from_fn_with_state(Collectors::new(vec![requests.clone() as Arc<dyn Collector>]), metrics_middleware));

        let req = Request::get("/missing")
            .header("host", "app.example.com")
            .body(Body::empty())
            .unwrap();
        router.oneshot(req).await.unwrap();

        let recorded = requests.0.lock().unwrap();
        assert_eq!(
            *recorded,
            vec![("GET".into(), "/missing".into(), 404, "app.example.com".into())]
        );
    }
}
