//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, peer address, graceful drain)
//!     → request-id and trace layers
//!     → middleware/ (metrics, routing, counting)
//!     → proxy::forward
//!     → response.rs (static responses for every locally generated status)
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, RequestContext, REQUEST_ID_HEADER};
pub use response::Static;
pub use server::{Dependencies, InterceptorServer};
