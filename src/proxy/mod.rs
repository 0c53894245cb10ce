//! Upstream forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Routed request (RequestContext extension)
//!     → upstream.rs (cold start check, placeholder / wait / failover)
//!     → forwarded.rs (origin-form URI, X-Forwarded-For, hop-by-hop headers)
//!     → transport.rs (retrying dial, handshake, header timeout)
//!     → response streamed back, or tunnel.rs on 101 Switching Protocols
//!         → buffer_pool.rs (32 KiB copy buffers)
//! ```

pub mod buffer_pool;
pub mod forwarded;
pub mod transport;
pub mod tunnel;
pub mod upstream;

pub use buffer_pool::{BufferPool, PooledBuffer, BUFFER_SIZE};
pub use transport::{ForwardError, ResilientTransport, TlsSetupError};
pub use upstream::{forward, Upstream, COLD_START_HEADER};
