//! Cold-start placeholder pages.
//!
//! # Data Flow
//! ```text
//! Upstream handler (target has zero ready replicas, placeholder enabled)
//!     → handler.rs (resolve template source)
//!         → config map via source.rs, keyed by resource version
//!         → inline content, keyed by owner generation
//!         → built-in default
//!     → cache.rs (reuse compiled template when generation/version match)
//!     → template.rs (render with service, namespace, refresh, request id, time)
//!     → response with placeholder headers
//! ```
//!
//! # Design Decisions
//! - Template errors degrade to a minimal page; the client never sees them
//! - One read/write lock guards the whole cache

pub mod cache;
pub mod handler;
pub mod source;
pub mod template;

pub use cache::{CacheEntry, TemplateCache};
pub use handler::{PlaceholderError, PlaceholderHandler, PLACEHOLDER_SERVED_HEADER};
pub use source::{ConfigData, ConfigSource, ConfigSourceError, MemoryConfigSource};
pub use template::{Template, TemplateData, TemplateError};
