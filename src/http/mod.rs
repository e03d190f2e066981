//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, cache key, header filtering)
//!     → handler.rs (cache lookup, origin round trip on miss)
//!     → response.rs (header copy, x-cache marker)
//!     → Send to client
//! ```

pub mod handler;
pub mod origin;
pub mod request;
pub mod response;
pub mod server;

pub use handler::ProxyError;
pub use origin::{Origin, OriginError};
pub use response::{CacheStatus, X_CACHE};
pub use server::{AppState, HttpServer};
