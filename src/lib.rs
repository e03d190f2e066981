//! Caching reverse proxy library.

pub mod cache;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use cache::TieredCache;
pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
