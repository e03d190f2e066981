//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! built-in defaults
//!     → config file (TOML), non-empty values only
//!     → environment variables, non-empty values only
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → passed by reference to the cache and HTTP constructors
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup and never mutated afterward
//! - Precedence is per field: environment > file > default
//! - A zero or empty value never overrides a lower layer
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, ConfigOverlay};
pub use schema::{
    CacheConfig, LimitsConfig, ObservabilityConfig, ProxyConfig, RedisConfig, TimeoutConfig,
};
