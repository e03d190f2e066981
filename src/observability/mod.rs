//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! handler, cache facade, startup
//!     → logging.rs (tracing events: request entry, origin URL, remote tier failures)
//!     → metrics.rs (request outcome, tier hit ratio, local entry count)
//!
//! Exported to:
//!     → stdout (fmt layer)
//!     → /metrics on the configured address, when enabled
//! ```
//!
//! # Design Decisions
//! - Every request event carries the `x-request-id` value
//! - Metrics macros are no-ops until the Prometheus recorder is installed,
//!   so tests and `--clear-cache` runs never need one

pub mod logging;
pub mod metrics;
