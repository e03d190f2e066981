//! Response cache subsystem.
//!
//! # Data Flow
//! ```text
//! handler lookup
//!     → tiered.rs (facade)
//!         → local.rs (bounded LRU + TTL, in-process)
//!         → remote.rs (optional Redis tier, on local miss)
//!             → backfill local on remote hit
//!
//! handler store
//!     → tiered.rs
//!         → local.rs (synchronous)
//!         → remote.rs (detached task, bounded timeout)
//! ```
//!
//! # Design Decisions
//! - The local tier is authoritative for the request path; the remote tier
//!   only ever accelerates, it never fails a request
//! - Items are immutable and shared as `Arc<CacheItem>`
//! - Expiry is lazy: dead entries are dropped when a lookup trips over them

pub mod item;
pub mod local;
pub mod remote;
pub mod tiered;

pub use item::{CacheItem, HeaderList};
pub use local::LocalCache;
pub use remote::{RedisTier, RemoteError, RemoteTier};
pub use tiered::TieredCache;

/// Errors surfaced by cache construction and administrative operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("remote cache error: {0}")]
    Remote(#[from] RemoteError),
}
