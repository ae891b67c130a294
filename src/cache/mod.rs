//! Piazza response cache.
//!
//! Caches the rendered home listing for a short, fixed time window. Writes
//! do not invalidate it; a stored page simply ages out. The cache supports
//! get-by-key, set-with-expiry and clear-all, and is safe under concurrent
//! request workers.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! ttl_seconds = 20
//! max_entries = 64
//! ```

mod config;
mod lock;
mod middleware;
mod store;

pub use config::CacheConfig;
pub use middleware::{CacheState, response_cache_layer};
pub use store::{CachedResponse, ListingKey, ListingStore, hash_query};
