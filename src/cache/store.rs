//! Time-bound storage for cached listing responses.
//!
//! Entries expire a fixed interval after they were written; expiry is checked
//! lazily on read. Writes never consult existing entries, so concurrent
//! writers for the same key resolve last-writer-wins.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use bytes::Bytes;
use lru::LruCache;

use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};

/// Identifies one cached page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListingKey {
    pub path: String,
    pub query_hash: u64,
}

impl ListingKey {
    pub fn new(path: impl Into<String>, query: &str) -> Self {
        Self {
            path: path.into(),
            query_hash: hash_query(query),
        }
    }
}

pub fn hash_query(query: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    query.hash(&mut hasher);
    hasher.finish()
}

/// Cached HTTP response.
#[derive(Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

#[derive(Clone)]
struct Entry {
    stored_at: Instant,
    response: CachedResponse,
}

/// Response cache for the home listing.
pub struct ListingStore {
    ttl: Duration,
    responses: RwLock<LruCache<ListingKey, Entry>>,
}

impl ListingStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            ttl: config.ttl(),
            responses: RwLock::new(LruCache::new(config.max_entries_non_zero())),
        }
    }

    /// Returns the cached response if present and still within its TTL.
    /// An expired entry is dropped on the spot.
    pub fn get(&self, key: &ListingKey) -> Option<CachedResponse> {
        let mut responses = rw_write(&self.responses, "get");
        let entry = responses.get(key)?;
        if entry.stored_at.elapsed() >= self.ttl {
            responses.pop(key);
            return None;
        }
        Some(entry.response.clone())
    }

    pub fn set(&self, key: ListingKey, response: CachedResponse) {
        rw_write(&self.responses, "set").put(
            key,
            Entry {
                stored_at: Instant::now(),
                response,
            },
        );
    }

    /// Drops every cached response regardless of age.
    pub fn clear(&self) {
        rw_write(&self.responses, "clear").clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.responses, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
