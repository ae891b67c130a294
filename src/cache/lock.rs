//! Poison-tolerant guards for the listing store's lock.
//!
//! A handler that panics while holding the lock poisons it; the cache only
//! holds rebuildable page copies, so the guard is recovered and the incident
//! logged instead of failing every later request.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

pub(crate) fn rw_read<'a, T>(lock: &'a RwLock<T>, op: &'static str) -> RwLockReadGuard<'a, T> {
    lock.read().unwrap_or_else(|poisoned| {
        warn!(op, "listing store read lock poisoned, recovering");
        poisoned.into_inner()
    })
}

pub(crate) fn rw_write<'a, T>(lock: &'a RwLock<T>, op: &'static str) -> RwLockWriteGuard<'a, T> {
    lock.write().unwrap_or_else(|poisoned| {
        warn!(op, "listing store write lock poisoned, recovering");
        poisoned.into_inner()
    })
}
