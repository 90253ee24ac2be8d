//! Shared helpers: calendar months and per-key locking.

pub mod keyed_lock;
pub mod time_utils;

pub use keyed_lock::{KeyedLockGuard, KeyedLocks};
