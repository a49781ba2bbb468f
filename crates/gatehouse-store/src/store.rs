//! Ephemeral key/value storage trait.
//!
//! This module defines the capability set shared by every backend that
//! holds short-lived security state: revoked token identifiers, CSRF
//! tokens, and login rate-limit counters. All values are strings with a
//! mandatory time-to-live; nothing stored through this interface is
//! expected to survive past its expiry.
//!
//! # Implementations
//!
//! - [`MemoryStore`](crate::MemoryStore) - in-process map with a
//!   background sweeper (this crate)
//! - `RedisStore` - networked TTL-native backend
//!   (`gatehouse-store-redis`)
//!
//! # Namespacing
//!
//! Each consumer owns exactly one key prefix (e.g. `revoked:`, `csrf:`,
//! `ratelimit:`) and must never touch another consumer's keys. The store
//! itself is prefix-agnostic; [`scan_prefix`](EphemeralStore::scan_prefix)
//! exists so a consumer can enumerate its own namespace.

use std::time::Duration;

use async_trait::async_trait;

use crate::StoreResult;

/// Storage trait for ephemeral, TTL-bounded security state.
///
/// Every operation is fallible. Backends implemented over a network
/// service can fail or time out on any call; consumers on authentication
/// request paths must treat a failure as a degraded check and fall back
/// to their permissive default instead of failing the request.
#[async_trait]
pub trait EphemeralStore: Send + Sync {
    /// Stores `value` under `key`, replacing any existing entry.
    ///
    /// The entry expires `ttl` from now. A zero `ttl` is legal but the
    /// entry is immediately considered expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// Reads the live value stored under `key`.
    ///
    /// Returns `None` for missing *and* expired entries: an entry whose
    /// expiry has passed must never be returned, even if the backend has
    /// not physically reclaimed it yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Checks whether a live entry exists under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Atomically increments the counter stored under `key`.
    ///
    /// A missing or expired key is created at zero before the increment,
    /// and `ttl` is applied to it as part of the same atomic step - a
    /// counter must never exist without an expiry, or it would keep
    /// accumulating forever. The TTL of an already-live counter is left
    /// untouched.
    ///
    /// # Returns
    ///
    /// The counter value after the increment (`1` on first creation).
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails or the existing
    /// value is not an integer.
    async fn increment(&self, key: &str, ttl: Duration) -> StoreResult<i64>;

    /// Deletes the entry under `key`.
    ///
    /// Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Returns the remaining lifetime of the entry under `key`.
    ///
    /// Returns `None` when the key is missing, expired, or carries no
    /// expiry.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn ttl_remaining(&self, key: &str) -> StoreResult<Option<Duration>>;

    /// Returns all live `(key, value)` pairs whose key starts with
    /// `prefix`.
    ///
    /// This is a linear scan over the consumer's namespace; it is meant
    /// for infrequent bulk operations (per-user invalidation), not for
    /// request-path lookups.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn scan_prefix(&self, prefix: &str) -> StoreResult<Vec<(String, String)>>;
}
