//! # gatehouse-store
//!
//! Ephemeral security-state storage for the Gatehouse authentication
//! tier.
//!
//! This crate provides:
//! - The [`EphemeralStore`] capability trait shared by every backend
//! - The in-process [`MemoryStore`] with a background sweeper
//! - The [`StoreError`] type and [`StoreResult`] alias
//!
//! ## Overview
//!
//! Token revocation, CSRF issuance and login rate limiting all maintain
//! the same kind of state: short-lived, mutation-heavy key/value entries
//! that must stay consistent under concurrent access. This crate defines
//! the storage contract those policy components share, so the choice of
//! backend (a networked TTL-native service, or this crate's in-process
//! map) is made once at construction and never leaks into policy code.
//!
//! ```text
//! policy component → EphemeralStore → MemoryStore   (single process)
//!                                   → RedisStore    (shared, gatehouse-store-redis)
//! ```
//!
//! ## Graceful degradation
//!
//! Backends are allowed to fail on any call. Consumers on request paths
//! log the failure and fall back to their permissive default; nothing in
//! this layer is fatal to the host process.

pub mod error;
pub mod memory;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use store::EphemeralStore;

/// Type alias for ephemeral store results.
pub type StoreResult<T> = Result<T, StoreError>;
