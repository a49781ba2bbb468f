//! # gatehouse-store-redis
//!
//! Redis backend for the Gatehouse ephemeral security-state store.
//!
//! This crate provides:
//! - [`RedisStore`] - the `EphemeralStore` implementation over a
//!   `deadpool_redis` connection pool
//! - [`select_backend`] - the construction-time choice between Redis
//!   and the in-process fallback
//!
//! ## Why a separate crate
//!
//! The trait and the in-process store live in `gatehouse-store`;
//! keeping the networked backend here keeps the Redis dependency out of
//! consumers that only ever run single-process, and makes adding a
//! third backend additive rather than invasive.

pub mod factory;
pub mod store;

pub use factory::select_backend;
pub use store::RedisStore;
