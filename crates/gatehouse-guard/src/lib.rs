//! # gatehouse-guard
//!
//! Ephemeral security state for the Gatehouse authentication tier:
//! token revocation, CSRF protection and login rate limiting.
//!
//! This crate provides:
//! - [`TokenBlacklist`] - revoked-token identifiers, kept until the
//!   token's own expiry
//! - [`CsrfManager`] - per-user anti-forgery tokens with double-submit
//!   support
//! - [`RateLimiter`] - fixed-window login throttling with block
//!   escalation
//! - [`GuardConfig`] - tuning for all three
//! - [`client_identifier`] - the trusted-header walk that keys
//!   pre-auth rate limiting
//!
//! ## Overview
//!
//! The three components are independent of each other; an auth
//! middleware calls into each directly. Each owns one key namespace in
//! an [`EphemeralStore`](gatehouse_store::EphemeralStore) chosen at
//! construction time - a shared TTL-native backend when one is
//! configured, an in-process map otherwise.
//!
//! ## Degradation
//!
//! None of these checks may take authentication down. Backend failures
//! on check paths are logged and fail open: a token reads as not
//! revoked, a CSRF token validates, an attempt is allowed. Validation
//! failures, by contrast, are typed [`GuardError`]s for the caller to
//! map to 401/403.

pub mod blacklist;
pub mod config;
pub mod csrf;
pub mod error;
pub mod ip;
pub mod rate_limit;

#[cfg(test)]
mod test_util;

pub use blacklist::TokenBlacklist;
pub use config::{BlacklistConfig, ConfigError, CsrfConfig, GuardConfig, RateLimitConfig};
pub use csrf::{CsrfManager, generate_secret};
pub use error::GuardError;
pub use ip::{UNKNOWN_CLIENT, client_identifier};
pub use rate_limit::{RateLimitDecision, RateLimiter};

/// Type alias for security-state operation results.
pub type GuardResult<T> = Result<T, GuardError>;
