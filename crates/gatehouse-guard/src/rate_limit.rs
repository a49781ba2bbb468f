//! Login rate limiting.
//!
//! Fixed-window counting with block escalation, per identifier (an IP
//! for pre-auth traffic, a user id after). Two keys per identifier: a
//! counter whose TTL is the window, and a block marker whose TTL is the
//! block duration. The window starts at the first attempt and is never
//! extended; when the counter's TTL lapses, the next attempt starts a
//! fresh window.
//!
//! This is a fixed window, not a sliding one: a burst straddling a
//! window boundary can admit up to twice `max_attempts` across the
//! edge. That approximation is accepted; a sliding window would need a
//! timestamp list per identifier instead of one counter.
//!
//! # Fail-open
//!
//! A backend failure must not lock everyone out of login. Every check
//! degrades to "allowed" with a logged warning when the store cannot
//! answer.

use std::sync::Arc;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use gatehouse_store::EphemeralStore;

use crate::config::RateLimitConfig;
use crate::{GuardError, GuardResult};

const ATTEMPTS_PREFIX: &str = "ratelimit:attempts:";
const BLOCK_PREFIX: &str = "ratelimit:block:";

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the attempt may proceed.
    pub allowed: bool,
    /// Attempts left in the current window (0 when denied).
    pub remaining: u32,
    /// When the current window or block elapses.
    pub reset_at: OffsetDateTime,
}

impl RateLimitDecision {
    /// Converts a denial into the typed error callers map to HTTP 429.
    ///
    /// Returns `None` for an allowing decision.
    #[must_use]
    pub fn as_error(&self) -> Option<GuardError> {
        if self.allowed {
            None
        } else {
            Some(GuardError::rate_limited(self.reset_at))
        }
    }
}

/// Fixed-window rate limiter over an ephemeral store.
pub struct RateLimiter {
    store: Arc<dyn EphemeralStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Creates a limiter over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn EphemeralStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    fn attempts_key(identifier: &str) -> String {
        format!("{ATTEMPTS_PREFIX}{identifier}")
    }

    fn block_key(identifier: &str) -> String {
        format!("{BLOCK_PREFIX}{identifier}")
    }

    /// Records an attempt by `identifier` and decides whether it may
    /// proceed.
    ///
    /// Exceeding `max_attempts` within one window installs a block for
    /// `block_duration`; while the block is live every attempt is
    /// denied with the block's deadline as `reset_at`, and counting
    /// starts from zero once both the block and the window have lapsed.
    /// Backend errors fail open to an allowing decision and are logged.
    ///
    /// # Errors
    ///
    /// Returns an error only for an empty identifier, before any
    /// backend call.
    pub async fn check(&self, identifier: &str) -> GuardResult<RateLimitDecision> {
        if identifier.is_empty() {
            return Err(GuardError::invalid_identifier(
                "empty rate-limit identifier",
            ));
        }

        let now = OffsetDateTime::now_utc();
        let block_key = Self::block_key(identifier);
        let attempts_key = Self::attempts_key(identifier);

        match self.store.ttl_remaining(&block_key).await {
            Ok(Some(remaining)) => {
                return Ok(Self::denied(now + remaining));
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(identifier, error = %e, "block lookup failed, failing open");
                return Ok(self.fail_open(now));
            }
        }

        let attempts = match self.store.increment(&attempts_key, self.config.window).await {
            Ok(attempts) => attempts,
            Err(e) => {
                tracing::warn!(identifier, error = %e, "attempt count failed, failing open");
                return Ok(self.fail_open(now));
            }
        };

        if attempts > i64::from(self.config.max_attempts) {
            let blocked_until = now + self.config.block_duration;
            let value = blocked_until.format(&Rfc3339).unwrap_or_default();
            if let Err(e) = self
                .store
                .set(&block_key, &value, self.config.block_duration)
                .await
            {
                tracing::warn!(identifier, error = %e, "failed to install rate-limit block");
            }
            // The counter is left to lapse with its window TTL. Deleting
            // it here would let a concurrent attempt that already passed
            // the block check start a fresh window before the block
            // lands; a monotone counter keeps every racer above the
            // threshold.
            tracing::info!(identifier, attempts, "rate limit exceeded, block installed");
            return Ok(Self::denied(blocked_until));
        }

        let reset_at = match self.store.ttl_remaining(&attempts_key).await {
            Ok(Some(remaining)) => now + remaining,
            Ok(None) => now + self.config.window,
            Err(e) => {
                tracing::warn!(identifier, error = %e, "window lookup failed");
                now + self.config.window
            }
        };
        let remaining = self
            .config
            .max_attempts
            .saturating_sub(u32::try_from(attempts).unwrap_or(u32::MAX));

        Ok(RateLimitDecision {
            allowed: true,
            remaining,
            reset_at,
        })
    }

    /// Forgives all prior attempts by `identifier`, clearing both the
    /// counter and any active block. Called after a successful
    /// authentication.
    ///
    /// Backend errors are logged and swallowed - the fail-open default
    /// for a forgiveness path is to do nothing.
    ///
    /// # Errors
    ///
    /// Returns an error only for an empty identifier.
    pub async fn reset(&self, identifier: &str) -> GuardResult<()> {
        if identifier.is_empty() {
            return Err(GuardError::invalid_identifier(
                "empty rate-limit identifier",
            ));
        }

        for key in [
            Self::attempts_key(identifier),
            Self::block_key(identifier),
        ] {
            if let Err(e) = self.store.delete(&key).await {
                tracing::warn!(identifier, error = %e, "failed to clear rate-limit state");
            }
        }
        Ok(())
    }

    fn denied(reset_at: OffsetDateTime) -> RateLimitDecision {
        RateLimitDecision {
            allowed: false,
            remaining: 0,
            reset_at,
        }
    }

    fn fail_open(&self, now: OffsetDateTime) -> RateLimitDecision {
        RateLimitDecision {
            allowed: true,
            remaining: self.config.max_attempts,
            reset_at: now + self.config.window,
        }
    }
}
