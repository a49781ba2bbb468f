//! Token revocation blacklist.
//!
//! Marks authentication-token identifiers as revoked until the moment
//! the token would have expired on its own. A revocation record that
//! outlives its token wastes memory; one that dies earlier reopens a
//! window where a revoked token is accepted again - so the record's TTL
//! is always the token's own remaining lifetime.
//!
//! Revocation is indexed by token identifier only. Revoking everything
//! a user holds is the caller's job: the auth middleware knows which
//! identifiers belong to a session, this component does not.
//!
//! # Fail-open
//!
//! `is_revoked` is a defense-in-depth check on every authenticated
//! request. When the backend cannot answer, the check degrades to "not
//! revoked" rather than taking authentication down - the error is
//! logged at the point of occurrence.

use std::sync::Arc;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use gatehouse_store::EphemeralStore;

use crate::{GuardError, GuardResult};

const KEY_PREFIX: &str = "revoked:";

/// Revocation blacklist over an ephemeral store.
pub struct TokenBlacklist {
    store: Arc<dyn EphemeralStore>,
}

impl TokenBlacklist {
    /// Creates a blacklist over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn EphemeralStore>) -> Self {
        Self { store }
    }

    fn key(token_id: &str) -> String {
        format!("{KEY_PREFIX}{token_id}")
    }

    /// Marks a token identifier as revoked until `expires_at`.
    ///
    /// A token that has already expired needs no record; the call is a
    /// no-op. Revoking an already-revoked identifier is idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if `token_id` is empty or the record cannot be
    /// written.
    pub async fn revoke_token(
        &self,
        token_id: &str,
        expires_at: OffsetDateTime,
    ) -> GuardResult<()> {
        if token_id.is_empty() {
            return Err(GuardError::MissingToken);
        }

        let now = OffsetDateTime::now_utc();
        if expires_at <= now {
            tracing::debug!(token_id, "skipping revocation of already-expired token");
            return Ok(());
        }

        let ttl = (expires_at - now).unsigned_abs();
        let value = expires_at.format(&Rfc3339).unwrap_or_default();
        self.store.set(&Self::key(token_id), &value, ttl).await?;

        tracing::debug!(token_id, expires_at = %value, "token revoked");
        Ok(())
    }

    /// Checks whether a token identifier has been revoked.
    ///
    /// Empty identifiers are never revoked and cost no backend call.
    /// Backend errors fail open to `false` and are logged.
    pub async fn is_revoked(&self, token_id: &str) -> bool {
        if token_id.is_empty() {
            return false;
        }

        match self.store.exists(&Self::key(token_id)).await {
            Ok(revoked) => revoked,
            Err(e) => {
                tracing::warn!(token_id, error = %e, "revocation check failed, failing open");
                false
            }
        }
    }

    /// Revokes a known set of token identifiers belonging to one user.
    ///
    /// Revocation happens sequentially; the first write failure aborts
    /// and is returned so the caller can retry the whole set.
    ///
    /// # Errors
    ///
    /// Returns an error if any identifier is empty or any record cannot
    /// be written.
    pub async fn revoke_all_user_tokens(
        &self,
        user_id: &str,
        token_ids: &[String],
        expires_at: OffsetDateTime,
    ) -> GuardResult<()> {
        for token_id in token_ids {
            self.revoke_token(token_id, expires_at).await?;
        }
        tracing::info!(user_id, count = token_ids.len(), "revoked user tokens");
        Ok(())
    }
}
