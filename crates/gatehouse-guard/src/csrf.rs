//! CSRF token issuance and validation.
//!
//! Tokens are minted per user, live until their expiry or an explicit
//! invalidation, and may be validated any number of times - there is no
//! single-use consumption. That reusability is load-bearing: the
//! double-submit-cookie check compares header and cookie values without
//! a store lookup, and both checks must agree on what a live token is.
//!
//! # Token derivation
//!
//! Token bytes are an HMAC-SHA256 over a random nonce, the user id and
//! the current time, encoded base64-url without padding. The HMAC is
//! used purely as a salted secure-random-string generator: validation
//! never re-derives it, it consults the store. What matters is that the
//! output is unguessable and collision-free.

use std::sync::Arc;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use time::OffsetDateTime;

use gatehouse_store::EphemeralStore;

use crate::config::CsrfConfig;
use crate::{GuardError, GuardResult};

type HmacSha256 = Hmac<Sha256>;

const KEY_PREFIX: &str = "csrf:";

/// A stored CSRF token: who it was issued to, and until when.
#[derive(Debug, Serialize, Deserialize)]
struct CsrfTokenEntry {
    user_id: String,
    #[serde(with = "time::serde::rfc3339")]
    expires_at: OffsetDateTime,
}

/// Per-user anti-forgery token manager over an ephemeral store.
pub struct CsrfManager {
    store: Arc<dyn EphemeralStore>,
    secret: Vec<u8>,
    token_ttl: Duration,
}

impl CsrfManager {
    /// Creates a manager over the given store.
    ///
    /// When the config carries no secret, a random one is generated for
    /// this process; tokens minted with it will not validate after a
    /// restart.
    #[must_use]
    pub fn new(store: Arc<dyn EphemeralStore>, config: &CsrfConfig) -> Self {
        let secret = match &config.secret {
            Some(secret) => secret.as_bytes().to_vec(),
            None => {
                tracing::warn!(
                    "no CSRF secret configured, generating one for this process; \
                     tokens will not survive a restart"
                );
                generate_secret().into_bytes()
            }
        };
        Self {
            store,
            secret,
            token_ttl: config.token_ttl,
        }
    }

    fn key(token: &str) -> String {
        format!("{KEY_PREFIX}{token}")
    }

    /// Issues a new token bound to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if `user_id` is empty or the token cannot be
    /// stored - a token that never reached the store would never
    /// validate, so storage failures propagate instead of failing open.
    pub async fn generate_token(&self, user_id: &str) -> GuardResult<String> {
        if user_id.is_empty() {
            return Err(GuardError::invalid_identifier("empty user id"));
        }

        let now = OffsetDateTime::now_utc();
        let token = self.mint(user_id, now);
        let entry = CsrfTokenEntry {
            user_id: user_id.to_string(),
            expires_at: now + self.token_ttl,
        };
        let value = serde_json::to_string(&entry).map_err(|e| GuardError::internal(e.to_string()))?;

        self.store
            .set(&Self::key(&token), &value, self.token_ttl)
            .await?;
        Ok(token)
    }

    fn mint(&self, user_id: &str, now: OffsetDateTime) -> String {
        let nonce: [u8; 16] = rand::thread_rng().r#gen();
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC can take key of any size");
        mac.update(&nonce);
        mac.update(user_id.as_bytes());
        mac.update(&now.unix_timestamp_nanos().to_be_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    /// Validates a token claimed by `user_id`.
    ///
    /// Fails on an empty token, an unknown token, an expired token (the
    /// entry is lazily deleted on this path), or a token bound to a
    /// different user. Backend read errors fail open and are logged.
    ///
    /// # Errors
    ///
    /// Returns a validation error for the caller to map to 403.
    pub async fn validate_token(&self, token: &str, user_id: &str) -> GuardResult<()> {
        if token.is_empty() {
            return Err(GuardError::MissingToken);
        }
        if user_id.is_empty() {
            return Err(GuardError::invalid_identifier("empty user id"));
        }

        let key = Self::key(token);
        let value = match self.store.get(&key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "CSRF lookup failed, failing open");
                return Ok(());
            }
        };
        let Some(value) = value else {
            return Err(GuardError::UnknownToken);
        };

        let entry: CsrfTokenEntry = match serde_json::from_str(&value) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "malformed CSRF entry, treating as unknown");
                return Err(GuardError::UnknownToken);
            }
        };

        if OffsetDateTime::now_utc() >= entry.expires_at {
            if let Err(e) = self.store.delete(&key).await {
                tracing::warn!(error = %e, "failed to delete expired CSRF token");
            }
            return Err(GuardError::TokenExpired);
        }
        if entry.user_id != user_id {
            return Err(GuardError::UserMismatch);
        }
        Ok(())
    }

    /// Explicitly invalidates a single token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or the delete fails.
    pub async fn invalidate_token(&self, token: &str) -> GuardResult<()> {
        if token.is_empty() {
            return Err(GuardError::MissingToken);
        }
        self.store.delete(&Self::key(token)).await?;
        Ok(())
    }

    /// Invalidates every live token issued to `user_id`.
    ///
    /// This is a linear scan over the token namespace; it runs on
    /// logout/forced-invalidation paths, not per request.
    ///
    /// # Returns
    ///
    /// The number of tokens removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the user id is empty or the scan/delete
    /// fails.
    pub async fn invalidate_user_tokens(&self, user_id: &str) -> GuardResult<u64> {
        if user_id.is_empty() {
            return Err(GuardError::invalid_identifier("empty user id"));
        }

        let mut removed = 0u64;
        for (key, value) in self.store.scan_prefix(KEY_PREFIX).await? {
            let Ok(entry) = serde_json::from_str::<CsrfTokenEntry>(&value) else {
                continue;
            };
            if entry.user_id == user_id {
                self.store.delete(&key).await?;
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!(user_id, removed, "invalidated user CSRF tokens");
        }
        Ok(removed)
    }

    /// Double-submit check: header and cookie token must both be
    /// present and identical. Never touches the store.
    ///
    /// # Errors
    ///
    /// Returns `MissingToken` when either value is empty and
    /// `HeaderMismatch` when they differ.
    pub fn verify_double_submit(header_token: &str, cookie_token: &str) -> GuardResult<()> {
        if header_token.is_empty() || cookie_token.is_empty() {
            return Err(GuardError::MissingToken);
        }
        if header_token != cookie_token {
            return Err(GuardError::HeaderMismatch);
        }
        Ok(())
    }
}

/// Generates fresh CSRF secret material: 256 random bits, hex-encoded.
#[must_use]
pub fn generate_secret() -> String {
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::FailingStore;
    use gatehouse_store::MemoryStore;

    fn manager() -> (CsrfManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let manager = CsrfManager::new(store.clone(), &CsrfConfig::default());
        (manager, store)
    }

    #[tokio::test]
    async fn test_generate_and_validate() {
        let (manager, _) = manager();

        let token = manager.generate_token("alice").await.unwrap();
        manager.validate_token(&token, "alice").await.unwrap();

        // Tokens are not single-use.
        manager.validate_token(&token, "alice").await.unwrap();
    }

    #[tokio::test]
    async fn test_token_shape() {
        let (manager, _) = manager();

        let token = manager.generate_token("alice").await.unwrap();
        // 32 HMAC bytes, base64-url without padding.
        assert_eq!(token.len(), 43);
        assert!(!token.contains('='));

        let other = manager.generate_token("alice").await.unwrap();
        assert_ne!(token, other);
    }

    #[tokio::test]
    async fn test_wrong_user_is_rejected() {
        let (manager, _) = manager();

        let token = manager.generate_token("alice").await.unwrap();
        let err = manager.validate_token(&token, "bob").await.unwrap_err();
        assert!(matches!(err, GuardError::UserMismatch));
    }

    #[tokio::test]
    async fn test_unknown_and_empty_tokens() {
        let (manager, _) = manager();

        let err = manager.validate_token("no-such-token", "alice").await.unwrap_err();
        assert!(matches!(err, GuardError::UnknownToken));

        let err = manager.validate_token("", "alice").await.unwrap_err();
        assert!(matches!(err, GuardError::MissingToken));

        let err = manager.validate_token("token", "").await.unwrap_err();
        assert!(matches!(err, GuardError::InvalidIdentifier { .. }));
    }

    #[tokio::test]
    async fn test_expired_entry_is_lazily_deleted() {
        let (manager, store) = manager();

        // An entry whose own expiry passed while its store TTL is still
        // live (e.g. written by a process with a longer configured TTL).
        let entry = CsrfTokenEntry {
            user_id: "alice".to_string(),
            expires_at: OffsetDateTime::now_utc() - Duration::from_secs(5),
        };
        let value = serde_json::to_string(&entry).unwrap();
        store
            .set("csrf:stale-token", &value, Duration::from_secs(3600))
            .await
            .unwrap();

        let err = manager
            .validate_token("stale-token", "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, GuardError::TokenExpired));

        // The lazy delete removed the entry; a second attempt sees nothing.
        let err = manager
            .validate_token("stale-token", "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, GuardError::UnknownToken));
    }

    #[tokio::test]
    async fn test_invalidate_token() {
        let (manager, _) = manager();

        let token = manager.generate_token("alice").await.unwrap();
        manager.invalidate_token(&token).await.unwrap();

        let err = manager.validate_token(&token, "alice").await.unwrap_err();
        assert!(matches!(err, GuardError::UnknownToken));
    }

    #[tokio::test]
    async fn test_invalidate_user_tokens_spares_other_users() {
        let (manager, _) = manager();

        let alice_1 = manager.generate_token("alice").await.unwrap();
        let alice_2 = manager.generate_token("alice").await.unwrap();
        let bob = manager.generate_token("bob").await.unwrap();

        let removed = manager.invalidate_user_tokens("alice").await.unwrap();
        assert_eq!(removed, 2);

        assert!(manager.validate_token(&alice_1, "alice").await.is_err());
        assert!(manager.validate_token(&alice_2, "alice").await.is_err());
        manager.validate_token(&bob, "bob").await.unwrap();
    }

    #[tokio::test]
    async fn test_validate_fails_open_on_backend_error() {
        let manager = CsrfManager::new(Arc::new(FailingStore), &CsrfConfig::default());
        manager.validate_token("any-token", "alice").await.unwrap();
    }

    #[tokio::test]
    async fn test_generate_propagates_backend_error() {
        let manager = CsrfManager::new(Arc::new(FailingStore), &CsrfConfig::default());
        let err = manager.generate_token("alice").await.unwrap_err();
        assert!(err.is_store_error());
    }

    #[test]
    fn test_verify_double_submit() {
        CsrfManager::verify_double_submit("tok", "tok").unwrap();

        let err = CsrfManager::verify_double_submit("tok", "other").unwrap_err();
        assert!(matches!(err, GuardError::HeaderMismatch));

        assert!(matches!(
            CsrfManager::verify_double_submit("", "tok").unwrap_err(),
            GuardError::MissingToken
        ));
        assert!(matches!(
            CsrfManager::verify_double_submit("tok", "").unwrap_err(),
            GuardError::MissingToken
        ));
        assert!(matches!(
            CsrfManager::verify_double_submit("", "").unwrap_err(),
            GuardError::MissingToken
        ));
    }

    #[test]
    fn test_generate_secret_shape() {
        let secret = generate_secret();
        assert_eq!(secret.len(), 64);
        assert!(hex::decode(&secret).is_ok());
        assert_ne!(secret, generate_secret());
    }

    #[tokio::test]
    async fn test_configured_secret_is_used() {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let config = CsrfConfig {
            secret: Some("0123456789abcdef0123456789abcdef".to_string()),
            ..CsrfConfig::default()
        };
        let manager = CsrfManager::new(store, &config);

        let token = manager.generate_token("alice").await.unwrap();
        manager.validate_token(&token, "alice").await.unwrap();
    }
}
