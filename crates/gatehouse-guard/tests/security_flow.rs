//! End-to-end walk of the security-state layer across a login session,
//! the way the auth middleware drives it: throttle the login endpoint,
//! issue CSRF state on success, revoke everything on logout.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

use gatehouse_guard::{
    CsrfManager, GuardConfig, GuardError, RateLimiter, TokenBlacklist, client_identifier,
};
use gatehouse_store::{EphemeralStore, MemoryStore};

fn store() -> Arc<dyn EphemeralStore> {
    Arc::new(MemoryStore::new())
}

#[tokio::test]
async fn test_login_session_lifecycle() {
    let config = GuardConfig::default();

    // One store instance per component, as deployed.
    let limiter = RateLimiter::new(store(), config.rate_limit.clone());
    let csrf = CsrfManager::new(store(), &config.csrf);
    let blacklist = TokenBlacklist::new(store());

    let client = "203.0.113.7";

    // Two failed password attempts burn budget but stay allowed.
    assert!(limiter.check(client).await.unwrap().allowed);
    assert!(limiter.check(client).await.unwrap().allowed);

    // Third attempt succeeds: forgive the counter, issue CSRF state.
    assert!(limiter.check(client).await.unwrap().allowed);
    limiter.reset(client).await.unwrap();

    let csrf_token = csrf.generate_token("alice").await.unwrap();

    // State-changing request: double-submit plus server-side binding.
    CsrfManager::verify_double_submit(&csrf_token, &csrf_token).unwrap();
    csrf.validate_token(&csrf_token, "alice").await.unwrap();

    // The session's access token is live until logout.
    let access_jti = "jti-alice-session-1";
    assert!(!blacklist.is_revoked(access_jti).await);

    // Logout: revoke the access token for its remaining lifetime and
    // drop the user's CSRF tokens.
    let token_expiry = OffsetDateTime::now_utc() + Duration::from_secs(3600);
    blacklist
        .revoke_token(access_jti, token_expiry)
        .await
        .unwrap();
    let removed = csrf.invalidate_user_tokens("alice").await.unwrap();
    assert_eq!(removed, 1);

    // Replayed credentials after logout are dead.
    assert!(blacklist.is_revoked(access_jti).await);
    assert!(matches!(
        csrf.validate_token(&csrf_token, "alice").await.unwrap_err(),
        GuardError::UnknownToken
    ));
}

#[tokio::test]
async fn test_lockout_after_repeated_failures() {
    let config = GuardConfig::default();
    let limiter = RateLimiter::new(store(), config.rate_limit.clone());

    let mut headers = http::HeaderMap::new();
    headers.insert("x-real-ip", "198.51.100.4".parse().unwrap());
    let client = client_identifier(&headers);
    assert_eq!(client, "198.51.100.4");

    for _ in 0..5 {
        assert!(limiter.check(&client).await.unwrap().allowed);
    }

    let denied = limiter.check(&client).await.unwrap();
    assert!(!denied.allowed);

    // The caller turns the denial into a retry-after signal.
    let err = denied.as_error().unwrap();
    assert!(matches!(err, GuardError::RateLimited { .. }));

    // A different client is unaffected.
    assert!(limiter.check("192.0.2.9").await.unwrap().allowed);
}

#[tokio::test]
async fn test_components_do_not_share_namespaces() {
    // All three components over one shared backend, as with Redis.
    let shared = store();
    let config = GuardConfig::default();

    let limiter = RateLimiter::new(shared.clone(), config.rate_limit.clone());
    let csrf = CsrfManager::new(shared.clone(), &config.csrf);
    let blacklist = TokenBlacklist::new(shared.clone());

    let token = csrf.generate_token("alice").await.unwrap();
    blacklist
        .revoke_token("alice", OffsetDateTime::now_utc() + Duration::from_secs(60))
        .await
        .unwrap();
    limiter.check("alice").await.unwrap();

    // Same logical identifier everywhere, no cross-talk.
    csrf.validate_token(&token, "alice").await.unwrap();
    assert!(blacklist.is_revoked("alice").await);
    assert_eq!(limiter.check("alice").await.unwrap().remaining, 3);

    // Bulk CSRF invalidation scans only its own namespace.
    csrf.invalidate_user_tokens("alice").await.unwrap();
    assert!(blacklist.is_revoked("alice").await);
}
