//! Shared test doubles.

use std::time::Duration;

use async_trait::async_trait;

use gatehouse_store::{EphemeralStore, StoreError, StoreResult};

/// A store whose every operation fails, for exercising fail-open paths.
pub struct FailingStore;

#[async_trait]
impl EphemeralStore for FailingStore {
    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> StoreResult<()> {
        Err(StoreError::backend("injected failure"))
    }

    async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
        Err(StoreError::backend("injected failure"))
    }

    async fn exists(&self, _key: &str) -> StoreResult<bool> {
        Err(StoreError::backend("injected failure"))
    }

    async fn increment(&self, _key: &str, _ttl: Duration) -> StoreResult<i64> {
        Err(StoreError::backend("injected failure"))
    }

    async fn delete(&self, _key: &str) -> StoreResult<()> {
        Err(StoreError::backend("injected failure"))
    }

    async fn ttl_remaining(&self, _key: &str) -> StoreResult<Option<Duration>> {
        Err(StoreError::backend("injected failure"))
    }

    async fn scan_prefix(&self, _prefix: &str) -> StoreResult<Vec<(String, String)>> {
        Err(StoreError::backend("injected failure"))
    }
}
