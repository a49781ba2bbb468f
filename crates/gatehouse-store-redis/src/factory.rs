//! Backend selection.
//!
//! The choice between the shared Redis backend and the in-process
//! fallback is made once, at construction time, and never changes for
//! the life of the process. There is no runtime failover: a process
//! started against Redis keeps talking to Redis (and fails open when it
//! is unreachable), a process started without one keeps its state to
//! itself.

use std::sync::Arc;
use std::time::Duration;

use gatehouse_store::{EphemeralStore, MemoryStore, StoreResult};

use crate::RedisStore;

/// Selects the backing store for one policy component.
///
/// With a Redis URL configured, all operations route to the shared
/// backend. Without one, an in-process [`MemoryStore`] is created and
/// its sweeper started with `sweep_interval`.
///
/// Must be called from within a tokio runtime (the sweeper is a spawned
/// task).
///
/// # Errors
///
/// Returns an error if the Redis pool cannot be created from the URL.
pub fn select_backend(
    redis_url: Option<&str>,
    sweep_interval: Duration,
) -> StoreResult<Arc<dyn EphemeralStore>> {
    match redis_url {
        Some(url) => {
            let store = RedisStore::connect(url)?;
            tracing::info!("ephemeral security state backed by redis");
            Ok(Arc::new(store))
        }
        None => {
            let store = Arc::new(MemoryStore::new());
            store.start_sweeper(sweep_interval);
            tracing::info!(
                sweep_interval_secs = sweep_interval.as_secs(),
                "ephemeral security state backed by in-process store"
            );
            Ok(store)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_select_backend_without_url_is_local() {
        let store = select_backend(None, Duration::from_secs(300)).unwrap();

        store
            .set("k", "v", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_select_backend_with_url_builds_pool() {
        // Pool creation is lazy; no live Redis is needed here.
        assert!(select_backend(Some("redis://127.0.0.1:6379"), Duration::from_secs(300)).is_ok());
    }
}
