//! In-process ephemeral store.
//!
//! A single read/write lock around a `HashMap`, with absolute expiry
//! instants stored alongside values. Expiry is enforced twice: every
//! read re-checks the entry's deadline before trusting a hit, and a
//! background sweeper periodically reclaims the memory of entries whose
//! deadline has passed.
//!
//! This backend is the fallback for single-process deployments and for
//! tests; state does not survive a restart and is not shared across
//! processes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::{EphemeralStore, StoreError, StoreResult};

/// A stored value with its absolute expiry instant.
#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

type EntryMap = Arc<RwLock<HashMap<String, Entry>>>;

/// In-process ephemeral store guarded by a read/write lock.
///
/// Reads take the read lock; writes, deletes and the sweeper take the
/// write lock. Lock hold time is bounded by a single map operation
/// except for [`sweep`](MemoryStore::sweep), which is linear in the
/// number of live entries and runs off the request path.
///
/// # Sweeper lifecycle
///
/// The sweeper is an explicit, cancellable background task: call
/// [`start_sweeper`](MemoryStore::start_sweeper) to launch it and
/// [`shutdown`](MemoryStore::shutdown) to stop it; dropping the store
/// aborts it as a backstop, so a test or a terminating process never
/// leaks the task.
pub struct MemoryStore {
    entries: EntryMap,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl MemoryStore {
    /// Creates an empty store without a running sweeper.
    ///
    /// Entries still expire logically at read time; until
    /// [`start_sweeper`](MemoryStore::start_sweeper) is called their
    /// memory is only reclaimed when they are overwritten or deleted.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            sweeper: Mutex::new(None),
        }
    }

    /// Starts the background sweeper, replacing any previous one.
    ///
    /// The task wakes every `interval`, takes the write lock once, and
    /// drops every entry whose expiry has passed. Must be called from
    /// within a tokio runtime.
    pub fn start_sweeper(&self, interval: Duration) {
        let entries = Arc::clone(&self.entries);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; skip it so sweeps
            // happen on interval boundaries.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let swept = sweep_map(&entries);
                if swept > 0 {
                    tracing::debug!(swept, "swept expired ephemeral entries");
                }
            }
        });
        if let Some(previous) = self.sweeper.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Stops the background sweeper if one is running.
    pub fn shutdown(&self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
    }

    /// Removes every expired entry, returning how many were dropped.
    pub fn sweep(&self) -> usize {
        sweep_map(&self.entries)
    }

    /// Number of physically present entries, including expired ones the
    /// sweeper has not reclaimed yet.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if no entries are physically present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

fn sweep_map(entries: &RwLock<HashMap<String, Entry>>) -> usize {
    let now = Instant::now();
    let mut entries = entries.write();
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired(now));
    before - entries.len()
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[async_trait]
impl EphemeralStore for MemoryStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone()))
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now)))
    }

    async fn increment(&self, key: &str, ttl: Duration) -> StoreResult<i64> {
        let mut entries = self.entries.write();
        let now = Instant::now();
        match entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => {
                let current: i64 = entry
                    .value
                    .parse()
                    .map_err(|_| StoreError::non_numeric_value(key))?;
                let next = current + 1;
                entry.value = next.to_string();
                Ok(next)
            }
            _ => {
                // Fresh counter: created at zero, incremented, and given
                // its expiry in one step under the write lock.
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: "1".to_string(),
                        expires_at: now + ttl,
                    },
                );
                Ok(1)
            }
        }
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn ttl_remaining(&self, key: &str) -> StoreResult<Option<Duration>> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.expires_at - now))
    }

    async fn scan_prefix(&self, prefix: &str) -> StoreResult<Vec<(String, String)>> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|(key, entry)| key.starts_with(prefix) && !entry.is_expired(now))
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect())
    }
}
