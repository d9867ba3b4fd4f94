// ABOUTME: Process-local in-memory backend with TTL expiry and fixed-window counters
// ABOUTME: Named stores are shared per URL so a rebuilt pool sees the same data
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{BackendConnection, BackendInfo, BackendPool, WindowCount};
use crate::config::{BackendConfig, BackendKind};
use crate::errors::{AppError, AppResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, RwLock, Semaphore};
use tracing::{debug, info};

const SECS_PER_DAY: u64 = 86_400;

/// Stored value with expiration
///
/// A TTL too large for the monotonic clock leaves the entry without expiry.
#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: Vec<u8>, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now().checked_add(ttl),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }

    fn remaining_ttl(&self) -> Option<Duration> {
        self.expires_at
            .and_then(|at| at.checked_duration_since(Instant::now()))
    }
}

/// Shared key space behind one `memory://` URL
#[derive(Debug)]
struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
    reachable: AtomicBool,
    started: Instant,
}

impl MemoryStore {
    fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            reachable: AtomicBool::new(true),
            started: Instant::now(),
        }
    }
}

fn registry() -> &'static Mutex<HashMap<String, Arc<MemoryStore>>> {
    static STORES: OnceLock<Mutex<HashMap<String, Arc<MemoryStore>>>> = OnceLock::new();
    STORES.get_or_init(|| Mutex::new(HashMap::new()))
}

fn unreachable_error(operation: &str) -> AppError {
    AppError::connection(format!("In-memory backend unreachable during {operation}"))
}

/// Bounded pool over a process-local key space
///
/// Pools opened from the same `memory://` URL share one key space for the
/// life of the process. [`InMemoryPool::isolated`] builds a private one.
#[derive(Debug, Clone)]
pub struct InMemoryPool {
    store: Arc<MemoryStore>,
    permits: Arc<Semaphore>,
    max_size: usize,
}

impl InMemoryPool {
    /// Create a pool over a fresh key space shared with nothing else
    #[must_use]
    pub fn isolated(pool_size: usize) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), pool_size)
    }

    fn with_store(store: Arc<MemoryStore>, pool_size: usize) -> Self {
        let max_size = pool_size.max(1);
        Self {
            store,
            permits: Arc::new(Semaphore::new(max_size)),
            max_size,
        }
    }

    /// Simulate the backend going away or coming back
    ///
    /// While unreachable every operation fails with a retryable connection error.
    pub fn set_reachable(&self, reachable: bool) {
        self.store.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Connections currently available for checkout
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

#[async_trait::async_trait]
impl BackendPool for InMemoryPool {
    type Connection = InMemoryConnection;

    async fn open(config: &BackendConfig) -> AppResult<Self> {
        if config.kind()? != BackendKind::Memory {
            return Err(AppError::config_invalid(format!(
                "In-memory backend cannot serve URL '{}'",
                config.redacted_url()
            )));
        }

        let store = {
            let mut stores = registry()
                .lock()
                .map_err(|_| AppError::internal("In-memory backend registry lock poisoned"))?;
            Arc::clone(
                stores
                    .entry(config.url.clone())
                    .or_insert_with(|| Arc::new(MemoryStore::new())),
            )
        };

        info!(
            "In-memory pool ready for {} (size={})",
            config.url, config.pool_size
        );
        Ok(Self::with_store(store, config.pool_size))
    }

    async fn checkout(&self) -> AppResult<InMemoryConnection> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| AppError::connection("In-memory pool is closed"))?;

        if !self.store.reachable.load(Ordering::SeqCst) {
            return Err(unreachable_error("checkout"));
        }

        Ok(InMemoryConnection {
            store: Arc::clone(&self.store),
            permits: Arc::clone(&self.permits),
            max_size: self.max_size,
            _permit: permit,
        })
    }

    async fn close(&self) {
        self.permits.close();
        debug!("In-memory pool closed");
    }
}

/// A connection checked out of an [`InMemoryPool`]
#[derive(Debug)]
pub struct InMemoryConnection {
    store: Arc<MemoryStore>,
    permits: Arc<Semaphore>,
    max_size: usize,
    _permit: OwnedSemaphorePermit,
}

impl InMemoryConnection {
    fn ensure_reachable(&self, operation: &str) -> AppResult<()> {
        if self.store.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(unreachable_error(operation))
        }
    }

    fn live_value(entries: &HashMap<String, Entry>, key: &str) -> Option<Vec<u8>> {
        entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone())
    }
}

#[async_trait::async_trait]
impl BackendConnection for InMemoryConnection {
    async fn ping(&mut self) -> AppResult<()> {
        self.ensure_reachable("PING")
    }

    async fn get(&mut self, key: &str) -> AppResult<Option<Vec<u8>>> {
        self.ensure_reachable("GET")?;
        let entries = self.store.entries.read().await;
        Ok(Self::live_value(&entries, key))
    }

    async fn get_many(&mut self, keys: &[String]) -> AppResult<Vec<Option<Vec<u8>>>> {
        self.ensure_reachable("pipelined GET")?;
        let entries = self.store.entries.read().await;
        Ok(keys
            .iter()
            .map(|key| Self::live_value(&entries, key))
            .collect())
    }

    async fn set_with_expiry(&mut self, key: &str, value: &[u8], ttl: Duration) -> AppResult<()> {
        self.ensure_reachable("SETEX")?;
        self.store
            .entries
            .write()
            .await
            .insert(key.to_owned(), Entry::new(value.to_vec(), ttl));
        Ok(())
    }

    async fn expiry(&mut self, key: &str) -> AppResult<Option<Duration>> {
        self.ensure_reachable("TTL")?;
        let entries = self.store.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .and_then(Entry::remaining_ttl))
    }

    async fn delete(&mut self, key: &str) -> AppResult<bool> {
        self.ensure_reachable("DEL")?;
        let removed = self.store.entries.write().await.remove(key);
        Ok(removed.is_some_and(|entry| !entry.is_expired()))
    }

    async fn delete_many(&mut self, keys: &[String]) -> AppResult<u64> {
        self.ensure_reachable("DEL")?;
        let mut entries = self.store.entries.write().await;
        let removed = keys
            .iter()
            .filter_map(|key| entries.remove(key))
            .filter(|entry| !entry.is_expired())
            .count();
        Ok(removed as u64)
    }

    async fn scan_prefix(&mut self, prefix: &str) -> AppResult<Vec<String>> {
        self.ensure_reachable("SCAN")?;
        let mut entries = self.store.entries.write().await;
        entries.retain(|_, entry| !entry.is_expired());
        Ok(entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn increment_window(&mut self, key: &str, window: Duration) -> AppResult<WindowCount> {
        self.ensure_reachable("rate limit pipeline")?;
        let window = window.max(Duration::from_secs(1));
        let mut entries = self.store.entries.write().await;

        let entry = entries
            .entry(key.to_owned())
            .and_modify(|entry| {
                if entry.is_expired() {
                    *entry = Entry::new(b"0".to_vec(), window);
                }
            })
            .or_insert_with(|| Entry::new(b"0".to_vec(), window));

        let current: u64 = std::str::from_utf8(&entry.value)
            .ok()
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| {
                AppError::storage(format!("Value at '{key}' is not an integer counter"))
            })?;
        let count = current.saturating_add(1);
        entry.value = count.to_string().into_bytes();

        let remaining = entry.remaining_ttl().unwrap_or_default();
        let ttl_secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
        Ok(WindowCount { count, ttl_secs })
    }

    async fn info(&mut self) -> AppResult<BackendInfo> {
        self.ensure_reachable("INFO")?;
        let used_bytes: usize = self
            .store
            .entries
            .read()
            .await
            .iter()
            .map(|(key, entry)| key.len() + entry.value.len())
            .sum();

        Ok(BackendInfo {
            version: Some(format!("memory-{}", env!("CARGO_PKG_VERSION"))),
            connected_clients: Some(
                self.max_size
                    .saturating_sub(self.permits.available_permits()) as u64,
            ),
            used_memory: Some(format!("{used_bytes}B")),
            uptime_days: Some(self.store.started.elapsed().as_secs() / SECS_PER_DAY),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_increment_window_creates_and_counts() {
        let pool = InMemoryPool::isolated(2);
        let mut conn = pool.checkout().await.unwrap();

        let first = conn
            .increment_window("rate_limit:a", Duration::from_secs(60))
            .await
            .unwrap();
        let second = conn
            .increment_window("rate_limit:a", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(first.count, 1);
        assert_eq!(second.count, 2);
        assert!(second.ttl_secs <= 60 && second.ttl_secs > 0);
    }

    #[tokio::test]
    async fn test_expired_entries_are_invisible() {
        let pool = InMemoryPool::isolated(1);
        let mut conn = pool.checkout().await.unwrap();
        conn.set_with_expiry("k", b"v", Duration::from_millis(20))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(conn.get("k").await.unwrap(), None);
        assert!(conn.scan_prefix("k").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expiry_reports_remaining_lifetime() {
        let pool = InMemoryPool::isolated(1);
        let mut conn = pool.checkout().await.unwrap();
        conn.set_with_expiry("k", b"v", Duration::from_secs(120))
            .await
            .unwrap();

        let remaining = conn.expiry("k").await.unwrap().unwrap();
        assert!(remaining > Duration::from_secs(119) && remaining <= Duration::from_secs(120));
        assert_eq!(conn.expiry("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unrepresentable_ttl_never_expires() {
        let pool = InMemoryPool::isolated(1);
        let mut conn = pool.checkout().await.unwrap();
        conn.set_with_expiry("k", b"v", Duration::from_secs(u64::MAX))
            .await
            .unwrap();

        assert_eq!(conn.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(conn.expiry("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unreachable_store_fails_with_retryable_error() {
        let pool = InMemoryPool::isolated(1);
        pool.set_reachable(false);
        let err = pool.checkout().await.err().unwrap();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_closed_pool_refuses_checkout() {
        let pool = InMemoryPool::isolated(1);
        pool.close().await;
        assert!(pool.checkout().await.is_err());
    }
}
