// ABOUTME: Redis backend with a bounded, lazily-filled connection pool
// ABOUTME: Classifies Redis failures into retryable connection/timeout errors and terminal ones
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{BackendConnection, BackendInfo, BackendPool, WindowCount};
use crate::config::{BackendConfig, BackendKind};
use crate::constants::redis::SCAN_BATCH_SIZE;
use crate::errors::{AppError, AppResult};
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, ErrorKind, InfoDict, RedisError, RedisResult};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

/// Map a Redis error onto the application taxonomy
///
/// Connection refusals, dropped sockets and I/O failures become retryable
/// connection errors, socket timeouts become retryable timeout errors, and
/// everything else is terminal.
pub(crate) fn classify(operation: &str, err: RedisError) -> AppError {
    let message = format!("Redis {operation} failed: {err}");
    if err.is_timeout() {
        AppError::timeout(message).with_source(err)
    } else if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
        AppError::connection(message).with_source(err)
    } else if err.kind() == ErrorKind::InvalidClientConfig {
        AppError::config_invalid(message).with_source(err)
    } else {
        AppError::storage(message).with_source(err)
    }
}

struct PoolInner {
    client: redis::Client,
    manager_config: ConnectionManagerConfig,
    idle: Mutex<Vec<ConnectionManager>>,
    permits: Arc<Semaphore>,
    redacted_url: String,
}

/// Bounded pool of Redis connections
///
/// Connections are opened on demand up to `pool_size`; a checkout beyond
/// that bound waits for a connection to be returned. Each pooled
/// `ConnectionManager` carries its own socket timeouts and reconnect policy.
#[derive(Clone)]
pub struct RedisPool {
    inner: Arc<PoolInner>,
}

impl std::fmt::Debug for RedisPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisPool").finish_non_exhaustive()
    }
}

impl RedisPool {
    async fn connect(&self) -> AppResult<ConnectionManager> {
        debug!(url = %self.inner.redacted_url, "Opening Redis connection");
        ConnectionManager::new_with_config(
            self.inner.client.clone(),
            self.inner.manager_config.clone(),
        )
        .await
        .map_err(|e| classify("connect", e))
    }
}

#[async_trait::async_trait]
impl BackendPool for RedisPool {
    type Connection = RedisConnection;

    async fn open(config: &BackendConfig) -> AppResult<Self> {
        if config.kind()? != BackendKind::Redis {
            return Err(AppError::config_invalid(format!(
                "Redis backend cannot serve URL '{}'",
                config.redacted_url()
            )));
        }

        let client = redis::Client::open(config.url.as_str()).map_err(|e| classify("open", e))?;

        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(config.connection_timeout())
            .set_response_timeout(config.response_timeout())
            .set_number_of_retries(config.reconnection_retries)
            .set_exponent_base(config.retry_exponent_base)
            .set_max_delay(config.max_retry_delay_ms);

        info!(
            "Redis pool ready for {} (size={}, timeout={}s, response_timeout={}s)",
            config.redacted_url(),
            config.pool_size,
            config.connection_timeout_secs,
            config.response_timeout_secs
        );

        Ok(Self {
            inner: Arc::new(PoolInner {
                client,
                manager_config,
                idle: Mutex::new(Vec::with_capacity(config.pool_size)),
                permits: Arc::new(Semaphore::new(config.pool_size)),
                redacted_url: config.redacted_url(),
            }),
        })
    }

    async fn checkout(&self) -> AppResult<RedisConnection> {
        let permit = Arc::clone(&self.inner.permits)
            .acquire_owned()
            .await
            .map_err(|_| AppError::connection("Redis pool is closed"))?;

        let idle = self.inner.idle.lock().ok().and_then(|mut idle| idle.pop());
        let manager = match idle {
            Some(manager) => manager,
            None => self.connect().await?,
        };

        Ok(RedisConnection {
            manager,
            pool: Arc::clone(&self.inner),
            discard: false,
            _permit: permit,
        })
    }

    async fn close(&self) {
        self.inner.permits.close();
        let dropped = self
            .inner
            .idle
            .lock()
            .map(|mut idle| idle.drain(..).count())
            .unwrap_or_default();
        info!(
            "Redis pool for {} closed ({} idle connections dropped)",
            self.inner.redacted_url, dropped
        );
    }
}

/// A Redis connection checked out of a [`RedisPool`]
///
/// Returned to the pool on drop unless the pool was closed or the connection
/// saw a connection-tier failure.
pub struct RedisConnection {
    manager: ConnectionManager,
    pool: Arc<PoolInner>,
    discard: bool,
    _permit: OwnedSemaphorePermit,
}

impl std::fmt::Debug for RedisConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisConnection").finish_non_exhaustive()
    }
}

impl RedisConnection {
    fn check<T>(&mut self, operation: &str, result: RedisResult<T>) -> AppResult<T> {
        result.map_err(|e| {
            let err = classify(operation, e);
            if err.is_retryable() {
                self.discard = true;
            }
            err
        })
    }
}

impl Drop for RedisConnection {
    fn drop(&mut self) {
        if self.discard || self.pool.permits.is_closed() {
            return;
        }
        if let Ok(mut idle) = self.pool.idle.lock() {
            idle.push(self.manager.clone());
        }
    }
}

#[async_trait::async_trait]
impl BackendConnection for RedisConnection {
    async fn ping(&mut self) -> AppResult<()> {
        let result: RedisResult<String> = redis::cmd("PING").query_async(&mut self.manager).await;
        let response = self.check("PING", result)?;

        if response == "PONG" {
            Ok(())
        } else {
            Err(AppError::storage(format!(
                "Unexpected PING response '{response}'"
            )))
        }
    }

    async fn get(&mut self, key: &str) -> AppResult<Option<Vec<u8>>> {
        let result: RedisResult<Option<Vec<u8>>> = self.manager.get(key).await;
        self.check("GET", result)
    }

    async fn get_many(&mut self, keys: &[String]) -> AppResult<Vec<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for key in keys {
            pipe.get(key);
        }
        let result: RedisResult<Vec<Option<Vec<u8>>>> = pipe.query_async(&mut self.manager).await;
        self.check("pipelined GET", result)
    }

    async fn set_with_expiry(&mut self, key: &str, value: &[u8], ttl: Duration) -> AppResult<()> {
        let result: RedisResult<()> = self.manager.set_ex(key, value, ttl.as_secs().max(1)).await;
        self.check("SETEX", result)
    }

    async fn expiry(&mut self, key: &str) -> AppResult<Option<Duration>> {
        let result: RedisResult<i64> = self.manager.ttl(key).await;
        // -2 for a missing key, -1 for a key without expiry
        let ttl = self.check("TTL", result)?;
        Ok(u64::try_from(ttl).ok().map(Duration::from_secs))
    }

    async fn delete(&mut self, key: &str) -> AppResult<bool> {
        let result: RedisResult<u64> = self.manager.del(key).await;
        Ok(self.check("DEL", result)? > 0)
    }

    async fn delete_many(&mut self, keys: &[String]) -> AppResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let result: RedisResult<u64> = self.manager.del(keys).await;
        self.check("DEL", result)
    }

    async fn scan_prefix(&mut self, prefix: &str) -> AppResult<Vec<String>> {
        let pattern = format!("{prefix}*");
        let mut found = Vec::new();
        let mut cursor = 0u64;

        loop {
            let result: RedisResult<(u64, Vec<String>)> = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH_SIZE)
                .query_async(&mut self.manager)
                .await;
            let (next_cursor, keys) = self.check("SCAN", result)?;
            found.extend(keys);

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        // SCAN may return a key more than once across iterations
        found.sort_unstable();
        found.dedup();
        Ok(found)
    }

    async fn increment_window(&mut self, key: &str, window: Duration) -> AppResult<WindowCount> {
        let window_secs = window.as_secs().max(1);

        let result: RedisResult<(u64, i64)> = redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(key)
            .arg(0)
            .arg("EX")
            .arg(window_secs)
            .arg("NX")
            .ignore()
            .incr(key, 1)
            .ttl(key)
            .query_async(&mut self.manager)
            .await;
        let (count, ttl) = self.check("rate limit pipeline", result)?;

        if ttl < 0 {
            warn!(key, "Rate limit counter had no expiry, re-arming window");
            let result: RedisResult<bool> = redis::cmd("EXPIRE")
                .arg(key)
                .arg(window_secs)
                .query_async(&mut self.manager)
                .await;
            self.check("EXPIRE", result)?;
        }

        let ttl_secs = u64::try_from(ttl)
            .ok()
            .filter(|secs| *secs > 0)
            .unwrap_or(window_secs);
        Ok(WindowCount { count, ttl_secs })
    }

    async fn info(&mut self) -> AppResult<BackendInfo> {
        let result: RedisResult<InfoDict> = redis::cmd("INFO").query_async(&mut self.manager).await;
        let dict = self.check("INFO", result)?;

        Ok(BackendInfo {
            version: dict.get("redis_version"),
            connected_clients: dict.get("connected_clients"),
            used_memory: dict.get("used_memory_human"),
            uptime_days: dict.get("uptime_in_days"),
        })
    }
}
