// ABOUTME: Backend factory selecting Redis or in-memory storage from the configured URL
// ABOUTME: Enum dispatch keeps the connection manager monomorphic over one pool type
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::memory::{InMemoryConnection, InMemoryPool};
use super::redis::{RedisConnection, RedisPool};
use super::{BackendConnection, BackendInfo, BackendPool, WindowCount};
use crate::config::{BackendConfig, BackendKind};
use crate::errors::AppResult;
use std::time::Duration;
use tracing::info;

/// Unified backend pool
#[derive(Debug, Clone)]
pub enum Backend {
    /// Redis server
    Redis(RedisPool),
    /// Process-local store
    Memory(InMemoryPool),
}

impl Backend {
    /// Human-readable backend name for logs and health reports
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Redis(_) => "redis",
            Self::Memory(_) => "memory",
        }
    }
}

impl From<RedisPool> for Backend {
    fn from(pool: RedisPool) -> Self {
        Self::Redis(pool)
    }
}

impl From<InMemoryPool> for Backend {
    fn from(pool: InMemoryPool) -> Self {
        Self::Memory(pool)
    }
}

#[async_trait::async_trait]
impl BackendPool for Backend {
    type Connection = Connection;

    async fn open(config: &BackendConfig) -> AppResult<Self> {
        let backend = match config.kind()? {
            BackendKind::Redis => Self::Redis(RedisPool::open(config).await?),
            BackendKind::Memory => Self::Memory(InMemoryPool::open(config).await?),
        };
        info!("Initialized {} backend", backend.name());
        Ok(backend)
    }

    async fn checkout(&self) -> AppResult<Connection> {
        match self {
            Self::Redis(pool) => pool.checkout().await.map(Connection::Redis),
            Self::Memory(pool) => pool.checkout().await.map(Connection::Memory),
        }
    }

    async fn close(&self) {
        match self {
            Self::Redis(pool) => pool.close().await,
            Self::Memory(pool) => pool.close().await,
        }
    }
}

/// Connection checked out of a [`Backend`]
#[derive(Debug)]
pub enum Connection {
    /// Redis connection
    Redis(RedisConnection),
    /// In-memory connection
    Memory(InMemoryConnection),
}

#[async_trait::async_trait]
impl BackendConnection for Connection {
    async fn ping(&mut self) -> AppResult<()> {
        match self {
            Self::Redis(conn) => conn.ping().await,
            Self::Memory(conn) => conn.ping().await,
        }
    }

    async fn get(&mut self, key: &str) -> AppResult<Option<Vec<u8>>> {
        match self {
            Self::Redis(conn) => conn.get(key).await,
            Self::Memory(conn) => conn.get(key).await,
        }
    }

    async fn get_many(&mut self, keys: &[String]) -> AppResult<Vec<Option<Vec<u8>>>> {
        match self {
            Self::Redis(conn) => conn.get_many(keys).await,
            Self::Memory(conn) => conn.get_many(keys).await,
        }
    }

    async fn set_with_expiry(&mut self, key: &str, value: &[u8], ttl: Duration) -> AppResult<()> {
        match self {
            Self::Redis(conn) => conn.set_with_expiry(key, value, ttl).await,
            Self::Memory(conn) => conn.set_with_expiry(key, value, ttl).await,
        }
    }

    async fn expiry(&mut self, key: &str) -> AppResult<Option<Duration>> {
        match self {
            Self::Redis(conn) => conn.expiry(key).await,
            Self::Memory(conn) => conn.expiry(key).await,
        }
    }

    async fn delete(&mut self, key: &str) -> AppResult<bool> {
        match self {
            Self::Redis(conn) => conn.delete(key).await,
            Self::Memory(conn) => conn.delete(key).await,
        }
    }

    async fn delete_many(&mut self, keys: &[String]) -> AppResult<u64> {
        match self {
            Self::Redis(conn) => conn.delete_many(keys).await,
            Self::Memory(conn) => conn.delete_many(keys).await,
        }
    }

    async fn scan_prefix(&mut self, prefix: &str) -> AppResult<Vec<String>> {
        match self {
            Self::Redis(conn) => conn.scan_prefix(prefix).await,
            Self::Memory(conn) => conn.scan_prefix(prefix).await,
        }
    }

    async fn increment_window(&mut self, key: &str, window: Duration) -> AppResult<WindowCount> {
        match self {
            Self::Redis(conn) => conn.increment_window(key, window).await,
            Self::Memory(conn) => conn.increment_window(key, window).await,
        }
    }

    async fn info(&mut self) -> AppResult<BackendInfo> {
        match self {
            Self::Redis(conn) => conn.info().await,
            Self::Memory(conn) => conn.info().await,
        }
    }
}
