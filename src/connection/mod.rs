// ABOUTME: Connection manager owning the shared backend pool and the retry policy
// ABOUTME: Acquires liveness-checked connections and runs operations with bounded backoff
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Connection Management
//!
//! [`ConnectionManager`] is the single owner of the backend pool. It is built
//! once at startup with [`ConnectionManager::open`] and shared by reference
//! (usually behind an `Arc`) between the conversation store, the rate limiter,
//! and health reporting.
//!
//! Every checkout is proven live with a `PING` before it is handed out.
//! Connection refusals and timeouts are retried under a [`RetryPolicy`];
//! anything else surfaces immediately.
//!
//! ```rust,no_run
//! use chat_store::config::BackendConfig;
//! use chat_store::connection::ConnectionManager;
//! use chat_store::backend::BackendConnection;
//! # async fn example() -> chat_store::errors::AppResult<()> {
//! let manager = ConnectionManager::open(BackendConfig::new("redis://127.0.0.1:6379")).await?;
//! let value = manager
//!     .execute("GET", |mut conn| async move { conn.get("conversation:abc").await })
//!     .await?;
//! # let _ = value;
//! # Ok(())
//! # }
//! ```

/// Exponential backoff policy
pub mod retry;

pub use retry::RetryPolicy;

use crate::backend::{Backend, BackendConnection, BackendPool};
use crate::config::BackendConfig;
use crate::errors::AppResult;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Owner of the backend pool
#[derive(Debug)]
pub struct ConnectionManager<P: BackendPool = Backend> {
    config: BackendConfig,
    policy: RetryPolicy,
    pool: RwLock<Option<Arc<P>>>,
}

impl ConnectionManager<Backend> {
    /// Validate `config` and construct the pool it describes
    ///
    /// No connection is opened here; the first [`acquire`](Self::acquire)
    /// opens one lazily.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URL is empty, malformed, or uses
    /// an unsupported scheme
    pub async fn open(config: BackendConfig) -> AppResult<Self> {
        config.validate()?;
        let pool = Backend::open(&config).await?;
        Ok(Self::with_pool(config, pool))
    }
}

impl<P: BackendPool> ConnectionManager<P> {
    /// Wrap an already-built pool
    pub fn with_pool(config: BackendConfig, pool: P) -> Self {
        Self {
            policy: RetryPolicy::from_config(&config),
            config,
            pool: RwLock::new(Some(Arc::new(pool))),
        }
    }

    /// Replace the retry policy
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Backend configuration this manager was built from
    #[must_use]
    pub const fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Retry policy applied to acquisition and operations
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Whether a pool is currently held
    pub async fn is_open(&self) -> bool {
        self.pool.read().await.is_some()
    }

    async fn current_pool(&self) -> AppResult<Arc<P>> {
        if let Some(pool) = self.pool.read().await.as_ref() {
            return Ok(Arc::clone(pool));
        }

        let mut slot = self.pool.write().await;
        if let Some(pool) = slot.as_ref() {
            return Ok(Arc::clone(pool));
        }

        info!(
            "Rebuilding backend pool for {}",
            self.config.redacted_url()
        );
        let pool = Arc::new(P::open(&self.config).await?);
        *slot = Some(Arc::clone(&pool));
        drop(slot);
        Ok(pool)
    }

    async fn acquire_once(&self) -> AppResult<P::Connection> {
        let pool = self.current_pool().await?;
        let mut conn = pool.checkout().await?;
        conn.ping().await?;
        debug!("Acquired backend connection");
        Ok(conn)
    }

    /// Check out a live connection, retrying transient failures
    ///
    /// # Errors
    ///
    /// Returns the last connection or timeout error once the retry policy
    /// is exhausted
    pub async fn acquire(&self) -> AppResult<P::Connection> {
        self.policy
            .retry("acquire", move || self.acquire_once())
            .await
    }

    /// Run one backend operation on a fresh connection under the retry policy
    ///
    /// `f` may be invoked more than once, each time with a newly acquired
    /// connection.
    ///
    /// # Errors
    ///
    /// Returns the first terminal error from `f`, or the last retryable one
    /// once the retry policy is exhausted
    pub async fn execute<T, F, Fut>(&self, operation: &str, f: F) -> AppResult<T>
    where
        F: Fn(P::Connection) -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let f = &f;
        self.policy
            .retry(operation, move || async move {
                let conn = self.acquire_once().await?;
                f(conn).await
            })
            .await
    }

    /// Disconnect every pooled connection and drop the pool
    ///
    /// A later [`acquire`](Self::acquire) rebuilds the pool from the
    /// configured URL.
    pub async fn close(&self) {
        let pool = self.pool.write().await.take();
        if let Some(pool) = pool {
            pool.close().await;
            info!("Backend connection pool closed");
        }
    }
}
