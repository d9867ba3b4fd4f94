// ABOUTME: Storage backend abstraction with pooled connections and pluggable implementations
// ABOUTME: Redis for shared deployments, in-memory for development and tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Backend selection by URL scheme
pub mod factory;
/// Process-local in-memory backend
pub mod memory;
/// Redis backend with a bounded connection pool
pub mod redis;

use crate::config::BackendConfig;
use crate::errors::AppResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use factory::{Backend, Connection};

/// Result of incrementing a fixed-window counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    /// Counter value after the increment
    pub count: u64,
    /// Seconds until the window expires
    pub ttl_secs: u64,
}

/// Server-side introspection for health reporting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendInfo {
    /// Server version string
    pub version: Option<String>,
    /// Number of connected clients
    pub connected_clients: Option<u64>,
    /// Human-readable memory usage
    pub used_memory: Option<String>,
    /// Server uptime in days
    pub uptime_days: Option<u64>,
}

/// A bounded pool of backend connections
///
/// Implementations hand out at most their configured number of live
/// connections; further checkouts wait until one is returned.
#[async_trait::async_trait]
pub trait BackendPool: Send + Sync + Sized + 'static {
    /// Connection type handed out by this pool
    type Connection: BackendConnection;

    /// Build the pool for `config` without opening any connection
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URL cannot be used by this backend
    async fn open(config: &BackendConfig) -> AppResult<Self>;

    /// Check out a connection, opening one lazily if none is idle
    ///
    /// # Errors
    ///
    /// Returns a connection or timeout error if the backend cannot be reached
    async fn checkout(&self) -> AppResult<Self::Connection>;

    /// Disconnect every idle connection and refuse further checkouts
    async fn close(&self);
}

/// A single checked-out backend connection
///
/// The connection returns to its pool when dropped.
#[async_trait::async_trait]
pub trait BackendConnection: Send + 'static {
    /// Prove the connection is live
    async fn ping(&mut self) -> AppResult<()>;

    /// Fetch the raw bytes stored under `key`
    async fn get(&mut self, key: &str) -> AppResult<Option<Vec<u8>>>;

    /// Fetch many keys in a single round-trip, preserving order
    async fn get_many(&mut self, keys: &[String]) -> AppResult<Vec<Option<Vec<u8>>>>;

    /// Store `value` under `key`, expiring after `ttl`
    async fn set_with_expiry(&mut self, key: &str, value: &[u8], ttl: Duration) -> AppResult<()>;

    /// Remaining lifetime of `key`
    ///
    /// `None` when the key is absent or has no expiry.
    async fn expiry(&mut self, key: &str) -> AppResult<Option<Duration>>;

    /// Delete one key, reporting whether it existed
    async fn delete(&mut self, key: &str) -> AppResult<bool>;

    /// Delete many keys in one command, returning how many existed
    async fn delete_many(&mut self, keys: &[String]) -> AppResult<u64>;

    /// Enumerate every key beginning with `prefix`
    async fn scan_prefix(&mut self, prefix: &str) -> AppResult<Vec<String>>;

    /// Atomically increment a fixed-window counter
    ///
    /// The key is created with a TTL of `window` on the first increment of a
    /// window and is never re-armed by later increments.
    async fn increment_window(&mut self, key: &str, window: Duration) -> AppResult<WindowCount>;

    /// Read server introspection fields
    async fn info(&mut self) -> AppResult<BackendInfo>;
}
