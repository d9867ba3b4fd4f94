// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides in-memory backends, fast retry policies, and raw record helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]
//! Shared test utilities for `chat_store`

use anyhow::Result;
use chat_store::backend::memory::InMemoryPool;
use chat_store::backend::{Backend, BackendConnection, BackendPool};
use chat_store::codec;
use chat_store::config::{BackendConfig, ConversationConfig, RateLimitConfig};
use chat_store::connection::{ConnectionManager, RetryPolicy};
use chat_store::conversations::ConversationStore;
use chat_store::models::{Conversation, Message};
use chat_store::rate_limiting::RateLimiter;
use std::io;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;
use uuid::Uuid;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        let _ = tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .try_init();
    });
}

/// Retry policy with millisecond delays so failure paths stay fast
pub fn fast_retry_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(5),
        multiplier: 2,
        max_delay: Duration::from_millis(20),
        max_elapsed: Duration::from_secs(2),
    }
}

/// Backend configuration for a fresh, uniquely named in-memory store
pub fn memory_config() -> BackendConfig {
    BackendConfig::new(format!("memory://test-{}", Uuid::new_v4()))
}

/// In-memory backend plus a handle for toggling its reachability
pub struct TestBackend {
    pub pool: InMemoryPool,
    pub connections: Arc<ConnectionManager>,
}

impl TestBackend {
    pub fn store(&self) -> ConversationStore {
        ConversationStore::new(Arc::clone(&self.connections), ConversationConfig::default())
    }

    pub fn limiter(&self, config: RateLimitConfig) -> RateLimiter {
        RateLimiter::new(Arc::clone(&self.connections), config)
    }
}

/// Standard in-memory backend setup
pub async fn memory_backend() -> Result<TestBackend> {
    init_test_logging();
    let config = memory_config();
    let pool = InMemoryPool::open(&config).await?;
    let connections = ConnectionManager::with_pool(config, Backend::from(pool.clone()))
        .with_retry_policy(fast_retry_policy());

    Ok(TestBackend {
        pool,
        connections: Arc::new(connections),
    })
}

/// Rate limit configuration with the given window and limit
pub fn rate_limit_config(window_secs: u64, requests_per_window: u32) -> RateLimitConfig {
    RateLimitConfig {
        window_secs,
        requests_per_window,
        ..RateLimitConfig::default()
    }
}

/// Write raw bytes under `key`, bypassing the store's validation
pub async fn put_raw(connections: &ConnectionManager, key: &str, value: &[u8]) -> Result<()> {
    put_raw_expiring(connections, key, value, Duration::from_secs(300)).await
}

/// Write raw bytes under `key` with an explicit TTL
pub async fn put_raw_expiring(
    connections: &ConnectionManager,
    key: &str,
    value: &[u8],
    ttl: Duration,
) -> Result<()> {
    connections
        .execute("put_raw", move |mut conn| async move {
            conn.set_with_expiry(key, value, ttl).await
        })
        .await?;
    Ok(())
}

/// Remaining lifetime of `key`, `None` when absent or persistent
pub async fn expiry_of(connections: &ConnectionManager, key: &str) -> Result<Option<Duration>> {
    Ok(connections
        .execute("expiry", move |mut conn| async move { conn.expiry(key).await })
        .await?)
}

/// Log lines written by a thread-local test subscriber
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        let buffer = self.0.lock().unwrap();
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Number of captured lines containing `needle`
    pub fn count_lines(&self, needle: &str) -> usize {
        self.contents()
            .lines()
            .filter(|line| line.contains(needle))
            .count()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Capture WARN and above on the current thread until the guard drops
///
/// Only effective with the current-thread runtime `#[tokio::test]` uses by default.
pub fn capture_warnings() -> (CapturedLogs, DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(logs.clone())
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}

/// Store a conversation exactly as given, keeping its timestamps
pub async fn put_conversation(
    connections: &ConnectionManager,
    conversation: &Conversation,
) -> Result<()> {
    let encoded = codec::encode(conversation)?;
    let key = format!("conversation:{}", conversation.id);
    put_raw(connections, &key, encoded.as_bytes()).await
}

/// A conversation with fixed timestamps
pub fn sample_conversation(id: &str, updated_at: &str) -> Conversation {
    Conversation {
        id: id.to_owned(),
        title: format!("Conversation {id}"),
        messages: vec![
            Message::user("What is the capital of France?"),
            Message::assistant("Paris."),
        ],
        created_at: "2023-11-01T00:00:00".to_owned(),
        updated_at: updated_at.to_owned(),
    }
}
