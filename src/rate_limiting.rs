// ABOUTME: Fixed-window per-client rate limiter on atomic counters with a bounded local cache
// ABOUTME: Fails open when the backend is unreachable so chat stays available
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Rate Limiting
//!
//! Each client owns a counter at `rate_limit:{client_id}` that is created with
//! the window as its TTL and incremented once per check. The counter resets
//! only when the key expires, so a client can see up to twice the limit across
//! a window boundary.
//!
//! A bounded LRU cache remembers the last counter seen per client. Only a
//! saturated client is answered from the cache: its next check would be
//! denied by the backend anyway, so the cache absorbs the bursts that matter
//! without letting counts drift. The cache is per process; in a multi-instance
//! deployment the effective global limit is at most `instances × limit`.

use crate::backend::{BackendConnection, WindowCount};
use crate::config::RateLimitConfig;
use crate::connection::ConnectionManager;
use crate::constants::{keys, rate_limiting::UNKNOWN_CLIENT};
use crate::errors::{AppError, AppResult};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Requests admitted per window
    pub limit: u32,
    /// Requests left in the current window
    pub remaining: u32,
    /// Seconds until the current window resets
    pub reset_seconds: u64,
}

impl RateLimitDecision {
    /// Decision reported when the backend could not be consulted
    #[must_use]
    pub const fn fail_open(limit: u32, window_secs: u64) -> Self {
        Self {
            allowed: true,
            limit,
            remaining: limit,
            reset_seconds: window_secs,
        }
    }

    /// Seconds the caller should wait before retrying, when denied
    #[must_use]
    pub const fn retry_after(&self) -> Option<u64> {
        if self.allowed {
            None
        } else {
            Some(self.reset_seconds)
        }
    }

    /// Convert a denial into the throttling error the calling layer maps to 429
    ///
    /// # Errors
    ///
    /// Returns `RateLimitExceeded` carrying `retry_after_secs` when denied
    pub fn into_result(self) -> AppResult<Self> {
        if self.allowed {
            Ok(self)
        } else {
            Err(AppError::rate_limit_exceeded(self.limit, self.reset_seconds))
        }
    }
}

/// Last counter observed for one client
#[derive(Debug, Clone, Copy)]
struct CachedWindow {
    count: u64,
    window_expires_at: Instant,
    cached_until: Instant,
}

/// Per-client fixed-window rate limiter
pub struct RateLimiter {
    connections: Arc<ConnectionManager>,
    config: RateLimitConfig,
    cache: Option<Mutex<LruCache<String, CachedWindow>>>,
}

impl RateLimiter {
    /// Create a rate limiter over a shared connection manager
    ///
    /// A zero cache TTL or capacity disables the local cache.
    #[must_use]
    pub fn new(connections: Arc<ConnectionManager>, config: RateLimitConfig) -> Self {
        let cache = NonZeroUsize::new(config.cache_capacity)
            .filter(|_| config.cache_ttl_secs > 0)
            .map(|capacity| Mutex::new(LruCache::new(capacity)));

        Self {
            connections,
            config,
            cache,
        }
    }

    /// Rate limiting configuration in effect
    #[must_use]
    pub const fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Count one request from `client_id` and decide whether it may proceed
    ///
    /// Never fails: a backend fault is logged and the request is allowed with
    /// the full quota reported.
    pub async fn check(&self, client_id: &str) -> RateLimitDecision {
        if let Some(decision) = self.cached_denial(client_id).await {
            debug!(client_id, "Rate limit denial served from local cache");
            return decision;
        }

        let key = keys::rate_limit(client_id);
        let key_ref = key.as_str();
        let window = self.config.window();

        let counted = self
            .connections
            .execute("rate_limit", move |mut conn| async move {
                conn.increment_window(key_ref, window).await
            })
            .await;

        match counted {
            Ok(window_count) => {
                self.remember(client_id, window_count).await;
                let decision = self.decide(window_count);
                if !decision.allowed {
                    warn!(
                        client_id,
                        count = window_count.count,
                        limit = self.config.requests_per_window,
                        reset_seconds = decision.reset_seconds,
                        "Rate limit exceeded"
                    );
                }
                decision
            }
            Err(e) => {
                error!(
                    client_id,
                    key = %key,
                    error = %e,
                    "Rate limit backend unavailable, failing open"
                );
                RateLimitDecision::fail_open(
                    self.config.requests_per_window,
                    self.config.window_secs,
                )
            }
        }
    }

    /// Number of clients currently held in the local cache
    pub async fn cached_clients(&self) -> usize {
        match &self.cache {
            Some(cache) => cache.lock().await.len(),
            None => 0,
        }
    }

    fn decide(&self, window_count: WindowCount) -> RateLimitDecision {
        let limit = self.config.requests_per_window;
        let remaining = u64::from(limit).saturating_sub(window_count.count);

        RateLimitDecision {
            allowed: window_count.count <= u64::from(limit),
            limit,
            remaining: u32::try_from(remaining).unwrap_or(limit),
            reset_seconds: window_count.ttl_secs,
        }
    }

    async fn cached_denial(&self, client_id: &str) -> Option<RateLimitDecision> {
        let cache = self.cache.as_ref()?;
        let mut cache = cache.lock().await;
        let now = Instant::now();

        let entry = *cache.get(client_id)?;
        if now >= entry.cached_until || now >= entry.window_expires_at {
            cache.pop(client_id);
            return None;
        }
        drop(cache);

        let limit = self.config.requests_per_window;
        if entry.count < u64::from(limit) {
            return None;
        }

        Some(RateLimitDecision {
            allowed: false,
            limit,
            remaining: 0,
            reset_seconds: ceil_secs(entry.window_expires_at - now),
        })
    }

    async fn remember(&self, client_id: &str, window_count: WindowCount) {
        let Some(cache) = &self.cache else {
            return;
        };
        let now = Instant::now();
        let window_expires_at = now + Duration::from_secs(window_count.ttl_secs);
        let entry = CachedWindow {
            count: window_count.count,
            window_expires_at,
            cached_until: (now + self.config.cache_ttl()).min(window_expires_at),
        };
        cache.lock().await.put(client_id.to_owned(), entry);
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    (duration.as_secs() + u64::from(duration.subsec_nanos() > 0)).max(1)
}

/// Derive the rate-limit identity of a request
///
/// Uses the first entry of a comma-separated forwarded-for chain, else the
/// transport peer address, else `"unknown"`.
#[must_use]
pub fn client_identifier(forwarded_for: Option<&str>, peer: Option<IpAddr>) -> String {
    forwarded_for
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty())
        .map(ToOwned::to_owned)
        .or_else(|| peer.map(|addr| addr.to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_owned())
}
