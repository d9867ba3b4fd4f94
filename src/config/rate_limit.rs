// ABOUTME: Rate limiting configuration for fixed-window admission control
// ABOUTME: Window length, per-window limit, and local decision cache sizing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::environment::parse_env_or;
use crate::constants::rate_limiting;
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Window length in seconds
    pub window_secs: u64,
    /// Requests admitted per client per window
    pub requests_per_window: u32,
    /// Lifetime of a local cache entry in seconds (0 disables the cache)
    pub cache_ttl_secs: u64,
    /// Distinct clients held in the local cache
    pub cache_capacity: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: rate_limiting::WINDOW_SECS,
            requests_per_window: rate_limiting::REQUESTS_PER_WINDOW,
            cache_ttl_secs: rate_limiting::LOCAL_CACHE_TTL_SECS,
            cache_capacity: rate_limiting::LOCAL_CACHE_CAPACITY,
        }
    }
}

impl RateLimitConfig {
    /// Load rate limiting configuration from environment
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but malformed
    pub fn from_env() -> AppResult<Self> {
        Ok(Self {
            window_secs: parse_env_or("RATE_LIMIT_WINDOW_SECS", rate_limiting::WINDOW_SECS)?,
            requests_per_window: parse_env_or(
                "RATE_LIMIT_REQUESTS_PER_WINDOW",
                rate_limiting::REQUESTS_PER_WINDOW,
            )?,
            cache_ttl_secs: parse_env_or(
                "RATE_LIMIT_CACHE_TTL_SECS",
                rate_limiting::LOCAL_CACHE_TTL_SECS,
            )?,
            cache_capacity: parse_env_or(
                "RATE_LIMIT_CACHE_CAPACITY",
                rate_limiting::LOCAL_CACHE_CAPACITY,
            )?,
        })
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error for a zero-length window or a zero limit
    pub fn validate(&self) -> AppResult<()> {
        if self.window_secs == 0 {
            return Err(AppError::config_invalid(
                "RATE_LIMIT_WINDOW_SECS must be at least 1",
            ));
        }
        if self.requests_per_window == 0 {
            return Err(AppError::config_invalid(
                "RATE_LIMIT_REQUESTS_PER_WINDOW must be at least 1",
            ));
        }
        Ok(())
    }

    /// Window length as a `Duration`
    #[must_use]
    pub const fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Local cache entry lifetime as a `Duration`
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
