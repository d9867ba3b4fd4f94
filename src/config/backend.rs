// ABOUTME: Backend connection configuration with pool sizing, timeouts, and retry budget
// ABOUTME: Resolves the backend kind from the URL scheme and redacts credentials for logs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::environment::{parse_env_or, require_env};
use crate::constants::{backend_schemes, redis};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Which backend implementation a URL selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Redis server (`redis://` or `rediss://`)
    Redis,
    /// Process-local in-memory backend (`memory://`)
    Memory,
}

/// Backend connection, pool, and retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend URL
    pub url: String,
    /// Maximum live connections in the pool
    pub pool_size: usize,
    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,
    /// Response/command timeout in seconds
    pub response_timeout_secs: u64,
    /// Reconnection retries performed inside a single pooled connection
    pub reconnection_retries: usize,
    /// Exponential backoff base for a pooled connection's own reconnects
    pub retry_exponent_base: u64,
    /// Maximum single retry delay in milliseconds
    pub max_retry_delay_ms: u64,
    /// Attempts made when acquiring a connection or running an operation
    pub retry_max_attempts: u32,
    /// Initial retry delay in milliseconds (doubles with exponential backoff)
    pub retry_base_delay_ms: u64,
    /// Total retry budget in seconds
    pub retry_max_elapsed_secs: u64,
}

impl BackendConfig {
    /// Create a configuration for `url` with default pool and retry settings
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pool_size: redis::DEFAULT_POOL_SIZE,
            connection_timeout_secs: redis::CONNECTION_TIMEOUT_SECS,
            response_timeout_secs: redis::RESPONSE_TIMEOUT_SECS,
            reconnection_retries: redis::RECONNECTION_RETRIES,
            retry_exponent_base: redis::RETRY_EXPONENT_BASE,
            max_retry_delay_ms: redis::MAX_RETRY_DELAY_MS,
            retry_max_attempts: redis::RETRY_MAX_ATTEMPTS,
            retry_base_delay_ms: redis::RETRY_BASE_DELAY_MS,
            retry_max_elapsed_secs: redis::RETRY_MAX_ELAPSED_SECS,
        }
    }

    /// Load backend configuration from environment
    ///
    /// # Errors
    ///
    /// Returns an error if `REDIS_URL` is unset or a numeric variable is malformed
    pub fn from_env() -> AppResult<Self> {
        Ok(Self {
            url: require_env("REDIS_URL")?,
            pool_size: parse_env_or("REDIS_POOL_SIZE", redis::DEFAULT_POOL_SIZE)?,
            connection_timeout_secs: parse_env_or(
                "REDIS_CONNECTION_TIMEOUT_SECS",
                redis::CONNECTION_TIMEOUT_SECS,
            )?,
            response_timeout_secs: parse_env_or(
                "REDIS_RESPONSE_TIMEOUT_SECS",
                redis::RESPONSE_TIMEOUT_SECS,
            )?,
            reconnection_retries: parse_env_or(
                "REDIS_RECONNECTION_RETRIES",
                redis::RECONNECTION_RETRIES,
            )?,
            retry_exponent_base: parse_env_or(
                "REDIS_RETRY_EXPONENT_BASE",
                redis::RETRY_EXPONENT_BASE,
            )?,
            max_retry_delay_ms: parse_env_or(
                "REDIS_MAX_RETRY_DELAY_MS",
                redis::MAX_RETRY_DELAY_MS,
            )?,
            retry_max_attempts: parse_env_or(
                "REDIS_RETRY_MAX_ATTEMPTS",
                redis::RETRY_MAX_ATTEMPTS,
            )?,
            retry_base_delay_ms: parse_env_or(
                "REDIS_RETRY_BASE_DELAY_MS",
                redis::RETRY_BASE_DELAY_MS,
            )?,
            retry_max_elapsed_secs: parse_env_or(
                "REDIS_RETRY_MAX_ELAPSED_SECS",
                redis::RETRY_MAX_ELAPSED_SECS,
            )?,
        })
    }

    /// Resolve the backend kind from the URL scheme
    ///
    /// # Errors
    ///
    /// Returns `ConfigMissing` for an empty URL and `ConfigInvalid` for a
    /// malformed URL or an unsupported scheme
    pub fn kind(&self) -> AppResult<BackendKind> {
        if self.url.trim().is_empty() {
            return Err(AppError::config_missing("REDIS_URL"));
        }
        let parsed = Url::parse(&self.url).map_err(|e| {
            AppError::config_invalid(format!(
                "Malformed backend URL '{}': {e}",
                self.redacted_url()
            ))
        })?;
        match parsed.scheme() {
            backend_schemes::REDIS | backend_schemes::REDIS_TLS => Ok(BackendKind::Redis),
            backend_schemes::MEMORY => Ok(BackendKind::Memory),
            other => Err(AppError::config_invalid(format!(
                "Unsupported backend URL scheme '{other}'"
            ))),
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error for an unusable URL, an empty pool, or a zero retry budget
    pub fn validate(&self) -> AppResult<()> {
        self.kind()?;
        if self.pool_size == 0 {
            return Err(AppError::config_invalid("REDIS_POOL_SIZE must be at least 1"));
        }
        if self.retry_max_attempts == 0 {
            return Err(AppError::config_invalid(
                "REDIS_RETRY_MAX_ATTEMPTS must be at least 1",
            ));
        }
        Ok(())
    }

    /// URL with any password replaced, safe for logs
    #[must_use]
    pub fn redacted_url(&self) -> String {
        match Url::parse(&self.url) {
            Ok(mut parsed) => {
                if parsed.password().is_some() && parsed.set_password(Some("***")).is_err() {
                    return "<unprintable url>".to_owned();
                }
                parsed.to_string()
            }
            Err(_) => "<invalid url>".to_owned(),
        }
    }

    /// Connection timeout as a `Duration`
    #[must_use]
    pub const fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Response timeout as a `Duration`
    #[must_use]
    pub const fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }
}
