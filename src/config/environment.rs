// ABOUTME: Environment-based configuration loading for the conversation store
// ABOUTME: Parses, validates, and summarizes every setting with fail-fast semantics
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::{BackendConfig, ConversationConfig, RateLimitConfig};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use tracing::{info, warn};

/// Deployment environment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Automated tests
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Top-level configuration handed to the store and the rate limiter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Deployment environment
    pub environment: Environment,
    /// Backend connection settings
    pub backend: BackendConfig,
    /// Rate limiting settings
    pub rate_limit: RateLimitConfig,
    /// Conversation retention settings
    pub conversations: ConversationConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// A `.env` file in the working directory is honoured when present.
    ///
    /// # Errors
    ///
    /// Returns an error if `REDIS_URL` is unset or any variable that is set
    /// fails to parse or validate
    pub fn from_env() -> AppResult<Self> {
        info!("Loading configuration from environment variables");

        if let Err(e) = dotenvy::dotenv() {
            warn!("No .env file found or failed to load: {}", e);
        }

        let config = Self {
            environment: Environment::from_str_or_default(
                &env::var("ENVIRONMENT").unwrap_or_default(),
            ),
            backend: BackendConfig::from_env()?,
            rate_limit: RateLimitConfig::from_env()?,
            conversations: ConversationConfig::from_env()?,
        };

        config.validate()?;
        info!("{}", config.summary());
        Ok(config)
    }

    /// Validate cross-field constraints
    ///
    /// # Errors
    ///
    /// Returns the first section that fails validation
    pub fn validate(&self) -> AppResult<()> {
        self.backend.validate()?;
        self.rate_limit.validate()?;
        self.conversations.validate()
    }

    /// Human-readable configuration summary (secrets redacted)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Chat Store Configuration:\n\
             - Environment: {}\n\
             - Backend: {}\n\
             - Pool Size: {}\n\
             - Rate Limit: {} requests / {}s\n\
             - Conversation TTL: {} days",
            self.environment,
            self.backend.redacted_url(),
            self.backend.pool_size,
            self.rate_limit.requests_per_window,
            self.rate_limit.window_secs,
            self.conversations.ttl_days,
        )
    }
}

/// Read a required environment variable
pub(crate) fn require_env(key: &str) -> AppResult<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::config_missing(key)),
    }
}

/// Parse an optional environment variable, failing fast on malformed values
pub(crate) fn parse_env_or<T>(key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|e| {
            AppError::config_invalid(format!("Invalid {key} value '{raw}': {e}"))
        }),
        _ => Ok(default),
    }
}
