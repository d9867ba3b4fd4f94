// ABOUTME: Conversation retention configuration
// ABOUTME: TTL applied to every conversation save
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::environment::parse_env_or;
use crate::constants::conversation;
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Conversation retention configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Days a conversation survives without being saved again
    pub ttl_days: u64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            ttl_days: conversation::RETENTION_DAYS,
        }
    }
}

impl ConversationConfig {
    /// Load retention configuration from environment
    ///
    /// # Errors
    ///
    /// Returns an error if `CONVERSATION_TTL_DAYS` is set but malformed
    pub fn from_env() -> AppResult<Self> {
        Ok(Self {
            ttl_days: parse_env_or("CONVERSATION_TTL_DAYS", conversation::RETENTION_DAYS)?,
        })
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error for a zero TTL or one beyond the retention ceiling
    pub fn validate(&self) -> AppResult<()> {
        if self.ttl_days == 0 {
            return Err(AppError::config_invalid(
                "CONVERSATION_TTL_DAYS must be at least 1",
            ));
        }
        if self.ttl_days > conversation::MAX_RETENTION_DAYS {
            return Err(AppError::config_invalid(format!(
                "CONVERSATION_TTL_DAYS must be at most {}",
                conversation::MAX_RETENTION_DAYS
            )));
        }
        Ok(())
    }

    /// Retention TTL as a `Duration`
    ///
    /// Saturates instead of overflowing for an unvalidated day count.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_days.saturating_mul(conversation::SECS_PER_DAY))
    }
}
