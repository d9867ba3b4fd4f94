// ABOUTME: Chat conversation and message record types for key-value persistence
// ABOUTME: Typed records with role enumeration, timestamps, and title derivation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::conversation::{DEFAULT_TITLE, TITLE_ELLIPSIS, TITLE_MAX_CHARS};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Current time as an ISO-8601 string
///
/// Fixed-width UTC with microseconds, so string comparison orders correctly.
#[must_use]
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instruction message
    System,
    /// User input message
    User,
    /// Assistant response message
    Assistant,
}

impl MessageRole {
    /// Convert to string representation for storage
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Parse a role, coercing anything unrecognized to `System`
    #[must_use]
    pub fn from_str_or_system(value: &str) -> Self {
        match value {
            "user" => Self::User,
            "assistant" => Self::Assistant,
            _ => Self::System,
        }
    }
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,
    /// Message content
    pub content: String,
    /// When the message was recorded (ISO 8601)
    pub timestamp: String,
}

impl Message {
    /// Create a message stamped with the current time
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: now_timestamp(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// A persisted chat conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation ID, immutable once assigned
    pub id: String,
    /// Display title
    pub title: String,
    /// Messages, oldest first
    pub messages: Vec<Message>,
    /// When the conversation was created (ISO 8601)
    pub created_at: String,
    /// When the conversation was last saved (ISO 8601)
    pub updated_at: String,
}

impl Conversation {
    /// Derive a display title from the first message
    ///
    /// Content longer than the title budget is cut on a character boundary and
    /// suffixed with an ellipsis.
    #[must_use]
    pub fn derive_title(messages: &[Message]) -> String {
        messages
            .first()
            .map_or_else(|| DEFAULT_TITLE.to_owned(), |m| truncate_title(&m.content))
    }

    /// Number of messages in the conversation
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

fn truncate_title(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return DEFAULT_TITLE.to_owned();
    }
    if trimmed.chars().count() > TITLE_MAX_CHARS {
        let head: String = trimmed.chars().take(TITLE_MAX_CHARS).collect();
        format!("{head}{TITLE_ELLIPSIS}")
    } else {
        trimmed.to_owned()
    }
}
