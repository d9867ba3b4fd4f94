// ABOUTME: Application-wide constants for key namespaces, retention, and backend defaults
// ABOUTME: Grouped by domain so configuration defaults live in exactly one place
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Backend key namespaces
///
/// Conversation and rate-limit keys share one backend and must never collide.
pub mod keys {
    /// Prefix for serialized conversation records
    pub const CONVERSATION_PREFIX: &str = "conversation:";
    /// Prefix for per-client rate-limit counters
    pub const RATE_LIMIT_PREFIX: &str = "rate_limit:";

    /// Build the backend key for a conversation id
    #[must_use]
    pub fn conversation(id: &str) -> String {
        format!("{CONVERSATION_PREFIX}{id}")
    }

    /// Build the backend key for a rate-limited client
    #[must_use]
    pub fn rate_limit(client_id: &str) -> String {
        format!("{RATE_LIMIT_PREFIX}{client_id}")
    }
}

/// Conversation retention and presentation
pub mod conversation {
    /// Retention TTL in days, refreshed on every save
    pub const RETENTION_DAYS: u64 = 30;
    /// Upper bound accepted for a configured retention, in days
    pub const MAX_RETENTION_DAYS: u64 = 36_500;
    /// Seconds in one retention day
    pub const SECS_PER_DAY: u64 = 86_400;
    /// Characters of the first message kept when deriving a title
    pub const TITLE_MAX_CHARS: usize = 30;
    /// Suffix appended to a truncated derived title
    pub const TITLE_ELLIPSIS: &str = "...";
    /// Title used when a conversation has no messages to derive one from
    pub const DEFAULT_TITLE: &str = "New conversation";
}

/// Redis connection pool and retry defaults
pub mod redis {
    /// Maximum live connections in the shared pool
    pub const DEFAULT_POOL_SIZE: usize = 10;
    /// Connection timeout in seconds
    pub const CONNECTION_TIMEOUT_SECS: u64 = 10;
    /// Response (socket) timeout in seconds
    pub const RESPONSE_TIMEOUT_SECS: u64 = 5;
    /// Reconnection retries performed inside a single pooled connection
    pub const RECONNECTION_RETRIES: usize = 1;
    /// Exponential backoff base used by the pooled connection's own reconnects
    pub const RETRY_EXPONENT_BASE: u64 = 2;
    /// Attempts made by the acquisition retry policy
    pub const RETRY_MAX_ATTEMPTS: u32 = 3;
    /// First backoff delay in milliseconds
    pub const RETRY_BASE_DELAY_MS: u64 = 1_000;
    /// Backoff multiplier between attempts
    pub const RETRY_MULTIPLIER: u32 = 2;
    /// Ceiling for any single backoff delay in milliseconds
    pub const MAX_RETRY_DELAY_MS: u64 = 30_000;
    /// Total time budget for retries in seconds
    pub const RETRY_MAX_ELAPSED_SECS: u64 = 30;
    /// Keys fetched per SCAN iteration
    pub const SCAN_BATCH_SIZE: usize = 100;
}

/// Rate limiting defaults
pub mod rate_limiting {
    /// Fixed window length in seconds
    pub const WINDOW_SECS: u64 = 60;
    /// Requests admitted per client per window
    pub const REQUESTS_PER_WINDOW: u32 = 60;
    /// Lifetime of a process-local cache entry in seconds
    pub const LOCAL_CACHE_TTL_SECS: u64 = 5;
    /// Distinct clients held in the process-local cache
    pub const LOCAL_CACHE_CAPACITY: usize = 1_000;
    /// Identifier used when a request carries no usable address
    pub const UNKNOWN_CLIENT: &str = "unknown";
}

/// Service identification for logs and health reports
pub mod service_names {
    /// Service name used in structured logs
    pub const CHAT_STORE: &str = "chat-store";
}

/// URL schemes accepted for the backend address
pub mod backend_schemes {
    /// Plain Redis
    pub const REDIS: &str = "redis";
    /// Redis over TLS
    pub const REDIS_TLS: &str = "rediss";
    /// Process-local in-memory backend
    pub const MEMORY: &str = "memory";
}
