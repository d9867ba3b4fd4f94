// ABOUTME: Configuration management module for backend, rate limiting, and retention settings
// ABOUTME: Every value is sourced from the environment and validated at startup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration module
//!
//! - **backend**: backend URL, pool size, timeouts, and retry budget
//! - **rate_limit**: window, request limit, and local cache sizing
//! - **conversation**: retention TTL for stored conversations
//! - **environment**: `ServerConfig::from_env` tying the sections together

/// Backend connection and retry configuration
pub mod backend;
/// Conversation retention configuration
pub mod conversation;
/// Environment loading and the top-level server configuration
pub mod environment;
/// Rate limiting configuration
pub mod rate_limit;

pub use backend::{BackendConfig, BackendKind};
pub use conversation::ConversationConfig;
pub use environment::{Environment, ServerConfig};
pub use rate_limit::RateLimitConfig;
