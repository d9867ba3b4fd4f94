// ABOUTME: Main library entry point for the chat conversation store
// ABOUTME: Resilient Redis-backed persistence and fail-open per-client rate limiting
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Chat Store
//!
//! Persistence and admission control for a conversational chat backend.
//! Conversations live in a shared key-value backend (Redis in production, an
//! in-memory store for development and tests) and every inbound request is
//! first counted by a per-client fixed-window rate limiter.
//!
//! ## Architecture
//!
//! - **backend**: pooled connections and the Redis / in-memory implementations
//! - **connection**: the `ConnectionManager` that owns the pool and retries transient faults
//! - **conversations**: `ConversationStore` CRUD and ordered listing
//! - **`rate_limiting`**: `RateLimiter` with a bounded local cache, failing open
//! - **health**: backend liveness and introspection report
//! - **config**: environment-sourced configuration with fail-fast parsing
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use chat_store::config::ServerConfig;
//! use chat_store::connection::ConnectionManager;
//! use chat_store::conversations::ConversationStore;
//! use chat_store::rate_limiting::RateLimiter;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     let connections = Arc::new(ConnectionManager::open(config.backend.clone()).await?);
//!
//!     let limiter = RateLimiter::new(connections.clone(), config.rate_limit.clone());
//!     let store = ConversationStore::new(connections.clone(), config.conversations.clone());
//!
//!     if limiter.check("203.0.113.7").await.allowed {
//!         let conversation = store.start_conversation("Hello there").await?;
//!         println!("started {}", conversation.id);
//!     }
//!
//!     connections.close().await;
//!     Ok(())
//! }
//! ```

// Re-exported from the core crate so `crate::errors`, `crate::models` and
// friends resolve the same way inside and outside this crate.
pub use chat_store_core::{codec, constants, errors, models};

/// Storage backend abstraction and implementations
pub mod backend;

/// Environment-sourced configuration
pub mod config;

/// Connection pool ownership and retry policy
pub mod connection;

/// Conversation persistence
pub mod conversations;

/// Backend health reporting
pub mod health;

/// Structured logging setup
pub mod logging;

/// Per-client rate limiting
pub mod rate_limiting;
