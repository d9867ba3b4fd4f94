// ABOUTME: Core types and constants for the chat conversation store
// ABOUTME: Foundation crate with error taxonomy, record models, codec, and constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Chat Store Core
//!
//! Foundation crate shared by the conversation store and the rate limiter.
//! Nothing in here performs I/O, so it changes rarely and compiles once.
//!
//! ## Modules
//!
//! - **errors**: `AppError`, `ErrorCode`, and the retryable/terminal classification
//! - **constants**: key namespaces, TTLs, and backend defaults
//! - **models**: `Conversation`, `Message`, and `MessageRole`
//! - **codec**: validation and normalization of records to and from their JSON encoding

/// Unified error handling with standard error codes
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Conversation and message record types
pub mod models;

/// Record validation, sanitization, and wire encoding
pub mod codec;
