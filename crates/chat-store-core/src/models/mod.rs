// ABOUTME: Core data models for persisted chat conversations
// ABOUTME: Re-exports Conversation, Message, and MessageRole
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Data Models
//!
//! Valid instances of these types come out of [`crate::codec`]; the store never
//! persists a record that did not pass through `normalize`.

mod conversation;

pub use conversation::{now_timestamp, Conversation, Message, MessageRole};
