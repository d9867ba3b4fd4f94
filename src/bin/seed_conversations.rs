// ABOUTME: Example conversation seeding utility for the chat store
// ABOUTME: Writes a small set of demo conversations, optionally clearing existing ones first
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Example conversation seeder.
//!
//! Usage:
//! ```bash
//! # Seed example conversations (uses REDIS_URL from environment)
//! cargo run --bin seed-conversations
//!
//! # Override backend URL
//! cargo run --bin seed-conversations -- --redis-url redis://127.0.0.1:6379
//!
//! # Remove every stored conversation before seeding
//! cargo run --bin seed-conversations -- --clear
//! ```

use anyhow::{Context, Result};
use chat_store::config::{BackendConfig, ConversationConfig};
use chat_store::connection::ConnectionManager;
use chat_store::conversations::ConversationStore;
use chat_store::logging::LoggingConfig;
use chat_store::models::Message;
use clap::Parser;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "seed-conversations",
    about = "Chat Store Example Conversation Seeder",
    long_about = "Populate the conversation store with demo conversations for local development"
)]
struct SeedArgs {
    /// Backend URL override
    #[arg(long)]
    redis_url: Option<String>,

    /// Delete existing conversations before seeding
    #[arg(long)]
    clear: bool,

    /// Enable verbose logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// Demo conversation definition
struct ExampleConversation {
    title: &'static str,
    question: &'static str,
    answer: &'static str,
}

const EXAMPLE_CONVERSATIONS: &[ExampleConversation] = &[
    ExampleConversation {
        title: "Introduction to AI",
        question: "What is artificial intelligence?",
        answer: "Artificial intelligence is the field of building systems that perform tasks \
                 normally requiring human judgement, such as recognising images, understanding \
                 speech, translating language, and making decisions from data.",
    },
    ExampleConversation {
        title: "Python Programming",
        question: "How do I write a simple Python function?",
        answer: "Define it with `def`, give it parameters, and return a value:\n\n\
                 def greet(name):\n    return f'Hello, {name}!'\n\n\
                 Calling greet('Alice') returns 'Hello, Alice!'.",
    },
    ExampleConversation {
        title: "Web Development",
        question: "What are the main components of a web application?",
        answer: "A frontend (HTML, CSS and JavaScript running in the browser), a backend \
                 (an application server exposing API endpoints), and a database. Most \
                 production systems add authentication, file storage, caching and a load \
                 balancer on top.",
    },
];

#[tokio::main]
async fn main() -> Result<()> {
    let args = SeedArgs::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    LoggingConfig::for_cli(log_level).init()?;

    info!("=== Chat Store Example Conversation Seeder ===");

    dotenvy::dotenv().ok();
    let backend = match args.redis_url {
        Some(url) => BackendConfig::new(url),
        None => BackendConfig::from_env().context("Set REDIS_URL or pass --redis-url")?,
    };

    info!("Connecting to backend: {}", backend.redacted_url());
    let connections = Arc::new(ConnectionManager::open(backend).await?);
    let store = ConversationStore::new(Arc::clone(&connections), ConversationConfig::from_env()?);

    if args.clear {
        let removed = store.delete_all().await?;
        info!("Cleared {} existing conversations", removed);
    }

    info!("Seeding {} example conversations...", EXAMPLE_CONVERSATIONS.len());
    for example in EXAMPLE_CONVERSATIONS {
        let messages = [Message::user(example.question), Message::assistant(example.answer)];
        let conversation = store
            .save(json!({
                "title": example.title,
                "messages": messages,
            }))
            .await
            .with_context(|| format!("Failed to seed '{}'", example.title))?;
        info!("Added conversation: {} ({})", conversation.title, conversation.id);
    }

    connections.close().await;

    info!("");
    info!("=== Seeding Complete ===");
    Ok(())
}
