// ABOUTME: Conversation store with TTL-bounded persistence and ordered bulk listing
// ABOUTME: Isolates corrupt records on read and rejects structurally invalid records on write
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Conversation Store
//!
//! CRUD and listing over `conversation:{id}` records. Reads degrade per
//! record: a corrupt blob is logged and skipped during listing and reported
//! as absent by [`ConversationStore::get`]. Writes are strict: a record that
//! fails normalization is never stored. Every save refreshes the retention TTL.

use crate::backend::BackendConnection;
use crate::codec;
use crate::config::ConversationConfig;
use crate::connection::ConnectionManager;
use crate::constants::keys;
use crate::errors::{AppError, AppResult};
use crate::models::{now_timestamp, Conversation, Message};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Persistent store for chat conversations
#[derive(Clone)]
pub struct ConversationStore {
    connections: Arc<ConnectionManager>,
    config: ConversationConfig,
}

impl ConversationStore {
    /// Create a store over a shared connection manager
    #[must_use]
    pub const fn new(connections: Arc<ConnectionManager>, config: ConversationConfig) -> Self {
        Self {
            connections,
            config,
        }
    }

    /// Retention configuration in effect
    #[must_use]
    pub const fn config(&self) -> &ConversationConfig {
        &self.config
    }

    /// List every stored conversation, most recently updated first
    ///
    /// Records that fail to decode are skipped with a warning. Ties on
    /// `updated_at` are broken by id so the order is stable.
    ///
    /// # Errors
    ///
    /// Returns `StorageError("backend unavailable")` if the backend cannot be
    /// read; a partial listing is never returned.
    pub async fn list_all(&self) -> AppResult<Vec<Conversation>> {
        let records = self
            .connections
            .execute("list_all", |mut conn| async move {
                let keys = conn.scan_prefix(keys::CONVERSATION_PREFIX).await?;
                let values = conn.get_many(&keys).await?;
                Ok(keys.into_iter().zip(values).collect::<Vec<_>>())
            })
            .await
            .map_err(|e| backend_failure("list_all", keys::CONVERSATION_PREFIX, e))?;

        let total = records.len();
        let mut conversations: Vec<Conversation> = records
            .into_iter()
            .filter_map(|(key, value)| {
                // Expired between SCAN and GET
                let bytes = value?;
                match codec::decode(&bytes) {
                    Ok(conversation) => Some(conversation),
                    Err(e) => {
                        warn!(key = %key, error = %e, "Skipping corrupt conversation record");
                        None
                    }
                }
            })
            .collect();

        conversations.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        debug!(
            total,
            returned = conversations.len(),
            "Listed conversations"
        );
        Ok(conversations)
    }

    /// Fetch one conversation
    ///
    /// A record that fails to decode is reported as absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError("backend unavailable")` if the backend cannot be read
    pub async fn get(&self, id: &str) -> AppResult<Option<Conversation>> {
        let key = keys::conversation(id);
        let key_ref = key.as_str();

        let bytes = self
            .connections
            .execute("get", move |mut conn| async move { conn.get(key_ref).await })
            .await
            .map_err(|e| backend_failure("get", key_ref, e))?;

        Ok(bytes.and_then(|bytes| match codec::decode(&bytes) {
            Ok(conversation) => Some(conversation),
            Err(e) => {
                warn!(key = %key, error = %e, "Treating corrupt conversation record as absent");
                None
            }
        }))
    }

    /// Validate and persist a loosely shaped conversation
    ///
    /// Server-owned fields are assigned before validation: a fresh UUID when
    /// `id` is absent, `created_at` when absent, and a title derived from the
    /// first message when `title` is absent. `updated_at` is always restamped
    /// and the retention TTL restarts.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the record is structurally invalid, or
    /// `StorageError("backend unavailable")` if the write fails.
    pub async fn save(&self, raw: Value) -> AppResult<Conversation> {
        let Value::Object(mut object) = raw else {
            return Err(AppError::validation("conversation must be a JSON object"));
        };

        let now = now_timestamp();
        fill_if_absent(&mut object, "id", || Value::String(Uuid::new_v4().to_string()));
        fill_if_absent(&mut object, "created_at", || Value::String(now.clone()));
        let derive_title = fill_if_absent(&mut object, "title", || Value::String(String::new()));
        object.insert("updated_at".to_owned(), Value::String(now.clone()));

        let mut conversation = codec::normalize(&Value::Object(object))?;
        if derive_title {
            conversation.title = Conversation::derive_title(&conversation.messages);
        }

        self.persist(&conversation).await?;
        info!(
            conversation_id = %conversation.id,
            messages = conversation.message_count(),
            "Saved conversation"
        );
        Ok(conversation)
    }

    /// Persist a typed conversation, restamping `updated_at`
    ///
    /// # Errors
    ///
    /// Same as [`save`](Self::save)
    pub async fn save_conversation(&self, conversation: &Conversation) -> AppResult<Conversation> {
        self.save(serde_json::to_value(conversation)?).await
    }

    /// Create a conversation whose first turn is `first_message`
    ///
    /// # Errors
    ///
    /// Returns `StorageError("backend unavailable")` if the write fails
    pub async fn start_conversation(&self, first_message: &str) -> AppResult<Conversation> {
        let messages = vec![Message::user(first_message)];
        let now = now_timestamp();
        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            title: Conversation::derive_title(&messages),
            messages,
            created_at: now.clone(),
            updated_at: now,
        };
        self.save_conversation(&conversation).await
    }

    /// Append messages to an existing conversation
    ///
    /// Returns `None` when no conversation exists under `id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError("backend unavailable")` if the read or write fails
    pub async fn append_messages(
        &self,
        id: &str,
        messages: Vec<Message>,
    ) -> AppResult<Option<Conversation>> {
        let Some(mut conversation) = self.get(id).await? else {
            return Ok(None);
        };
        conversation.messages.extend(messages);
        self.save_conversation(&conversation).await.map(Some)
    }

    /// Rename a conversation
    ///
    /// Returns `None` when no conversation exists under `id`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank title, or
    /// `StorageError("backend unavailable")` if the read or write fails
    pub async fn update_title(&self, id: &str, title: &str) -> AppResult<Option<Conversation>> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::validation("title must not be empty"));
        }

        let Some(mut conversation) = self.get(id).await? else {
            return Ok(None);
        };
        title.clone_into(&mut conversation.title);
        self.save_conversation(&conversation).await.map(Some)
    }

    /// Delete one conversation, reporting whether it existed
    ///
    /// # Errors
    ///
    /// Returns `StorageError("backend unavailable")` if the delete fails
    pub async fn delete(&self, id: &str) -> AppResult<bool> {
        let key = keys::conversation(id);
        let key_ref = key.as_str();

        let existed = self
            .connections
            .execute("delete", move |mut conn| async move { conn.delete(key_ref).await })
            .await
            .map_err(|e| backend_failure("delete", key_ref, e))?;

        debug!(key = %key, existed, "Deleted conversation");
        Ok(existed)
    }

    /// Delete every conversation in one batched call
    ///
    /// # Errors
    ///
    /// Returns `StorageError("backend unavailable")` if the backend cannot be reached
    pub async fn delete_all(&self) -> AppResult<u64> {
        let removed = self
            .connections
            .execute("delete_all", |mut conn| async move {
                let keys = conn.scan_prefix(keys::CONVERSATION_PREFIX).await?;
                conn.delete_many(&keys).await
            })
            .await
            .map_err(|e| backend_failure("delete_all", keys::CONVERSATION_PREFIX, e))?;

        info!(removed, "Deleted all conversations");
        Ok(removed)
    }

    async fn persist(&self, conversation: &Conversation) -> AppResult<()> {
        let key = keys::conversation(&conversation.id);
        let key_ref = key.as_str();
        let encoded = codec::encode(conversation)?;
        let payload = encoded.as_bytes();
        let ttl = self.config.ttl();

        self.connections
            .execute("save", move |mut conn| async move {
                conn.set_with_expiry(key_ref, payload, ttl).await
            })
            .await
            .map_err(|e| backend_failure("save", key_ref, e))
    }
}

/// Insert `value()` under `field` when it is absent or null, reporting whether it did
fn fill_if_absent(
    object: &mut Map<String, Value>,
    field: &str,
    value: impl FnOnce() -> Value,
) -> bool {
    let absent = matches!(object.get(field), None | Some(Value::Null));
    if absent {
        object.insert(field.to_owned(), value());
    }
    absent
}

fn backend_failure(operation: &str, key: &str, err: AppError) -> AppError {
    error!(operation, key, error = %err, "Conversation store backend failure");
    AppError::backend_unavailable(operation, err)
}
