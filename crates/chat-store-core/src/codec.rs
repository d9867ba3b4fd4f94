// ABOUTME: Record codec validating and normalizing conversations to and from JSON
// ABOUTME: Pure functions; the only path from loosely shaped input to a typed Conversation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Conversation record codec
//!
//! Conversation-level structure is strict: a record missing any required field
//! is rejected. Message-level shape is lenient: every structured message is
//! coerced into a valid [`Message`] by defaulting, and anything that is not a
//! structured record is dropped.

use crate::errors::{AppError, AppResult};
use crate::models::{now_timestamp, Conversation, Message, MessageRole};
use serde_json::{Map, Value};

/// Fields every stored conversation must carry
pub const REQUIRED_FIELDS: [&str; 5] = ["id", "title", "messages", "created_at", "updated_at"];

/// Validate and normalize a raw conversation
///
/// # Errors
///
/// Returns a validation error if the input is not an object, a required field
/// is missing, or a scalar field has the wrong type.
pub fn normalize(raw: &Value) -> AppResult<Conversation> {
    let object = raw
        .as_object()
        .ok_or_else(|| AppError::validation("conversation must be a JSON object"))?;

    if let Some(missing) = REQUIRED_FIELDS
        .iter()
        .find(|field| !object.contains_key(**field))
    {
        return Err(AppError::missing_field(missing));
    }

    let id = required_string(object, "id")?;
    if id.is_empty() {
        return Err(AppError::validation("conversation id must not be empty"));
    }

    Ok(Conversation {
        id,
        title: required_string(object, "title")?,
        messages: normalize_messages(object.get("messages")),
        created_at: required_string(object, "created_at")?,
        updated_at: required_string(object, "updated_at")?,
    })
}

/// Normalize a raw message, defaulting every missing or invalid field
#[must_use]
pub fn normalize_message(raw: &Value) -> Message {
    let role = raw
        .get("role")
        .and_then(Value::as_str)
        .map_or(MessageRole::System, MessageRole::from_str_or_system);
    let content = raw
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    let timestamp = raw
        .get("timestamp")
        .and_then(Value::as_str)
        .filter(|ts| !ts.is_empty())
        .map_or_else(now_timestamp, ToOwned::to_owned);

    Message {
        role,
        content,
        timestamp,
    }
}

/// Decode a stored record and normalize it
///
/// # Errors
///
/// Returns `InvalidFormat` carrying the decode error for malformed bytes, or
/// any error produced by [`normalize`].
pub fn decode(bytes: &[u8]) -> AppResult<Conversation> {
    let raw: Value = serde_json::from_slice(bytes).map_err(|e| {
        AppError::invalid_format(format!("malformed conversation record: {e}")).with_source(e)
    })?;
    normalize(&raw)
}

/// Encode a conversation for storage
///
/// # Errors
///
/// Returns a serialization error if the record cannot be encoded
pub fn encode(conversation: &Conversation) -> AppResult<String> {
    Ok(serde_json::to_string(conversation)?)
}

fn normalize_messages(raw: Option<&Value>) -> Vec<Message> {
    match raw {
        Some(Value::Array(items)) => items
            .iter()
            .filter(|item| item.is_object())
            .map(normalize_message)
            .collect(),
        _ => Vec::new(),
    }
}

fn required_string(object: &Map<String, Value>, field: &str) -> AppResult<String> {
    match object.get(field) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(AppError::validation(format!("field '{field}' must be a string"))
            .with_details(serde_json::json!({ "field": field }))),
        None => Err(AppError::missing_field(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;
    use serde_json::json;

    fn valid_raw() -> Value {
        json!({
            "id": "abc",
            "title": "Greetings",
            "messages": [
                {"role": "user", "content": "hi", "timestamp": "2024-01-01T00:00:00"},
                {"role": "assistant", "content": "hello", "timestamp": "2024-01-01T00:00:01"}
            ],
            "created_at": "2024-01-01T00:00:00",
            "updated_at": "2024-01-01T00:00:01"
        })
    }

    #[test]
    fn test_normalize_valid_conversation() {
        let conversation = normalize(&valid_raw()).unwrap();

        assert_eq!(conversation.id, "abc");
        assert_eq!(conversation.messages.len(), 2);
        assert_eq!(conversation.messages[0].role, MessageRole::User);
        assert_eq!(conversation.messages[1].content, "hello");
    }

    #[test]
    fn test_missing_required_field_is_rejected() {
        for field in REQUIRED_FIELDS {
            let mut raw = valid_raw();
            raw.as_object_mut().unwrap().remove(field);

            let err = normalize(&raw).unwrap_err();
            assert_eq!(err.code, ErrorCode::MissingRequiredField, "field {field}");
            assert_eq!(err.message, "missing required field");
            assert_eq!(err.details["field"], field);
        }
    }

    #[test]
    fn test_non_sequence_messages_become_empty() {
        let mut raw = valid_raw();
        raw["messages"] = json!("not a list");

        let conversation = normalize(&raw).unwrap();
        assert!(conversation.messages.is_empty());
    }

    #[test]
    fn test_unstructured_messages_are_dropped() {
        let mut raw = valid_raw();
        raw["messages"] = json!([42, "text", null, {"role": "user", "content": "kept"}]);

        let conversation = normalize(&raw).unwrap();
        assert_eq!(conversation.messages.len(), 1);
        assert_eq!(conversation.messages[0].content, "kept");
    }

    #[test]
    fn test_empty_message_defaults() {
        let before = now_timestamp();
        let message = normalize_message(&json!({}));

        assert_eq!(message.role, MessageRole::System);
        assert_eq!(message.content, "");
        assert!(message.timestamp >= before);
    }

    #[test]
    fn test_unknown_role_coerced_to_system() {
        let message = normalize_message(&json!({"role": "wizard", "content": "boo"}));
        assert_eq!(message.role, MessageRole::System);
        assert_eq!(message.content, "boo");
    }

    #[test]
    fn test_wrong_scalar_type_is_rejected() {
        let mut raw = valid_raw();
        raw["id"] = json!(17);

        let err = normalize(&raw).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[test]
    fn test_decode_malformed_bytes() {
        let err = decode(b"{not json").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFormat);
        assert!(err.code.is_validation());
    }

    #[test]
    fn test_encode_then_decode_preserves_record() {
        let conversation = normalize(&valid_raw()).unwrap();
        let encoded = encode(&conversation).unwrap();
        assert_eq!(decode(encoded.as_bytes()).unwrap(), conversation);
    }

    #[test]
    fn test_derive_title_truncates_long_content() {
        let short = Conversation::derive_title(&[Message::user("Hello there")]);
        assert_eq!(short, "Hello there");

        let long = Conversation::derive_title(&[Message::user(
            "What is the airspeed velocity of an unladen swallow?",
        )]);
        assert_eq!(long, "What is the airspeed velocity ...");

        assert_eq!(Conversation::derive_title(&[]), "New conversation");
    }
}
