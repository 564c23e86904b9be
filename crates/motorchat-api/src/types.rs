//! Core data model shared by the live channel and the history backend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A conversation thread as the backend knows it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Opaque backend-assigned identifier
    pub id: String,
    /// Display title
    pub title: String,
    /// Server-assigned creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Server-assigned last-update time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// One key/value/icon entry of a structured bot reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarProperty {
    pub emoji: String,
    pub key: String,
    pub value: String,
}

/// A single chat message, live-assembled or loaded from history.
///
/// Invariant maintained by the session core: within a conversation's
/// message list at most one message has `is_complete == false`, it is
/// always the last element, and its sender is always [`Sender::Bot`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Locally generated for new messages, derived from the turn id for
    /// history (`user-{id}` / `bot-{id}`)
    pub id: String,
    pub sender: Sender,
    pub text: String,
    pub is_complete: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub car_props: Option<Vec<CarProperty>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_query: Option<String>,
}

impl Message {
    /// A complete user message stamped now
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender: Sender::User,
            text: text.into(),
            is_complete: true,
            timestamp: Utc::now(),
            car_props: None,
            sql_query: None,
        }
    }

    /// An in-flight bot message holding the accumulated fragment text
    pub fn bot_partial(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender: Sender::Bot,
            text: text.into(),
            is_complete: false,
            timestamp: Utc::now(),
            car_props: None,
            sql_query: None,
        }
    }

    /// A finalized bot message with optional structured fields
    pub fn bot_complete(
        text: impl Into<String>,
        car_props: Option<Vec<CarProperty>>,
        sql_query: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender: Sender::Bot,
            text: text.into(),
            is_complete: true,
            timestamp: Utc::now(),
            car_props,
            sql_query,
        }
    }

    /// Whether this is the in-flight bot message the assembler may rewrite
    pub fn is_streaming_bot(&self) -> bool {
        self.sender == Sender::Bot && !self.is_complete
    }
}

/// The structured shape of a terminal bot reply.
///
/// Every field is individually optional: the backend may send any subset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredReply {
    #[serde(default)]
    pub chat_reply: Option<String>,
    #[serde(default)]
    pub car_props: Option<Vec<CarProperty>>,
    #[serde(default)]
    pub sql_query: Option<String>,
}

/// Terminal payload of a `message_complete` event.
///
/// The backend is inconsistent about the payload shape: it may be the
/// structured object directly, a JSON-encoded string carrying that
/// object, or an opaque plain string. This union captures the first
/// split (object vs. string) at the deserialization boundary; deciding
/// whether a string is JSON-encoded structure happens during
/// normalization in the session core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompletionPayload {
    Structured(StructuredReply),
    Text(String),
}

/// One persisted turn: a user message and the bot's response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryTurn {
    pub id: String,
    pub user_message: String,
    pub bot_response: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_payload_object() {
        let json = r#"{"chatReply":"Here","carProps":[{"emoji":"🚗","key":"Color","value":"Red"}],"sqlQuery":"SELECT 1"}"#;
        let payload: CompletionPayload = serde_json::from_str(json).unwrap();
        match payload {
            CompletionPayload::Structured(reply) => {
                assert_eq!(reply.chat_reply.as_deref(), Some("Here"));
                assert_eq!(reply.sql_query.as_deref(), Some("SELECT 1"));
                let props = reply.car_props.unwrap();
                assert_eq!(props.len(), 1);
                assert_eq!(props[0].key, "Color");
            }
            CompletionPayload::Text(_) => panic!("expected structured payload"),
        }
    }

    #[test]
    fn test_completion_payload_string() {
        let payload: CompletionPayload = serde_json::from_str(r#""hello""#).unwrap();
        assert!(matches!(payload, CompletionPayload::Text(ref s) if s == "hello"));
    }

    #[test]
    fn test_completion_payload_object_with_nulls() {
        let json = r#"{"chatReply":"Hi","carProps":null,"sqlQuery":null}"#;
        let payload: CompletionPayload = serde_json::from_str(json).unwrap();
        match payload {
            CompletionPayload::Structured(reply) => {
                assert_eq!(reply.chat_reply.as_deref(), Some("Hi"));
                assert!(reply.car_props.is_none());
                assert!(reply.sql_query.is_none());
            }
            CompletionPayload::Text(_) => panic!("expected structured payload"),
        }
    }

    #[test]
    fn test_message_serde_field_names() {
        let msg = Message::bot_complete("done", None, Some("SELECT 1".into()));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["isComplete"], true);
        assert_eq!(json["sqlQuery"], "SELECT 1");
        assert_eq!(json["sender"], "bot");
        // absent optional fields are omitted, not null
        assert!(json.get("carProps").is_none());
    }

    #[test]
    fn test_history_turn_decode() {
        let json = r#"{"id":"7","userMessage":"hi","botResponse":"hello","createdAt":"2025-04-07T10:00:00Z"}"#;
        let turn: HistoryTurn = serde_json::from_str(json).unwrap();
        assert_eq!(turn.id, "7");
        assert_eq!(turn.user_message, "hi");
        assert_eq!(turn.bot_response, "hello");
    }
}
