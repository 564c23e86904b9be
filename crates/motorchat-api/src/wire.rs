//! Channel event protocol
//!
//! Events are exchanged as JSON frames of the form
//! `{"event": "<name>", "data": {…}}`, matching the backend's room-based
//! chat namespace. Payload field names are camelCase on the wire.

use serde::{Deserialize, Serialize};

use crate::types::CompletionPayload;

/// A fragment of an in-flight bot reply
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageChunk {
    pub chunk: String,
    pub conversation_id: String,
    pub is_complete: bool,
}

/// The terminal event closing a streaming reply
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageComplete {
    pub message: CompletionPayload,
    pub conversation_id: String,
    pub is_complete: bool,
}

/// A server-emitted error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub message: String,
}

/// Events the server pushes over the channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    MessageChunk(MessageChunk),
    MessageComplete(MessageComplete),
    Error(ErrorEvent),
}

impl ServerEvent {
    /// The conversation this event targets, if it is conversation-scoped
    pub fn conversation_id(&self) -> Option<&str> {
        match self {
            ServerEvent::MessageChunk(chunk) => Some(&chunk.conversation_id),
            ServerEvent::MessageComplete(complete) => Some(&complete.conversation_id),
            ServerEvent::Error(_) => None,
        }
    }
}

/// Events the client emits over the channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    JoinConversation { conversation_id: String },
    #[serde(rename_all = "camelCase")]
    LeaveConversation { conversation_id: String },
    #[serde(rename_all = "camelCase")]
    SendMessage {
        message: String,
        conversation_id: String,
        user_id: u64,
    },
}
