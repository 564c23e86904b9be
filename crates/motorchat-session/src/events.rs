//! Session event types

use serde::{Deserialize, Serialize};

/// Events emitted by the session controller for the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Channel connectivity changed
    ConnectionChanged { connected: bool },

    /// The conversation list changed (load, create, rename, delete)
    ConversationsChanged,

    /// The active conversation changed
    ActiveChanged { conversation_id: Option<String> },

    /// The message list changed
    MessagesChanged,

    /// The composing indicator changed
    TypingChanged { typing: bool },

    /// A server-emitted error to surface to the user
    Alert { message: String },
}
