//! History loading: persisted turns materialized as messages
//!
//! Loaded history and live-assembled messages share the same [`Message`]
//! shape, so the downstream view cannot tell them apart.

use std::sync::Arc;

use async_trait::async_trait;

use motorchat_api::ApiClient;
use motorchat_api::types::{HistoryTurn, Message, Sender};

use crate::error::Result;

/// Fetches the persisted messages of a conversation
#[async_trait]
pub trait HistoryLoader: Send + Sync {
    /// Load the full ordered history for a conversation. The result
    /// replaces the in-memory list, never merges into it.
    async fn load(&self, conversation_id: &str) -> Result<Vec<Message>>;
}

/// Expand one persisted turn into its user and bot messages, both
/// complete, both stamped with the turn's timestamp.
pub fn turn_messages(turn: &HistoryTurn) -> [Message; 2] {
    [
        Message {
            id: format!("user-{}", turn.id),
            sender: Sender::User,
            text: turn.user_message.clone(),
            is_complete: true,
            timestamp: turn.created_at,
            car_props: None,
            sql_query: None,
        },
        Message {
            id: format!("bot-{}", turn.id),
            sender: Sender::Bot,
            text: turn.bot_response.clone(),
            is_complete: true,
            timestamp: turn.created_at,
            car_props: None,
            sql_query: None,
        },
    ]
}

/// [`HistoryLoader`] backed by the REST collaborator
pub struct RestHistoryLoader {
    api: Arc<ApiClient>,
}

impl RestHistoryLoader {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl HistoryLoader for RestHistoryLoader {
    async fn load(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let (_conversation, turns) = self.api.get_conversation(conversation_id).await?;
        Ok(turns.iter().flat_map(turn_messages).collect())
    }
}
