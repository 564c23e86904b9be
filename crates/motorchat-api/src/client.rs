//! REST collaborator client
//!
//! Conversation CRUD and history fetches. Every response is a JSON
//! envelope of shape `{"data": {…}}`; every request carries the bearer
//! credential.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Conversation, HistoryTurn};

/// Client for the chat-bot REST API
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ConversationsData {
    conversations: Vec<Conversation>,
}

#[derive(Debug, Deserialize)]
struct ConversationData {
    conversation: Conversation,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConversationWithTurns {
    #[serde(flatten)]
    conversation: Conversation,
    #[serde(default)]
    messages: Vec<HistoryTurn>,
}

#[derive(Debug, Deserialize)]
struct ConversationWithTurnsData {
    conversation: ConversationWithTurns,
}

#[derive(Debug, Serialize)]
struct TitleBody<'a> {
    title: &'a str,
}

impl ApiClient {
    /// Create a client for the given API root (e.g.
    /// `http://localhost:3001/api/v1/chat-bot`) and bearer token.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// List the caller's conversations
    pub async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        let response = self
            .client
            .get(format!("{}/conversations", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let envelope: Envelope<ConversationsData> = Self::check(response).await?.json().await?;
        Ok(envelope.data.conversations)
    }

    /// Fetch one conversation together with its persisted turns
    pub async fn get_conversation(&self, id: &str) -> Result<(Conversation, Vec<HistoryTurn>)> {
        let response = self
            .client
            .get(format!("{}/conversations/{}", self.base_url, id))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let envelope: Envelope<ConversationWithTurnsData> =
            Self::check(response).await?.json().await?;
        let body = envelope.data.conversation;
        Ok((body.conversation, body.messages))
    }

    /// Create a conversation with the given title
    pub async fn create_conversation(&self, title: &str) -> Result<Conversation> {
        let response = self
            .client
            .post(format!("{}/conversations", self.base_url))
            .bearer_auth(&self.token)
            .json(&TitleBody { title })
            .send()
            .await?;
        let envelope: Envelope<ConversationData> = Self::check(response).await?.json().await?;
        Ok(envelope.data.conversation)
    }

    /// Change a conversation's title
    pub async fn rename_conversation(&self, id: &str, title: &str) -> Result<Conversation> {
        let response = self
            .client
            .patch(format!("{}/conversations/{}", self.base_url, id))
            .bearer_auth(&self.token)
            .json(&TitleBody { title })
            .send()
            .await?;
        let envelope: Envelope<ConversationData> = Self::check(response).await?.json().await?;
        Ok(envelope.data.conversation)
    }

    /// Delete a conversation
    pub async fn delete_conversation(&self, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(format!("{}/conversations/{}", self.base_url, id))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Map non-success statuses to [`Error::Status`], capturing the body
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), "API request failed: {}", message);
        Err(Error::Status {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_conversations_envelope() {
        let json = r#"{"data":{"conversations":[
            {"id":"c1","title":"First","createdAt":"2025-04-07T10:00:00Z"},
            {"id":"c2","title":"Second"}
        ]}}"#;
        let envelope: Envelope<ConversationsData> = serde_json::from_str(json).unwrap();
        let conversations = envelope.data.conversations;
        assert_eq!(conversations.len(), 2);
        assert_eq!(conversations[0].id, "c1");
        assert!(conversations[0].created_at.is_some());
        assert!(conversations[1].updated_at.is_none());
    }

    #[test]
    fn test_decode_conversation_with_turns() {
        let json = r#"{"data":{"conversation":{
            "id":"c1","title":"First",
            "messages":[
                {"id":"7","userMessage":"hi","botResponse":"hello","createdAt":"2025-04-07T10:00:00Z"}
            ]
        }}}"#;
        let envelope: Envelope<ConversationWithTurnsData> = serde_json::from_str(json).unwrap();
        let body = envelope.data.conversation;
        assert_eq!(body.conversation.id, "c1");
        assert_eq!(body.messages.len(), 1);
        assert_eq!(body.messages[0].bot_response, "hello");
    }

    #[test]
    fn test_decode_conversation_without_turns() {
        // create/rename responses carry the conversation with no messages array
        let json = r#"{"data":{"conversation":{"id":"c3","title":"New Conversation"}}}"#;
        let envelope: Envelope<ConversationData> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.data.conversation.title, "New Conversation");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new("http://localhost:3001/api/v1/chat-bot/", "tok");
        assert_eq!(client.base_url, "http://localhost:3001/api/v1/chat-bot");
    }
}
