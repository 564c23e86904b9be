//! Session controller: wires channel, registry, assembler, and history
//!
//! All handlers run to completion on the caller's task; the invariants of
//! the assembler and registry need no locking because nothing preempts a
//! handler mid-update. Suspension happens only at the I/O boundaries
//! (history fetch, REST calls, connect), and a history result that
//! arrives after the active conversation moved on is discarded.

use std::sync::Arc;

use tokio::sync::broadcast;

use motorchat_api::ApiClient;
use motorchat_api::types::{Conversation, Message};
use motorchat_api::wire::ClientEvent;

use crate::assembler::Assembler;
use crate::channel::{Channel, ChannelEvent};
use crate::error::{Error, Result};
use crate::events::SessionEvent;
use crate::history::HistoryLoader;
use crate::registry::{ConversationRegistry, RemovalOutcome};

/// Top-level orchestration of one chat session
pub struct SessionController {
    channel: Arc<dyn Channel>,
    history: Arc<dyn HistoryLoader>,
    api: Arc<ApiClient>,
    registry: ConversationRegistry,
    assembler: Assembler,
    credential: String,
    user_id: u64,
    connected: bool,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl SessionController {
    pub fn new(
        channel: Arc<dyn Channel>,
        api: Arc<ApiClient>,
        history: Arc<dyn HistoryLoader>,
        credential: impl Into<String>,
        user_id: u64,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            channel,
            history,
            api,
            registry: ConversationRegistry::new(),
            assembler: Assembler::new(),
            credential: credential.into(),
            user_id,
            connected: false,
            event_tx,
        }
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Subscribe to raw channel events, for driving [`handle_event`]
    /// from the caller's event loop.
    ///
    /// [`handle_event`]: Self::handle_event
    pub fn channel_events(&self) -> broadcast::Receiver<ChannelEvent> {
        self.channel.subscribe()
    }

    // --- read surface for the presentation layer ---

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn is_typing(&self) -> bool {
        self.assembler.is_typing()
    }

    pub fn messages(&self) -> &[Message] {
        self.assembler.messages()
    }

    pub fn conversations(&self) -> &[Conversation] {
        self.registry.list()
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.registry.active().and_then(|id| self.registry.get(id))
    }

    /// Connect the channel, fetch the conversation list, and enter the
    /// first conversation.
    pub async fn start(&mut self) -> Result<()> {
        self.channel.connect(&self.credential).await?;
        self.connected = self.channel.is_connected();
        self.emit(SessionEvent::ConnectionChanged {
            connected: self.connected,
        });

        match self.api.list_conversations().await {
            Ok(conversations) => self.load_conversations(conversations),
            Err(e) => tracing::error!("failed to load conversations: {}", e),
        }

        if let Some(id) = self.registry.active().map(str::to_string) {
            self.enter_conversation(&id).await;
        }
        Ok(())
    }

    /// Seed the registry from a conversation-list fetch. The first
    /// conversation becomes active if none is.
    pub fn load_conversations(&mut self, conversations: Vec<Conversation>) {
        self.registry.set_conversations(conversations);
        self.emit(SessionEvent::ConversationsChanged);
    }

    /// Dispatch one inbound channel event. Runs to completion.
    pub fn handle_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Connected => {
                self.connected = true;
                self.emit(SessionEvent::ConnectionChanged { connected: true });
            }
            ChannelEvent::Disconnected { reason } => {
                if let Some(reason) = &reason {
                    tracing::warn!("channel disconnected: {}", reason);
                }
                self.connected = false;
                self.emit(SessionEvent::ConnectionChanged { connected: false });
            }
            ChannelEvent::Server(server_event) => self.handle_server_event(server_event),
        }
    }

    fn handle_server_event(&mut self, event: motorchat_api::wire::ServerEvent) {
        use motorchat_api::wire::ServerEvent;

        match event {
            ServerEvent::MessageChunk(chunk) => {
                let was_typing = self.assembler.is_typing();
                if self.assembler.apply_chunk(self.registry.active(), &chunk) {
                    self.emit(SessionEvent::MessagesChanged);
                    if !was_typing {
                        self.emit(SessionEvent::TypingChanged { typing: true });
                    }
                }
            }
            ServerEvent::MessageComplete(complete) => {
                if self.assembler.apply_complete(self.registry.active(), complete) {
                    self.emit(SessionEvent::MessagesChanged);
                    self.emit(SessionEvent::TypingChanged { typing: false });
                }
            }
            ServerEvent::Error(error) => {
                tracing::error!("server error: {}", error.message);
                self.assembler.abort_reply();
                self.emit(SessionEvent::TypingChanged { typing: false });
                self.emit(SessionEvent::Alert {
                    message: error.message,
                });
            }
        }
    }

    /// Make `id` the active conversation, swapping room membership and
    /// reloading history. A no-op when `id` is already active.
    pub async fn switch_to(&mut self, id: &str) -> Result<()> {
        if !self.registry.contains(id) {
            return Err(Error::UnknownConversation(id.to_string()));
        }
        if !self.registry.activate(id) {
            return Ok(());
        }
        let id = id.to_string();
        self.enter_conversation(&id).await;
        Ok(())
    }

    /// The activation sequence: leave every joined room, join the new
    /// one, discard the in-memory view, then load history. No fragment
    /// from the old conversation can land after the reset because every
    /// fragment is filtered against the already-updated active id.
    async fn enter_conversation(&mut self, id: &str) {
        for conversation in self.registry.list() {
            let leave = ClientEvent::LeaveConversation {
                conversation_id: conversation.id.clone(),
            };
            if let Err(e) = self.channel.send(leave).await {
                tracing::debug!("leave_conversation not sent: {}", e);
            }
        }
        let join = ClientEvent::JoinConversation {
            conversation_id: id.to_string(),
        };
        if let Err(e) = self.channel.send(join).await {
            tracing::warn!("join_conversation not sent: {}", e);
        }

        self.assembler.reset();
        self.emit(SessionEvent::MessagesChanged);
        self.emit(SessionEvent::TypingChanged { typing: false });
        self.emit(SessionEvent::ActiveChanged {
            conversation_id: Some(id.to_string()),
        });

        match self.history.load(id).await {
            Ok(messages) => {
                // the fetch may resolve after another switch; apply only
                // if this conversation is still the active one
                if self.registry.active() == Some(id) {
                    self.assembler.replace_all(messages);
                    self.emit(SessionEvent::MessagesChanged);
                } else {
                    tracing::debug!("discarding stale history for {}", id);
                }
            }
            Err(e) => tracing::error!("failed to load history for {}: {}", id, e),
        }
    }

    /// Send a user message: optimistic local append, then the outbound
    /// emit. Whitespace-only input is a no-op.
    pub async fn send(&mut self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        if !self.connected {
            return Err(Error::Disconnected);
        }
        let Some(conversation_id) = self.registry.active().map(str::to_string) else {
            return Err(Error::NoActiveConversation);
        };

        self.assembler.push_user(text);
        self.emit(SessionEvent::MessagesChanged);

        let outbound = ClientEvent::SendMessage {
            message: text.to_string(),
            conversation_id,
            user_id: self.user_id,
        };
        // no rollback of the optimistic append on failure
        self.channel.send(outbound).await.inspect_err(|e| {
            tracing::error!("send_message not sent: {}", e);
        })
    }

    /// Create a conversation and switch to it
    pub async fn create(&mut self, title: &str) -> Result<String> {
        let conversation = self.api.create_conversation(title).await?;
        let id = conversation.id.clone();
        self.registry.insert(conversation);
        self.emit(SessionEvent::ConversationsChanged);
        self.switch_to(&id).await?;
        Ok(id)
    }

    /// Rename a conversation
    pub async fn rename(&mut self, id: &str, title: &str) -> Result<()> {
        self.api.rename_conversation(id, title).await?;
        if !self.registry.rename_local(id, title) {
            return Err(Error::UnknownConversation(id.to_string()));
        }
        self.emit(SessionEvent::ConversationsChanged);
        Ok(())
    }

    /// Delete a conversation. Deleting the active one promotes the next
    /// remaining conversation, or empties the view.
    pub async fn remove(&mut self, id: &str) -> Result<()> {
        self.api.delete_conversation(id).await?;
        match self.registry.remove(id) {
            RemovalOutcome::NotFound => Err(Error::UnknownConversation(id.to_string())),
            RemovalOutcome::Removed {
                new_active,
                active_changed,
            } => {
                self.emit(SessionEvent::ConversationsChanged);
                if active_changed {
                    match new_active {
                        Some(next) => self.enter_conversation(&next).await,
                        None => {
                            self.assembler.reset();
                            self.emit(SessionEvent::MessagesChanged);
                            self.emit(SessionEvent::ActiveChanged {
                                conversation_id: None,
                            });
                        }
                    }
                }
                Ok(())
            }
        }
    }

    /// Tear down the channel connection
    pub async fn shutdown(&mut self) {
        self.channel.disconnect().await;
        self.connected = false;
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }
}
