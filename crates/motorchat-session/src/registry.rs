//! Conversation registry: the set of known threads and which one is active
//!
//! Pure local bookkeeping. The channel room swap and history reload that
//! accompany an activation are orchestrated by the session controller so
//! this type stays synchronous.

use motorchat_api::types::Conversation;

/// Result of removing a conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalOutcome {
    /// The id was not in the registry
    NotFound,
    /// The conversation was removed
    Removed {
        /// Active id after removal
        new_active: Option<String>,
        /// Whether the removal changed the active conversation
        active_changed: bool,
    },
}

/// Holds the known conversation threads and the single active one
#[derive(Default)]
pub struct ConversationRegistry {
    conversations: Vec<Conversation>,
    active: Option<String>,
}

impl ConversationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All known conversations in stable list order
    pub fn list(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Id of the active conversation, if any
    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Replace the list with a fresh fetch. If nothing is active yet the
    /// first conversation becomes active.
    pub fn set_conversations(&mut self, conversations: Vec<Conversation>) {
        self.conversations = conversations;
        match &self.active {
            Some(id) if self.contains(id) => {}
            _ => self.active = self.conversations.first().map(|c| c.id.clone()),
        }
    }

    /// Append a newly created conversation
    pub fn insert(&mut self, conversation: Conversation) {
        self.conversations.push(conversation);
    }

    /// Update a title locally after a successful rename call
    pub fn rename_local(&mut self, id: &str, title: &str) -> bool {
        match self.conversations.iter_mut().find(|c| c.id == id) {
            Some(conversation) => {
                conversation.title = title.to_string();
                true
            }
            None => false,
        }
    }

    /// Make `id` the active conversation. Returns `false` if the id is
    /// unknown or already active (no transition needed).
    pub fn activate(&mut self, id: &str) -> bool {
        if !self.contains(id) || self.active.as_deref() == Some(id) {
            return false;
        }
        self.active = Some(id.to_string());
        true
    }

    /// Remove a conversation. Removing the active one promotes the first
    /// remaining conversation, or clears the active id if none remain.
    pub fn remove(&mut self, id: &str) -> RemovalOutcome {
        let Some(index) = self.conversations.iter().position(|c| c.id == id) else {
            return RemovalOutcome::NotFound;
        };
        self.conversations.remove(index);

        let was_active = self.active.as_deref() == Some(id);
        if was_active {
            self.active = self.conversations.first().map(|c| c.id.clone());
        }
        RemovalOutcome::Removed {
            new_active: self.active.clone(),
            active_changed: was_active,
        }
    }
}
