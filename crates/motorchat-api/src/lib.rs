//! motorchat-api: wire types and REST collaborator client
//!
//! This crate defines the data model shared by the live channel and the
//! persisted-history backend, the channel event protocol, and the REST
//! client used for conversation CRUD and history fetches.

pub mod client;
pub mod error;
pub mod types;
pub mod wire;

pub use client::ApiClient;
pub use error::{Error, Result};
pub use types::{
    CarProperty, CompletionPayload, Conversation, HistoryTurn, Message, Sender, StructuredReply,
};
pub use wire::{ClientEvent, ErrorEvent, MessageChunk, MessageComplete, ServerEvent};
