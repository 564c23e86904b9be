//! Error types for motorchat-session

use thiserror::Error;

/// Result type alias using motorchat-session Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during session operations
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the REST collaborator
    #[error(transparent)]
    Api(#[from] motorchat_api::Error),

    /// The streaming channel failed
    #[error("Channel error: {0}")]
    Channel(String),

    /// Operation requires a live connection
    #[error("Not connected")]
    Disconnected,

    /// Operation requires an active conversation
    #[error("No active conversation")]
    NoActiveConversation,

    /// The given conversation id is not in the registry
    #[error("Unknown conversation: {0}")]
    UnknownConversation(String),
}
