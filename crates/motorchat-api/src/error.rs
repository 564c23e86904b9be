//! Error types for motorchat-api

use thiserror::Error;

/// Result type alias using motorchat-api Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the REST collaborator
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend returned a non-success status
    #[error("API error: HTTP {status}: {message}")]
    Status { status: u16, message: String },
}

impl Error {
    /// Whether this error came from an authentication/authorization failure.
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Status { status: 401 | 403, .. })
    }
}
