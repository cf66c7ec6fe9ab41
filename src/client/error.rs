use thiserror::Error;

use crate::blog::ValidationErrors;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by the client core.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The referenced post, comment or user does not exist (404).
    #[error("Resource not found")]
    NotFound,

    /// The server rejected the submission (422).
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Network failure, timeout or an unreadable response body.
    #[error("Transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// Any other non-success status.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Comments can only be listed inside a post.
    #[error("Comments must be scoped to a post")]
    MissingScope,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Failures worth showing as a transient notice rather than form errors.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Server { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
