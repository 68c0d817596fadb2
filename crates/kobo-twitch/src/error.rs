//! Error types for Twitch Helix operations.

use thiserror::Error;

/// Result type for Twitch operations.
pub type TwitchResult<T> = Result<T, TwitchError>;

/// Errors from the Helix client.
#[derive(Debug, Error)]
pub enum TwitchError {
    #[error("Twitch credentials not configured (TWITCH_CLIENT_ID / TWITCH_SECRET)")]
    MissingCredentials,

    #[error("token request failed: {0}")]
    Token(String),

    #[error("Helix API error: status {status}")]
    Api { status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl TwitchError {
    /// Create a token failure error.
    pub fn token(message: impl Into<String>) -> Self {
        Self::Token(message.into())
    }
}
