//! Error types for the tenant gateway

use std::io;

use thiserror::Error;

/// Result type alias for the tenant gateway
pub type Result<T> = std::result::Result<T, Error>;

/// Tenant gateway errors
///
/// None of these reach an HTTP caller directly: the dispatcher folds every
/// failure into an [`Outcome`](crate::gateway::Outcome) before responding.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Identity provider answered with something other than accept/reject
    #[error("Identity provider error: {0}")]
    IdentityProvider(String),

    /// Backend did not answer within the configured timeout
    #[error("Backend timeout: {0}")]
    BackendTimeout(String),

    /// Backend connection or protocol failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Classify a `reqwest` failure raised while talking to the backend.
    #[must_use]
    pub fn from_backend(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::BackendTimeout(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }

    /// Whether this error came from a timed-out call
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::BackendTimeout(_) => true,
            Self::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}
