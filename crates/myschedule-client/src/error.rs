//! Client error types.

use myschedule_core::{RulesError, TimeError};
use myschedule_providers::{FormatError, ProviderError};
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Message shown when a command needs a session and there is none.
pub const NOT_AUTHENTICATED: &str = "You are not authenticated. Run 'myschedule logon' first";

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Authentication required.
    #[error("{0}")]
    AuthRequired(String),

    /// Fetching from the calendar service failed.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// A fetched record could not be normalized and the policy is to abort.
    #[error("malformed event: {0}")]
    Format(#[from] FormatError),

    #[error("invalid schedule rules: {0}")]
    Rules(#[from] RulesError),

    #[error("invalid date: {0}")]
    Time(#[from] TimeError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// The error for a missing session.
    pub fn not_authenticated() -> Self {
        Self::AuthRequired(NOT_AUTHENTICATED.to_string())
    }

    /// Process exit code: 2 when the user has to log on, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::AuthRequired(_) => 2,
            Self::Provider(e) if e.is_authentication() => 2,
            _ => 1,
        }
    }
}
