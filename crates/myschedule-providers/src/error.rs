//! Error types for fetching and normalizing calendar events.
//!
//! [`ProviderError`] covers everything that goes wrong while talking to the
//! calendar service: missing sessions and transport failures. [`FormatError`]
//! covers a single fetched record that cannot be normalized.

use std::fmt;

use myschedule_core::TimeError;
use thiserror::Error;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// Not logged in, or credentials are invalid/expired.
    AuthenticationFailed,
    /// Authorization failed - user lacks permission.
    AuthorizationFailed,
    /// Network error - connection failed, timeout, DNS resolution, etc.
    NetworkError,
    /// Rate limit exceeded - too many requests.
    RateLimited,
    /// Server returned an error (5xx status codes or unexpected statuses).
    ServerError,
    /// Invalid response from the server - parse error, unexpected format.
    InvalidResponse,
    /// Configuration error - missing or invalid config.
    ConfigurationError,
    /// Internal provider error - unexpected state, bug.
    InternalError,
}

impl ProviderErrorCode {
    /// Returns true if the user has to log on before anything can be fetched.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::AuthenticationFailed)
    }

    /// Returns true if this is a failure of the fetch itself.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::AuthorizationFailed
                | Self::NetworkError
                | Self::RateLimited
                | Self::ServerError
                | Self::InvalidResponse
        )
    }

    /// Returns a machine-readable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::ConfigurationError => "configuration_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while interacting with a calendar provider.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    /// The provider that generated this error (e.g., "graph").
    provider: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates a new provider error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthorizationFailed, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RateLimited, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServerError, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InternalError, message)
    }

    /// Sets the provider name for this error.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Returns true if the caller has to log on first.
    pub fn is_authentication(&self) -> bool {
        self.code.is_authentication()
    }

    /// Returns true if the fetch itself failed.
    pub fn is_transport(&self) -> bool {
        self.code.is_transport()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// A single fetched record that cannot be turned into a canonical event.
///
/// `event` identifies the record in messages: its subject when present,
/// otherwise its id, otherwise `"<unnamed>"`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// A required field is absent.
    #[error("event '{event}' is missing required field '{field}'")]
    MissingField { event: String, field: &'static str },

    /// The start time or its zone could not be interpreted.
    #[error("event '{event}' has an unusable start time: {source}")]
    InvalidStart {
        event: String,
        #[source]
        source: TimeError,
    },
}

impl FormatError {
    /// Returns the label of the offending record.
    pub fn event(&self) -> &str {
        match self {
            Self::MissingField { event, .. } | Self::InvalidStart { event, .. } => event,
        }
    }
}
