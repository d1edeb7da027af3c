//! Provider error types
//!
//! Error definitions with transient/permanent classification so callers
//! can decide what is worth retrying.

use thiserror::Error;

/// Error that can occur while fetching inventory from a provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    // Connection errors (usually transient)
    /// Failed to establish connection to the management system.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Connection timed out.
    #[error("connection timeout after {timeout_secs} seconds")]
    ConnectionTimeout { timeout_secs: u64 },

    /// Management system is temporarily unavailable.
    #[error("management system unavailable: {message}")]
    Unavailable { message: String },

    // Authentication errors (permanent)
    /// Invalid credentials provided.
    #[error("authentication failed: invalid credentials")]
    AuthenticationFailed,

    // Configuration errors (permanent)
    /// Provider configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// The provider does not expose the requested collection.
    #[error("unsupported collection: {collection}")]
    UnsupportedCollection { collection: String },

    // Data errors
    /// The provider returned data that could not be interpreted.
    #[error("invalid data: {message}")]
    InvalidData { message: String },

    /// Internal error.
    #[error("internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ProviderError {
    /// Check if this error is transient and the fetch may be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::ConnectionFailed { .. }
                | ProviderError::ConnectionTimeout { .. }
                | ProviderError::Unavailable { .. }
        )
    }

    /// Check if this error is permanent and retry won't help.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            ProviderError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            ProviderError::ConnectionTimeout { .. } => "CONNECTION_TIMEOUT",
            ProviderError::Unavailable { .. } => "UNAVAILABLE",
            ProviderError::AuthenticationFailed => "AUTH_FAILED",
            ProviderError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            ProviderError::UnsupportedCollection { .. } => "UNSUPPORTED_COLLECTION",
            ProviderError::InvalidData { .. } => "INVALID_DATA",
            ProviderError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    // Convenience constructors

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        ProviderError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection failed error with source.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ProviderError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        ProviderError::Unavailable {
            message: message.into(),
        }
    }

    /// Create an invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        ProviderError::InvalidData {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ProviderError::Internal {
            message: message.into(),
            source: None,
        }
    }
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
