//! Error types for the chat client.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

/// Primary error type for all client operations.
///
/// Most stream-level problems never surface as a `KhojError`: malformed
/// frames degrade to plain text and malformed edit directives are skipped.
/// What remains is transport, configuration and side-effect failures.
#[derive(Error, Debug)]
pub enum KhojError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Failed to apply edits to {path}: {message}")]
    EditApply { path: String, message: String },

    #[error("Cancelled")]
    Cancelled,
}

impl KhojError {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::Network(_) | Self::Stream(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            Self::Io(_) | Self::EditApply { .. } => ErrorCategory::FileSystem,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::InvalidState(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit
                | ErrorCategory::Network
                | ErrorCategory::Timeout
                | ErrorCategory::Server
        )
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Authentication => RecoverySuggestion::CheckCredentials,
            ErrorCategory::RateLimit => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Network => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Timeout => RecoverySuggestion::IncreaseTimeout,
            ErrorCategory::Server => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::FileSystem => RecoverySuggestion::CheckFilePermissions,
            ErrorCategory::Cancelled => RecoverySuggestion::None,
            _ => RecoverySuggestion::ContactSupport,
        }
    }

    /// Short text suitable for showing inline in place of a failed response.
    pub fn display_message(&self) -> String {
        match self.category() {
            ErrorCategory::Authentication => {
                "Unable to authenticate with the Khoj server. Check your API key in settings."
                    .to_string()
            }
            ErrorCategory::RateLimit => {
                "The Khoj server is rate limiting requests. Wait a moment and retry.".to_string()
            }
            ErrorCategory::Configuration => format!("Client is misconfigured: {self}"),
            ErrorCategory::Cancelled => "Response cancelled.".to_string(),
            _ => "Sorry, unable to get response from the Khoj server. Retry or contact the developers for help."
                .to_string(),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, KhojError>;
