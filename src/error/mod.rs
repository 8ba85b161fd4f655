//! Error types for skill-runner.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

/// Primary error type for all skill-runner operations.
#[derive(Error, Debug)]
pub enum SkillError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    /// The model session failed. Terminal for that session.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The caller broke the one-turn-at-a-time protocol.
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Session closed")]
    Closed,

    #[error("Action error: {0}")]
    Action(String),

    #[error("Skill not found: {0}")]
    SkillNotFound(String),
}

impl SkillError {
    /// Create an API error from a status code and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::Network(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Configuration(_) | Self::SkillNotFound(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            Self::Transport(_) | Self::Closed => ErrorCategory::Session,
            Self::Protocol(_) => ErrorCategory::Protocol,
            Self::Action(_) => ErrorCategory::Action,
            Self::Io(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether this error is potentially retryable by the caller.
    ///
    /// Session errors are never retryable: the session is gone and a new
    /// runner has to be created.
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
            ErrorCategory::RateLimit
            | ErrorCategory::Network
            | ErrorCategory::Server => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Timeout => RecoverySuggestion::IncreaseTimeout,
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::Session => RecoverySuggestion::StartNewSession,
            ErrorCategory::Protocol => RecoverySuggestion::WaitForPendingTurn,
            ErrorCategory::Action => RecoverySuggestion::CheckActionScript,
            _ => RecoverySuggestion::ContactSupport,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, SkillError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_terminal() {
        let err = SkillError::transport("socket reset");
        assert_eq!(err.category(), ErrorCategory::Session);
        assert!(!err.is_retryable());
        assert_eq!(err.recovery_suggestion(), RecoverySuggestion::StartNewSession);
        assert_eq!(err.to_string(), "Transport error: socket reset");
    }

    #[test]
    fn api_status_drives_category() {
        assert_eq!(SkillError::api(401, "no").category(), ErrorCategory::Authentication);
        assert_eq!(SkillError::api(429, "slow").category(), ErrorCategory::RateLimit);
        assert_eq!(SkillError::api(503, "down").category(), ErrorCategory::Server);
        assert_eq!(SkillError::api(400, "bad").category(), ErrorCategory::Api);
        assert!(SkillError::api(503, "down").is_retryable());
    }
}
