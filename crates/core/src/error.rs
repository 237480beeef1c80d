//! Error types for the Bravo Mind domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! None of these are fatal to a chat turn: the turn boundary converts every
//! generator failure into a displayable reply.

use thiserror::Error;

/// The top-level error type for Bravo Mind operations outside a chat turn
/// (gateway startup and listener plumbing).
#[derive(Debug, Error)]
pub enum Error {
    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Safety pipeline construction ---
    #[error("Safety pipeline error: {message}")]
    Pipeline { message: String },

    // --- Listener / socket ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the external text generator.
///
/// Each variant maps to a distinct routing decision at the turn boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider returned an empty response")]
    EmptyResponse,

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// HTTP status code associated with this failure, if the provider answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { status_code, .. } => Some(*status_code),
            Self::RateLimited { .. } => Some(429),
            Self::AuthenticationFailed(_) => Some(401),
            _ => None,
        }
    }

    /// Whether the generator could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = ProviderError::ApiError {
            status_code: 503,
            message: "Service unavailable".into(),
        };
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("Service unavailable"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("port taken"));
    }

    #[test]
    fn status_codes_follow_variant() {
        assert_eq!(
            ProviderError::RateLimited { retry_after_secs: 5 }.status_code(),
            Some(429)
        );
        assert_eq!(
            ProviderError::AuthenticationFailed("bad key".into()).status_code(),
            Some(401)
        );
        assert_eq!(ProviderError::EmptyResponse.status_code(), None);
        assert_eq!(ProviderError::Network("refused".into()).status_code(), None);
    }

    #[test]
    fn unreachable_covers_network_and_timeout() {
        assert!(ProviderError::Network("reset".into()).is_unreachable());
        assert!(ProviderError::Timeout("30s".into()).is_unreachable());
        assert!(!ProviderError::EmptyResponse.is_unreachable());
    }
}
