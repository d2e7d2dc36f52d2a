//! Generation error types.

use crate::protocol::ProtocolError;
use std::time::Duration;
use thiserror::Error;

/// Error reported by a generation service, with a classification the
/// caller can use for its own retry policy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub message: String,
}

impl ServiceError {
    pub fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Network, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::RateLimit, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::ServerError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Auth, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::InvalidRequest, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Unknown, message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    /// Network issues, dropped connections
    Network,
    /// Rate limited by the provider
    RateLimit,
    /// Provider-side failure (5xx)
    ServerError,
    /// Credentials rejected
    Auth,
    /// The provider rejected the request as malformed
    InvalidRequest,
    Unknown,
}

impl ServiceErrorKind {
    /// Whether a caller-side retry could plausibly succeed. The engine
    /// itself never retries.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::ServerError)
    }
}

/// A step could not produce transitions.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerationError {
    #[error("generation failed: {0}")]
    Service(#[from] ServiceError),

    #[error("generation failed: no response within {0:?}")]
    TimedOut(Duration),

    #[error("generation failed: {0}")]
    Protocol(#[from] ProtocolError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_kinds() {
        assert!(ServiceErrorKind::Network.is_transient());
        assert!(ServiceErrorKind::RateLimit.is_transient());
        assert!(ServiceErrorKind::ServerError.is_transient());
        assert!(!ServiceErrorKind::Auth.is_transient());
        assert!(!ServiceErrorKind::InvalidRequest.is_transient());
        assert!(!ServiceErrorKind::Unknown.is_transient());
    }

    #[test]
    fn generation_error_messages() {
        let err = GenerationError::from(ServiceError::auth("bad key"));
        assert_eq!(err.to_string(), "generation failed: bad key");

        let err = GenerationError::from(ProtocolError::NoTransitionsProduced);
        assert_eq!(
            err.to_string(),
            "generation failed: Response contained no transitions"
        );

        let err = GenerationError::TimedOut(Duration::from_secs(5));
        assert_eq!(err.to_string(), "generation failed: no response within 5s");
    }
}
