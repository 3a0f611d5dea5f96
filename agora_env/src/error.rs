//! Error types for the Agora environment core.

use thiserror::Error;

/// Errors surfaced by the environment core and its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    /// Malformed registration input (caller bug, not retried)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Token/participant mismatch on act or deregister
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Shared-state lookup miss
    #[error("Not found: {0}")]
    NotFound(String),

    /// A collaborator has no data for the request
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Contract violation from a collaborator; aborts the run
    #[error("Fatal: {0}")]
    Fatal(String),
}

impl EnvError {
    /// Creates an invalid request error.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Creates an unauthorized error.
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// Creates a not-found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Creates an unavailable error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Creates a fatal error.
    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    /// Short label for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid request",
            Self::Unauthorized(_) => "unauthorized",
            Self::NotFound(_) => "not found",
            Self::Unavailable(_) => "unavailable",
            Self::Fatal(_) => "fatal",
        }
    }

    /// True when the error means "the requested state does not exist".
    pub fn is_missing_state(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Unavailable(_))
    }

    /// True for errors that must abort the simulation run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(EnvError::not_found("x").is_missing_state());
        assert!(EnvError::unavailable("x").is_missing_state());
        assert!(!EnvError::fatal("x").is_missing_state());
        assert!(EnvError::fatal("x").is_fatal());
        assert!(!EnvError::unauthorized("x").is_fatal());
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(EnvError::invalid_request("x").kind(), "invalid request");
        assert_eq!(EnvError::unauthorized("x").kind(), "unauthorized");
        assert_eq!(EnvError::unavailable("x").kind(), "unavailable");
    }

    #[test]
    fn test_error_display() {
        let err = EnvError::not_found("global state 'time'");
        assert_eq!(err.to_string(), "Not found: global state 'time'");
    }
}
