//! Chat service error types

use crate::connection::RegistryError;
use crate::protocol::CloseCode;
use relay_core::DomainError;
use thiserror::Error;
use validator::ValidationErrors;

/// Errors surfaced by [`super::ChatService`] operations
#[derive(Debug, Error)]
pub enum ChatError {
    /// Malformed request or frame
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No verified identity was supplied
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Invalid credentials")]
    InvalidCredential,

    #[error("User is already logged in: {0}")]
    AlreadyLoggedIn(String),

    /// The user has no session in the registry
    #[error("User is not logged in: {0}")]
    NotFound(String),

    /// Dependency or transport failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidArgument(_) => 400,
            Self::Unauthenticated | Self::InvalidCredential => 401,
            Self::NotFound(_) => 404,
            Self::AlreadyLoggedIn(_) => 409,
            Self::Internal(_) => 500,
        }
    }

    /// Get the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::InvalidCredential => "INVALID_CREDENTIALS",
            Self::AlreadyLoggedIn(_) => "ALREADY_LOGGED_IN",
            Self::NotFound(_) => "NOT_LOGGED_IN",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Close code for a chat stream ended by this error
    pub fn close_code(&self) -> CloseCode {
        match self {
            Self::InvalidArgument(_) => CloseCode::InvalidArgument,
            Self::Unauthenticated | Self::InvalidCredential => CloseCode::Unauthenticated,
            Self::NotFound(_) => CloseCode::NotLoggedIn,
            Self::AlreadyLoggedIn(_) | Self::Internal(_) => CloseCode::Internal,
        }
    }
}

impl From<DomainError> for ChatError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidCredential => Self::InvalidCredential,
            DomainError::InvalidUsername(name) => {
                Self::InvalidArgument(format!("invalid username: {name}"))
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<RegistryError> for ChatError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::AlreadyLoggedIn(name) => Self::AlreadyLoggedIn(name),
            RegistryError::NotLoggedIn(name) | RegistryError::NotFound(name) => Self::NotFound(name),
        }
    }
}

impl From<ValidationErrors> for ChatError {
    fn from(err: ValidationErrors) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

/// Chat service result type
pub type ChatResult<T> = Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ChatError::invalid_argument("x").status_code(), 400);
        assert_eq!(ChatError::Unauthenticated.status_code(), 401);
        assert_eq!(ChatError::InvalidCredential.status_code(), 401);
        assert_eq!(ChatError::NotFound("a".into()).status_code(), 404);
        assert_eq!(ChatError::AlreadyLoggedIn("a".into()).status_code(), 409);
        assert_eq!(ChatError::internal("x").status_code(), 500);
    }

    #[test]
    fn test_close_codes() {
        assert_eq!(
            ChatError::invalid_argument("x").close_code(),
            CloseCode::InvalidArgument
        );
        assert_eq!(ChatError::Unauthenticated.close_code(), CloseCode::Unauthenticated);
        assert_eq!(ChatError::NotFound("a".into()).close_code(), CloseCode::NotLoggedIn);
        assert_eq!(ChatError::internal("x").close_code(), CloseCode::Internal);
    }

    #[test]
    fn test_from_registry_error() {
        assert!(matches!(
            ChatError::from(RegistryError::AlreadyLoggedIn("a".into())),
            ChatError::AlreadyLoggedIn(_)
        ));
        assert!(matches!(
            ChatError::from(RegistryError::NotLoggedIn("a".into())),
            ChatError::NotFound(_)
        ));
        assert!(matches!(
            ChatError::from(RegistryError::NotFound("a".into())),
            ChatError::NotFound(_)
        ));
    }

    #[test]
    fn test_from_domain_error() {
        assert!(matches!(
            ChatError::from(DomainError::InvalidCredential),
            ChatError::InvalidCredential
        ));
        assert!(matches!(
            ChatError::from(DomainError::Store("down".into())),
            ChatError::Internal(_)
        ));
        assert!(matches!(
            ChatError::from(DomainError::InvalidUsername("x".into())),
            ChatError::InvalidArgument(_)
        ));
    }
}
