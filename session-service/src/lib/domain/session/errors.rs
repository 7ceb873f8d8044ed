use thiserror::Error;

use crate::domain::session::models::RefreshTokenId;
use crate::user::errors::UserError;

/// Error for RefreshTokenId parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshTokenIdError {
    #[error("Invalid UUID format: {0}")]
    InvalidFormat(String),
}

/// Opaque credential store failure (unavailable, timed out, rejected).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Credential store failure: {0}")]
pub struct StoreError(pub String);

/// Error for secret hashing operations
#[derive(Debug, Clone, Error)]
pub enum PasswordVerifierError {
    #[error("Hashing failed: {0}")]
    HashingFailed(String),
}

/// Error for access credential signing and verification
#[derive(Debug, Clone, Error)]
pub enum TokenCodecError {
    #[error("Failed to sign access token: {0}")]
    SigningFailed(String),

    #[error("Access token expired")]
    Expired,

    #[error("Access token invalid: {0}")]
    Invalid(String),
}

/// Infrastructure faults raised by the refresh token manager.
///
/// Expected outcomes (unknown id, revoked, expired, digest mismatch) are not
/// errors; they are reported through `TokenValidation` and `TombstoneOutcome`.
#[derive(Debug, Clone, Error)]
pub enum RefreshTokenError {
    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("Refresh token id collision: {0}")]
    IdCollision(RefreshTokenId),

    #[error(transparent)]
    Hashing(#[from] PasswordVerifierError),
}

/// Errors surfaced to the routing layer.
///
/// Every credential failure collapses into `Unauthorized`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Storage failure: {0}")]
    StorageFailure(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RefreshTokenError> for SessionError {
    fn from(err: RefreshTokenError) -> Self {
        match err {
            RefreshTokenError::Storage(e) => SessionError::StorageFailure(e.to_string()),
            RefreshTokenError::IdCollision(_) | RefreshTokenError::Hashing(_) => {
                SessionError::Internal(err.to_string())
            }
        }
    }
}

impl From<UserError> for SessionError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::EmailAlreadyExists(_) => SessionError::Conflict(err.to_string()),
            UserError::NotFound(_) => SessionError::NotFound(err.to_string()),
            UserError::DatabaseError(_) => SessionError::StorageFailure(err.to_string()),
            UserError::InvalidUserId(_) | UserError::InvalidName(_) | UserError::InvalidEmail(_) => {
                SessionError::Internal(err.to_string())
            }
        }
    }
}

impl From<PasswordVerifierError> for SessionError {
    fn from(err: PasswordVerifierError) -> Self {
        SessionError::Internal(err.to_string())
    }
}
