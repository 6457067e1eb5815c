//! # DomainError
//!
//! Centralized error handling for the talkboard ecosystem.
//! Every rule-engine rejection is a first-class variant; store and credential
//! failures collapse into `Internal`.

use thiserror::Error;

/// Which authored entity an ownership check was run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authored {
    Thread,
    Reply,
}

impl std::fmt::Display for Authored {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Authored::Thread => "thread",
            Authored::Reply => "reply",
        })
    }
}

/// The primary error type for all talkboard operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or missing request body.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Input present but violates a declared constraint.
    #[error("{0}")]
    ValidationFailed(String),

    /// Forum, Thread, Reply or User is absent or soft-deleted.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Duplicate forum name, email or student id.
    #[error("{0}")]
    AlreadyExists(String),

    #[error("user is already a member of the forum")]
    AlreadyMember,

    #[error("user is not a member of the forum")]
    NotMember,

    #[error("user is not a moderator of the forum")]
    NotModerator,

    #[error("user did not create the {0}")]
    NotCreator(Authored),

    #[error("role not authorized for this action")]
    RoleNotAuthorized,

    /// Missing, invalid or expired credential.
    #[error("unauthorized")]
    Unauthorized,

    #[error("failed to login because of wrong email or password")]
    FailedLogin,

    /// Infrastructure failure (DB down, hashing failure, token signing).
    #[error("internal failure: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn internal(err: impl std::fmt::Display) -> Self {
        DomainError::Internal(err.to_string())
    }

    /// Short machine-readable label, used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::BadRequest(_) => "bad_request",
            DomainError::ValidationFailed(_) => "validation_failed",
            DomainError::NotFound(_) => "not_found",
            DomainError::AlreadyExists(_) => "already_exists",
            DomainError::AlreadyMember => "already_member",
            DomainError::NotMember => "not_member",
            DomainError::NotModerator => "not_moderator",
            DomainError::NotCreator(_) => "not_creator",
            DomainError::RoleNotAuthorized => "role_not_authorized",
            DomainError::Unauthorized => "unauthorized",
            DomainError::FailedLogin => "failed_login",
            DomainError::Internal(_) => "internal",
        }
    }
}

/// A specialized Result type for talkboard logic.
pub type Result<T> = std::result::Result<T, DomainError>;
