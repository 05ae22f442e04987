//! Error taxonomy of the review lifecycle.

use crate::auth::AuthError;
use crate::types::ReviewStatus;

/// Errors surfaced by the review service and its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReviewError {
    /// No bearer credential was presented.
    #[error("missing credential")]
    MissingCredential,

    /// The bearer credential could not be verified.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// A field failed validation.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Offending field, in its wire (camelCase) spelling.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// The moderation state machine refused the change.
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: ReviewStatus,
        /// Requested status.
        to: ReviewStatus,
    },

    /// Unknown review or hotel.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record looked up.
        entity: &'static str,
        /// Id that was not found.
        id: String,
    },

    /// Storage or connectivity failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ReviewError {
    /// Build a validation error for `field`.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Build a not-found error.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Machine-readable code used in error responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredential => "MISSING_CREDENTIAL",
            Self::InvalidCredential(_) => "INVALID_CREDENTIAL",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl From<AuthError> for ReviewError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredential => Self::MissingCredential,
            AuthError::InvalidCredential(reason) => Self::InvalidCredential(reason),
        }
    }
}
