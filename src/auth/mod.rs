//! Token-based access control.

pub mod guard;
pub mod verifier;

pub use guard::AccessGuard;
pub use verifier::{
    issue_token, CacheConfig, CacheStats, SigningSecret, TokenVerifier, VerificationMode,
    VerifiedToken,
};

/// Authentication failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No bearer credential was presented.
    #[error("no bearer token provided")]
    MissingCredential,
    /// The credential is malformed, expired, or signed with another key.
    #[error("invalid token: {0}")]
    InvalidCredential(String),
}
