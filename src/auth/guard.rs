//! Access guard: "require a valid identity" in front of an operation.

use std::sync::Arc;

use http::header::AUTHORIZATION;
use http::HeaderMap;

use super::verifier::TokenVerifier;
use super::AuthError;
use crate::types::Identity;

const BEARER_PREFIX: &str = "Bearer ";

/// Extracts and verifies the bearer credential of a request.
#[derive(Clone)]
pub struct AccessGuard {
    verifier: Arc<TokenVerifier>,
}

impl AccessGuard {
    /// Create a guard backed by `verifier`.
    pub fn new(verifier: Arc<TokenVerifier>) -> Self {
        Self { verifier }
    }

    /// The underlying verifier.
    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Authenticate a request from its headers.
    ///
    /// `MissingCredential` when no token is presented, `InvalidCredential`
    /// when one is presented but does not verify.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, AuthError> {
        let token = bearer_token(headers)?;
        let verified = self.verifier.verify_detailed(token).map_err(|e| {
            tracing::debug!(error = %e, "bearer token rejected");
            e
        })?;

        tracing::info!(
            target: "hotel_reviews::metrics",
            metric_type = "token_verification",
            cache_hit = verified.cache_hit,
            "token_verification_metric"
        );

        Ok(Identity::from_verified(verified.claims))
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = match headers.get(AUTHORIZATION) {
        Some(value) => value,
        None => return Err(AuthError::MissingCredential),
    };

    let value = value
        .to_str()
        .map_err(|_| AuthError::InvalidCredential("authorization header is not ASCII".to_string()))?
        .trim();

    if value.is_empty() || value == BEARER_PREFIX.trim_end() {
        return Err(AuthError::MissingCredential);
    }

    match value.strip_prefix(BEARER_PREFIX) {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        Some(_) => Err(AuthError::MissingCredential),
        None => Err(AuthError::InvalidCredential(
            "expected a Bearer authorization scheme".to_string(),
        )),
    }
}
