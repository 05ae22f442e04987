//! Identity claims carried by bearer tokens.

use serde::{Deserialize, Serialize};

use super::review::UserId;

/// Decoded identity assertions of a bearer token.
///
/// The user id is read from `userId`, then `id`, then the registered `sub`
/// claim. Tokens from the user login service carry `id`; any mix of the
/// three is accepted and the first present one wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawClaims")]
pub struct Claims {
    /// Authenticated user.
    #[serde(rename = "userId")]
    pub user_id: UserId,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
    /// Display name, when the issuer includes it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Wire form of [`Claims`] before the user id is chosen.
#[derive(Deserialize)]
struct RawClaims {
    #[serde(default, rename = "userId")]
    user_id: Option<UserId>,
    #[serde(default)]
    id: Option<UserId>,
    #[serde(default)]
    sub: Option<UserId>,
    #[serde(default)]
    iat: i64,
    exp: i64,
    #[serde(default)]
    username: Option<String>,
}

impl TryFrom<RawClaims> for Claims {
    type Error = &'static str;

    fn try_from(raw: RawClaims) -> Result<Self, Self::Error> {
        let user_id = raw
            .user_id
            .or(raw.id)
            .or(raw.sub)
            .ok_or("token carries no userId, id or sub claim")?;
        Ok(Self {
            user_id,
            iat: raw.iat,
            exp: raw.exp,
            username: raw.username,
        })
    }
}

impl Claims {
    /// Create claims for a user.
    pub fn new(user_id: UserId, issued_at: i64, expires_at: i64) -> Self {
        Self {
            user_id,
            iat: issued_at,
            exp: expires_at,
            username: None,
        }
    }

    /// Attach a display name.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Whether `exp` (plus `leeway` seconds) lies before `now`.
    pub fn is_expired_at(&self, now: i64, leeway: u64) -> bool {
        self.exp.saturating_add(leeway as i64) < now
    }
}

/// Proof that a request passed the access guard.
///
/// Built only inside this crate, after a token verified, which makes
/// verified claims the sole source of a review's author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    claims: Claims,
}

impl Identity {
    pub(crate) fn from_verified(claims: Claims) -> Self {
        Self { claims }
    }

    /// The verified claims.
    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    /// The authenticated user.
    pub fn user_id(&self) -> &UserId {
        &self.claims.user_id
    }

    /// Display name asserted by the token, if any.
    pub fn username(&self) -> Option<&str> {
        self.claims.username.as_deref()
    }
}
