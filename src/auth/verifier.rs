//! Bearer token verification.
//!
//! Tokens are HS256-signed JWTs. The signing secret is injected at
//! construction; a verifier built without one rejects every token.
//!
//! ## Verification Modes
//!
//! | Mode | Use Case | Behaviour |
//! |------|----------|-----------|
//! | `Disabled` | Secret not configured | Every token is rejected |
//! | `LocalSecret` | Low traffic, tests | Signature checked on every call |
//! | `Cached` | High-throughput services | Verified claims kept in an LRU cache |
//!
//! Cached entries are keyed by an xxh64 digest of the token and store the
//! token itself, so a digest collision can never return another token's
//! claims. Expiry is re-checked on every cache hit.

use std::fmt;
use std::hash::Hasher;
use std::num::NonZeroUsize;
use std::sync::Arc;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use lru::LruCache;
use parking_lot::Mutex;
use xxhash_rust::xxh64::Xxh64;

use super::AuthError;
use crate::types::Claims;

/// Process-wide token signing secret.
#[derive(Clone)]
pub struct SigningSecret(Arc<Vec<u8>>);

impl SigningSecret {
    /// Wrap secret bytes. Returns `None` for an empty secret.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Option<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            None
        } else {
            Some(Self(Arc::new(bytes)))
        }
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(****)")
    }
}

/// Configuration for the verified-token cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries in the cache.
    pub max_entries: usize,
    /// Whether to enable the cache.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            enabled: true,
        }
    }
}

/// Verification mode for bearer tokens.
#[derive(Debug, Clone)]
pub enum VerificationMode {
    /// No secret configured: fail closed.
    Disabled,

    /// Verify the signature on every call.
    LocalSecret {
        /// The shared signing secret.
        secret: SigningSecret,
    },

    /// Verify with an LRU cache of verified claims.
    Cached {
        /// The shared signing secret.
        secret: SigningSecret,
        /// Cache configuration.
        config: CacheConfig,
    },
}

impl VerificationMode {
    /// Local verification, or `Disabled` when no secret is supplied.
    pub fn local_secret(secret: Option<SigningSecret>) -> Self {
        match secret {
            Some(secret) => Self::LocalSecret { secret },
            None => Self::Disabled,
        }
    }

    /// Cached verification with default settings, or `Disabled` without a secret.
    pub fn cached(secret: Option<SigningSecret>) -> Self {
        Self::cached_with_config(secret, CacheConfig::default())
    }

    /// Cached verification with custom settings, or `Disabled` without a secret.
    pub fn cached_with_config(secret: Option<SigningSecret>, config: CacheConfig) -> Self {
        match secret {
            Some(secret) => Self::Cached { secret, config },
            None => Self::Disabled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TokenCacheKey(u64);

impl TokenCacheKey {
    fn compute(token: &str) -> Self {
        let mut hasher = Xxh64::new(0);
        hasher.write(token.as_bytes());
        Self(hasher.finish())
    }
}

struct CachedToken {
    token: String,
    claims: Claims,
}

/// Claims returned by a successful verification.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    /// The decoded claims.
    pub claims: Claims,
    /// Whether this result came from cache.
    pub cache_hit: bool,
}

/// Token verifier with optional caching.
///
/// Thread-safe and suitable for sharing across request handlers.
pub struct TokenVerifier {
    mode: VerificationMode,
    leeway_secs: u64,
    cache: Option<Mutex<LruCache<TokenCacheKey, CachedToken>>>,
}

impl TokenVerifier {
    /// Create a new token verifier with the specified mode and no expiry leeway.
    pub fn new(mode: VerificationMode) -> Self {
        let cache = match &mode {
            VerificationMode::Cached { config, .. } if config.enabled => {
                let size = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
                Some(Mutex::new(LruCache::new(size)))
            }
            _ => None,
        };

        Self {
            mode,
            leeway_secs: 0,
            cache,
        }
    }

    /// Accept tokens up to `secs` seconds past their expiry.
    pub fn with_leeway(mut self, secs: u64) -> Self {
        self.leeway_secs = secs;
        self
    }

    /// Whether a signing secret is configured.
    pub fn is_enabled(&self) -> bool {
        !matches!(self.mode, VerificationMode::Disabled)
    }

    fn secret(&self) -> Option<&SigningSecret> {
        match &self.mode {
            VerificationMode::Disabled => None,
            VerificationMode::LocalSecret { secret } => Some(secret),
            VerificationMode::Cached { secret, .. } => Some(secret),
        }
    }

    /// Verify a token and return its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_detailed(token).map(|verified| verified.claims)
    }

    /// Verify a token, reporting whether the cache answered.
    pub fn verify_detailed(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        let secret = self.secret().ok_or_else(|| {
            tracing::error!("token verification attempted without a signing secret");
            AuthError::InvalidCredential("signing secret not configured".to_string())
        })?;

        let cache_key = TokenCacheKey::compute(token);

        if let Some(cache) = &self.cache {
            let mut cache = cache.lock();
            let cached = cache
                .peek(&cache_key)
                .filter(|entry| entry.token == token)
                .map(|entry| entry.claims.clone());
            if let Some(claims) = cached {
                if claims.is_expired_at(chrono::Utc::now().timestamp(), self.leeway_secs) {
                    cache.pop(&cache_key);
                    return Err(AuthError::InvalidCredential("token expired".to_string()));
                }
                return Ok(VerifiedToken {
                    claims,
                    cache_hit: true,
                });
            }
        }

        // Cache miss - perform full signature verification
        let claims = self.decode(secret, token)?;

        if let Some(cache) = &self.cache {
            cache.lock().put(
                cache_key,
                CachedToken {
                    token: token.to_string(),
                    claims: claims.clone(),
                },
            );
        }

        Ok(VerifiedToken {
            claims,
            cache_hit: false,
        })
    }

    fn decode(&self, secret: &SigningSecret, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway_secs;
        validation.set_required_spec_claims(&["exp"]);

        decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidCredential(e.to_string()))
    }

    /// Get cache statistics.
    ///
    /// Returns `None` if caching is disabled.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| {
            let cache = cache.lock();
            CacheStats {
                len: cache.len(),
                cap: cache.cap().get(),
            }
        })
    }

    /// Clear the verification cache.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.lock().clear();
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    /// Current number of entries in the cache.
    pub len: usize,
    /// Maximum capacity of the cache.
    pub cap: usize,
}

/// Sign claims as an HS256 token.
pub fn issue_token(secret: &SigningSecret, claims: &Claims) -> Result<String, AuthError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::InvalidCredential(format!("failed to sign token: {}", e)))
}
