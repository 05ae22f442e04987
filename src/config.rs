//! Service configuration loaded from the environment.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `HOST` | `0.0.0.0` | Bind address |
//! | `PORT` | `8080` | Bind port |
//! | `SECRET_KEY` | none | Token signing secret; without it every token is rejected |
//! | `TOKEN_LEEWAY_SECS` | `0` | Accepted clock skew on `exp` |
//! | `TOKEN_CACHE_SIZE` | `10000` | Verified-token cache entries, `0` disables |
//! | `REVIEW_VISIBILITY` | `all` | `all` or `approved` |
//! | `SEED_SAMPLE_HOTELS` | `true` | Seed an empty catalog at startup |
//! | `LOG_FORMAT` | `json` | `json` or `pretty` |

use crate::aggregate::ReviewVisibility;
use crate::auth::{CacheConfig, SigningSecret, TokenVerifier, VerificationMode};

/// Environment variable holding the signing secret.
pub const SECRET_ENV_VAR: &str = "SECRET_KEY";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured JSON lines.
    Json,
    /// Human-readable output for local development.
    Pretty,
}

/// Runtime configuration of the review service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Token signing secret, if configured.
    pub signing_secret: Option<SigningSecret>,
    /// Accepted clock skew on token expiry, in seconds.
    pub token_leeway_secs: u64,
    /// Verified-token cache settings.
    pub token_cache: CacheConfig,
    /// Which reviews are listed and averaged.
    pub visibility: ReviewVisibility,
    /// Seed an empty hotel catalog with sample hotels.
    pub seed_sample_hotels: bool,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            signing_secret: None,
            token_leeway_secs: 0,
            token_cache: CacheConfig::default(),
            visibility: ReviewVisibility::All,
            seed_sample_hotels: true,
            log_format: LogFormat::Json,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let cache_size: usize =
            parsed(&lookup, "TOKEN_CACHE_SIZE").unwrap_or(defaults.token_cache.max_entries);

        Self {
            host: lookup("HOST").filter(|s| !s.is_empty()).unwrap_or(defaults.host),
            port: parsed(&lookup, "PORT").unwrap_or(defaults.port),
            signing_secret: lookup(SECRET_ENV_VAR).and_then(SigningSecret::new),
            token_leeway_secs: parsed(&lookup, "TOKEN_LEEWAY_SECS")
                .unwrap_or(defaults.token_leeway_secs),
            token_cache: CacheConfig {
                max_entries: cache_size,
                enabled: cache_size > 0,
            },
            visibility: lookup("REVIEW_VISIBILITY")
                .and_then(|s| ReviewVisibility::from_str(&s))
                .unwrap_or(defaults.visibility),
            seed_sample_hotels: lookup("SEED_SAMPLE_HOTELS")
                .map(|s| !matches!(s.trim().to_lowercase().as_str(), "0" | "false" | "no" | "off"))
                .unwrap_or(defaults.seed_sample_hotels),
            log_format: match lookup("LOG_FORMAT").as_deref() {
                Some("pretty") => LogFormat::Pretty,
                _ => LogFormat::Json,
            },
        }
    }

    /// Build the token verifier described by this configuration.
    ///
    /// Without a signing secret the verifier rejects every token.
    pub fn token_verifier(&self) -> TokenVerifier {
        let mode = VerificationMode::cached_with_config(
            self.signing_secret.clone(),
            self.token_cache.clone(),
        );
        TokenVerifier::new(mode).with_leeway(self.token_leeway_secs)
    }
}

fn parsed<T, F>(lookup: &F, var: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(var).and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ServiceConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "0.0.0.0");
        assert!(config.signing_secret.is_none());
        assert_eq!(config.visibility, ReviewVisibility::All);
        assert!(config.seed_sample_hotels);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(!config.token_verifier().is_enabled());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "9090"),
            ("SECRET_KEY", "s3cret"),
            ("REVIEW_VISIBILITY", "approved"),
            ("TOKEN_CACHE_SIZE", "0"),
            ("SEED_SAMPLE_HOTELS", "false"),
            ("LOG_FORMAT", "pretty"),
        ]);
        assert_eq!(config.port, 9090);
        assert!(config.signing_secret.is_some());
        assert_eq!(config.visibility, ReviewVisibility::ApprovedOnly);
        assert!(!config.token_cache.enabled);
        assert!(!config.seed_sample_hotels);
        assert_eq!(config.log_format, LogFormat::Pretty);

        let verifier = config.token_verifier();
        assert!(verifier.is_enabled());
        assert!(verifier.cache_stats().is_none());
    }

    #[test]
    fn test_empty_secret_is_absent() {
        let config = config_from(&[("SECRET_KEY", "")]);
        assert!(config.signing_secret.is_none());
    }

    #[test]
    fn test_unparseable_port_falls_back() {
        let config = config_from(&[("PORT", "eighty")]);
        assert_eq!(config.port, 8080);
    }
}
