//! Authentication and authorization configuration.
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth.token]
//! issuer = "https://login.microsoftonline.com/<tenant>/v2.0"
//! audience = "api://searchcoach"
//!
//! [auth.graph]
//! base_url = "https://graph.microsoft.com"
//! request_timeout = "10s"
//!
//! [auth.membership]
//! cache_duration_in_minutes = 60
//! sweep_interval = "5m"
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default membership cache lifetime applied when the configured value is
/// absent or not positive.
pub const DEFAULT_CACHE_DURATION_MINUTES: i64 = 60;

/// Longest accepted membership cache lifetime (one year).
pub const MAX_CACHE_DURATION_MINUTES: i64 = 365 * 24 * 60;

/// Root authentication and authorization configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Bearer token verification.
    pub token: TokenConfig,

    /// Microsoft Graph membership validator.
    pub graph: GraphConfig,

    /// Membership authorization cache.
    pub membership: MembershipCacheConfig,
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid setting.
    pub fn validate(&self) -> Result<(), String> {
        self.token.validate()?;
        self.graph.validate()?;
        self.membership.validate()?;
        Ok(())
    }
}

/// Bearer token verification settings.
///
/// Exactly one key source must be configured: an HS256 shared secret or an
/// RS256 public key in PEM format.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Expected `iss` claim. Not checked when unset.
    pub issuer: Option<String>,

    /// Expected `aud` claim. Not checked when unset.
    pub audience: Option<String>,

    /// Shared secret for HS256-signed tokens.
    pub hs256_secret: Option<String>,

    /// PEM encoded RSA public key for RS256-signed tokens.
    pub rsa_public_key_pem: Option<String>,
}

impl TokenConfig {
    fn validate(&self) -> Result<(), String> {
        match (&self.hs256_secret, &self.rsa_public_key_pem) {
            (Some(_), Some(_)) => {
                Err("auth.token: set only one of hs256_secret or rsa_public_key_pem".into())
            }
            (None, None) => {
                Err("auth.token: one of hs256_secret or rsa_public_key_pem is required".into())
            }
            (Some(secret), None) if secret.is_empty() => {
                Err("auth.token.hs256_secret must not be empty".into())
            }
            _ => Ok(()),
        }
    }
}

/// Microsoft Graph client settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Graph endpoint root, without the API version segment.
    pub base_url: String,

    /// Timeout applied to every Graph request.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_url: "https://graph.microsoft.com".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl GraphConfig {
    fn validate(&self) -> Result<(), String> {
        url::Url::parse(&self.base_url)
            .map_err(|e| format!("auth.graph.base_url is not a valid URL: {e}"))?;
        if self.request_timeout.is_zero() {
            return Err("auth.graph.request_timeout must be > 0".into());
        }
        Ok(())
    }
}

/// Membership cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MembershipCacheConfig {
    /// How long a membership decision stays valid. Values `<= 0` fall back
    /// to [`DEFAULT_CACHE_DURATION_MINUTES`].
    pub cache_duration_in_minutes: i64,

    /// Interval of the optional background sweep of expired entries.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Option<Duration>,
}

impl Default for MembershipCacheConfig {
    fn default() -> Self {
        Self {
            cache_duration_in_minutes: DEFAULT_CACHE_DURATION_MINUTES,
            sweep_interval: None,
        }
    }
}

impl MembershipCacheConfig {
    /// Creates a configuration with the given cache duration.
    #[must_use]
    pub fn with_cache_duration_minutes(minutes: i64) -> Self {
        Self {
            cache_duration_in_minutes: minutes,
            ..Self::default()
        }
    }

    /// Returns `true` if the configured duration is replaced by the default.
    #[must_use]
    pub fn uses_default_duration(&self) -> bool {
        self.cache_duration_in_minutes <= 0
    }

    /// Resolves the time-to-live of a new cache entry.
    ///
    /// The whole configured duration is compared, so `60` or `120` minutes
    /// are honoured as configured. Durations above
    /// [`MAX_CACHE_DURATION_MINUTES`] are capped.
    #[must_use]
    pub fn effective_ttl(&self) -> Duration {
        let minutes = if self.uses_default_duration() {
            DEFAULT_CACHE_DURATION_MINUTES
        } else {
            self.cache_duration_in_minutes.min(MAX_CACHE_DURATION_MINUTES)
        };

        Duration::from_secs(minutes.unsigned_abs() * 60)
    }

    fn validate(&self) -> Result<(), String> {
        if self.cache_duration_in_minutes > MAX_CACHE_DURATION_MINUTES {
            return Err(format!(
                "auth.membership.cache_duration_in_minutes must be <= {MAX_CACHE_DURATION_MINUTES}"
            ));
        }
        if self.sweep_interval.is_some_and(|interval| interval.is_zero()) {
            return Err("auth.membership.sweep_interval must be > 0".into());
        }
        Ok(())
    }
}
