//! Bearer token verification.
//!
//! Turns the `Authorization: Bearer <jwt>` header of a tab request into the
//! [`Principal`] whose object identifier keys membership lookups.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::config::TokenConfig;
use crate::error::AuthError;

/// Claims read from an incoming access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Object identifier of the signed-in user.
    pub oid: Option<String>,
    /// Tenant of the signed-in user.
    #[serde(default)]
    pub tid: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Directory object identifier (`oid` claim).
    pub object_id: String,
    /// Directory tenant (`tid` claim).
    pub tenant_id: Option<String>,
    /// Display name (`name` claim).
    pub name: Option<String>,
}

/// Verifies bearer tokens and extracts the caller's principal.
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Creates a verifier from configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no usable key is configured.
    pub fn from_config(config: &TokenConfig) -> Result<Self, AuthError> {
        let (decoding_key, algorithm) =
            match (&config.hs256_secret, &config.rsa_public_key_pem) {
                (Some(secret), None) => (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256),
                (None, Some(pem)) => (
                    DecodingKey::from_rsa_pem(pem.as_bytes())
                        .map_err(|e| AuthError::configuration(format!("invalid RSA key: {e}")))?,
                    Algorithm::RS256,
                ),
                _ => {
                    return Err(AuthError::configuration(
                        "exactly one of hs256_secret or rsa_public_key_pem must be set",
                    ));
                }
            };

        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;
        match &config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Ok(Self {
            decoding_key,
            validation,
        })
    }

    /// Verifies a token and returns the principal it identifies.
    ///
    /// # Errors
    ///
    /// - `TokenExpired` if the token is past its expiry
    /// - `InvalidToken` for bad signatures, claims, or a missing `oid`
    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                use jsonwebtoken::errors::ErrorKind;
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::invalid_token(e.to_string()),
                }
            })?
            .claims;

        let object_id = claims
            .oid
            .filter(|oid| !oid.is_empty())
            .ok_or_else(|| AuthError::invalid_token("token has no object identifier claim"))?;

        Ok(Principal {
            object_id,
            tenant_id: claims.tid,
            name: claims.name,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    pub const SECRET: &str = "test-signing-secret";
    pub const AUDIENCE: &str = "api://searchcoach";

    pub fn token_config() -> TokenConfig {
        TokenConfig {
            issuer: Some("https://login.example.com".to_string()),
            audience: Some(AUDIENCE.to_string()),
            hs256_secret: Some(SECRET.to_string()),
            rsa_public_key_pem: None,
        }
    }

    pub fn mint(oid: Option<&str>, exp_offset_secs: i64) -> String {
        let exp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64
            + exp_offset_secs;
        let claims = serde_json::json!({
            "oid": oid,
            "tid": "tenant-1",
            "name": "Ada",
            "aud": AUDIENCE,
            "iss": "https://login.example.com",
            "exp": exp,
        });
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{mint, token_config};
    use super::*;

    #[test]
    fn test_verify_valid_token() {
        let verifier = TokenVerifier::from_config(&token_config()).unwrap();
        let principal = verifier.verify(&mint(Some("user-7"), 3600)).unwrap();

        assert_eq!(principal.object_id, "user-7");
        assert_eq!(principal.tenant_id.as_deref(), Some("tenant-1"));
        assert_eq!(principal.name.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_expired_token() {
        let verifier = TokenVerifier::from_config(&token_config()).unwrap();
        let err = verifier.verify(&mint(Some("user-7"), -3600)).unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[test]
    fn test_missing_object_id() {
        let verifier = TokenVerifier::from_config(&token_config()).unwrap();
        let err = verifier.verify(&mint(None, 3600)).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken { .. }));
    }

    #[test]
    fn test_wrong_audience() {
        let config = TokenConfig {
            audience: Some("api://someone-else".to_string()),
            ..token_config()
        };
        let verifier = TokenVerifier::from_config(&config).unwrap();
        let err = verifier.verify(&mint(Some("user-7"), 3600)).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken { .. }));
    }

    #[test]
    fn test_wrong_secret() {
        let config = TokenConfig {
            hs256_secret: Some("another-secret".to_string()),
            ..token_config()
        };
        let verifier = TokenVerifier::from_config(&config).unwrap();
        assert!(verifier.verify(&mint(Some("user-7"), 3600)).is_err());
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let result = TokenVerifier::from_config(&TokenConfig::default());
        assert!(matches!(result, Err(AuthError::Configuration { .. })));
    }
}
