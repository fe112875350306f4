//! Caller Authentication
//!
//! Turns the token a client presents into an [`Identity`]. With no key
//! configured the token itself is taken as the identity; otherwise it must be
//! a JWT from an external provider and the identity is its subject. The
//! server never issues tokens.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::state::Identity;

/// Authentication configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthConfig {
    /// Expected issuer claim ("iss"). If None, any issuer accepted.
    pub issuer: Option<String>,
    /// Expected audience claim ("aud"). If None, any audience accepted.
    pub audience: Option<String>,
    /// RS256 public key in PEM format (preferred for external providers).
    pub public_key_pem: Option<String>,
    /// HS256 secret (fallback for simple setups).
    pub secret: Option<String>,
    /// Whether to skip expiry validation (for testing only).
    pub skip_expiry: bool,
}

impl AuthConfig {
    /// Check if JWT validation is configured.
    pub fn is_configured(&self) -> bool {
        self.public_key_pem.is_some() || self.secret.is_some()
    }
}

/// Standard JWT claims we expect from auth providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject - the user ID from the auth provider.
    pub sub: String,
    /// Expiry timestamp (Unix seconds).
    #[serde(default)]
    pub exp: u64,
    /// Issued at timestamp.
    #[serde(default)]
    pub iat: u64,
    /// Issuer (auth provider).
    #[serde(default)]
    pub iss: Option<String>,
    /// Audience.
    #[serde(default)]
    pub aud: Option<serde_json::Value>,
}

impl TokenClaims {
    /// Identity named by the subject claim.
    pub fn identity(&self) -> Identity {
        Identity::new(self.sub.clone())
    }
}

/// Authentication errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Blank token.
    #[error("empty token")]
    EmptyToken,
    /// Token format is invalid.
    #[error("invalid token format")]
    InvalidFormat,
    /// Token signature verification failed.
    #[error("invalid signature")]
    InvalidSignature,
    /// Token has expired.
    #[error("token expired")]
    Expired,
    /// Issuer claim doesn't match expected value.
    #[error("invalid issuer")]
    InvalidIssuer,
    /// Audience claim doesn't match expected value.
    #[error("invalid audience")]
    InvalidAudience,
    /// Required claim is missing.
    #[error("missing required claim: {0}")]
    MissingClaim(String),
    /// JWT decoding error.
    #[error("decode error: {0}")]
    DecodeError(String),
}

/// Resolve the identity behind `token`.
pub fn resolve_identity(token: &str, config: &AuthConfig) -> Result<Identity, AuthError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::EmptyToken);
    }

    if !config.is_configured() {
        return Ok(Identity::new(token));
    }

    validate_token(token, config).map(|claims| claims.identity())
}

/// Validate a JWT and return its claims.
///
/// Only meaningful when [`AuthConfig::is_configured`]; an unconfigured
/// config rejects every token as undecodable.
pub fn validate_token(token: &str, config: &AuthConfig) -> Result<TokenClaims, AuthError> {
    let (key, algorithm) = decoding_key(config)?;
    let claims = decode::<TokenClaims>(token, &key, &validation(config, algorithm))
        .map_err(map_jwt_error)?
        .claims;

    if claims.sub.is_empty() {
        return Err(AuthError::MissingClaim("sub".into()));
    }

    Ok(claims)
}

/// Key and algorithm for `config`. A PEM key takes precedence over a secret.
fn decoding_key(config: &AuthConfig) -> Result<(DecodingKey, Algorithm), AuthError> {
    match (&config.public_key_pem, &config.secret) {
        (Some(pem), _) => DecodingKey::from_rsa_pem(pem.as_bytes())
            .map(|key| (key, Algorithm::RS256))
            .map_err(|e| AuthError::DecodeError(format!("invalid public key: {}", e))),
        (None, Some(secret)) => Ok((DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256)),
        (None, None) => Err(AuthError::DecodeError("no verification key configured".into())),
    }
}

/// Claim checks for `config`. `exp` is optional but enforced with no leeway
/// when present; `iss` and `aud` are checked only when configured.
fn validation(config: &AuthConfig, algorithm: Algorithm) -> Validation {
    let mut validation = Validation::new(algorithm);
    validation.required_spec_claims.clear();
    validation.leeway = 0;
    validation.validate_exp = !config.skip_expiry;

    if let Some(issuer) = &config.issuer {
        validation.set_issuer(&[issuer]);
    }
    match &config.audience {
        Some(audience) => validation.set_audience(&[audience]),
        None => validation.validate_aud = false,
    }

    validation
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
        ErrorKind::InvalidAudience => AuthError::InvalidAudience,
        ErrorKind::InvalidToken | ErrorKind::Base64(_) => AuthError::InvalidFormat,
        _ => AuthError::DecodeError(err.to_string()),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    const SECRET: &str = "rowshift-test-secret-0123456789";

    fn sign(claims: &TokenClaims, secret: &str) -> String {
        let key = EncodingKey::from_secret(secret.as_bytes());
        encode(&Header::new(Algorithm::HS256), claims, &key).unwrap()
    }

    fn claims_for(sub: &str) -> TokenClaims {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
        TokenClaims {
            sub: sub.into(),
            exp: now + 3600,
            iat: now,
            iss: Some("test-issuer".into()),
            aud: Some(serde_json::json!("test-audience")),
        }
    }

    fn hs256() -> AuthConfig {
        AuthConfig {
            secret: Some(SECRET.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_unconfigured_token_is_identity() {
        let config = AuthConfig::default();
        assert_eq!(resolve_identity("alice", &config), Ok(Identity::from("alice")));
        assert_eq!(resolve_identity("  bob \n", &config), Ok(Identity::from("bob")));
    }

    #[test]
    fn test_empty_token_rejected() {
        assert_eq!(resolve_identity("", &AuthConfig::default()), Err(AuthError::EmptyToken));
        assert_eq!(resolve_identity("   ", &hs256()), Err(AuthError::EmptyToken));
    }

    #[test]
    fn test_jwt_subject_is_identity() {
        let token = sign(&claims_for("user123"), SECRET);
        assert_eq!(resolve_identity(&token, &hs256()), Ok(Identity::from("user123")));
    }

    #[test]
    fn test_configured_rejects_plain_token() {
        assert_eq!(resolve_identity("alice", &hs256()), Err(AuthError::InvalidFormat));
    }

    #[test]
    fn test_expired_token_rejected() {
        let mut claims = claims_for("user123");
        claims.exp = 1;
        let token = sign(&claims, SECRET);

        assert_eq!(validate_token(&token, &hs256()).unwrap_err(), AuthError::Expired);

        let lenient = AuthConfig { skip_expiry: true, ..hs256() };
        assert!(validate_token(&token, &lenient).is_ok());
    }

    #[test]
    fn test_recently_expired_token_rejected() {
        let mut claims = claims_for("user123");
        claims.exp = claims.iat - 30;
        let token = sign(&claims, SECRET);

        assert_eq!(resolve_identity(&token, &hs256()), Err(AuthError::Expired));
    }

    #[test]
    fn test_no_key_configured() {
        let token = sign(&claims_for("user123"), SECRET);
        assert!(matches!(
            validate_token(&token, &AuthConfig::default()),
            Err(AuthError::DecodeError(_))
        ));
    }

    #[test]
    fn test_invalid_signature_rejected() {
        let token = sign(&claims_for("user123"), "some-other-secret-0123456789");
        assert_eq!(validate_token(&token, &hs256()).unwrap_err(), AuthError::InvalidSignature);
    }

    #[test]
    fn test_missing_sub_rejected() {
        let token = sign(&claims_for(""), SECRET);
        assert!(matches!(validate_token(&token, &hs256()), Err(AuthError::MissingClaim(_))));
    }

    #[test]
    fn test_issuer_and_audience() {
        let token = sign(&claims_for("user123"), SECRET);

        let wrong_issuer = AuthConfig { issuer: Some("elsewhere".into()), ..hs256() };
        assert_eq!(validate_token(&token, &wrong_issuer).unwrap_err(), AuthError::InvalidIssuer);

        let matching = AuthConfig {
            issuer: Some("test-issuer".into()),
            audience: Some("test-audience".into()),
            ..hs256()
        };
        assert_eq!(validate_token(&token, &matching).unwrap().identity(), Identity::from("user123"));
    }
}
