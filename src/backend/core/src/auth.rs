//! Token issuing and validation for the dashboard API.
//!
//! One configured identity may log in. A successful login yields an HS256
//! JWT; every protected request presents it as a bearer token and
//! [`AuthGateway::validate`] checks signature, issuer, audience and expiry.
//!
//! When no signing secret is configured a random one is generated when the
//! gateway is built, so tokens do not survive a restart.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use metrics::counter;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::{CadenceError, ErrorCode};

/// Role granted to the configured identity.
pub const ADMIN_ROLE: &str = "Admin";

// ═══════════════════════════════════════════════════════════════════════════════
// Error Types
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication credentials")]
    MissingCredentials,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid authentication token: {0}")]
    InvalidToken(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Failed to issue token: {0}")]
    Signing(String),
}

impl From<AuthError> for CadenceError {
    fn from(error: AuthError) -> Self {
        let code = match &error {
            AuthError::MissingCredentials => ErrorCode::Unauthorized,
            AuthError::InvalidCredentials => ErrorCode::InvalidCredentials,
            AuthError::InvalidToken(_) => ErrorCode::InvalidToken,
            AuthError::TokenExpired => ErrorCode::TokenExpired,
            AuthError::Signing(_) => ErrorCode::InternalError,
        };
        CadenceError::new(code, error.to_string()).with_source(error)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// JWT Claims
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Username
    pub sub: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
    /// Token id
    pub jti: String,
}

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Gateway
// ═══════════════════════════════════════════════════════════════════════════════

pub struct AuthGateway {
    username: Option<String>,
    password_digest: Option<[u8; 32]>,
    issuer: String,
    audience: String,
    token_ttl: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

/// Compare two digests without short-circuiting.
fn digests_match(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Blank settings count as unset.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn ephemeral_secret() -> String {
    let mut bytes = Vec::with_capacity(32);
    bytes.extend_from_slice(Uuid::new_v4().as_bytes());
    bytes.extend_from_slice(Uuid::new_v4().as_bytes());
    STANDARD.encode(bytes)
}

impl AuthGateway {
    /// Build the gateway. Fails when the token lifetime is out of range.
    pub fn new(config: &AuthConfig) -> crate::Result<Self> {
        let token_ttl = config.token_ttl().ok_or_else(|| {
            CadenceError::configuration(format!(
                "auth.token_expiry_minutes out of range: {}",
                config.token_expiry_minutes
            ))
        })?;

        let username = non_empty(&config.username).map(str::to_lowercase);
        let password_digest = non_empty(&config.password).map(digest);

        let secret = match config.secret.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => secret.to_string(),
            None => {
                warn!("No token signing secret configured; using a random secret for this process. Tokens will not survive a restart.");
                ephemeral_secret()
            }
        };

        if username.is_none() || password_digest.is_none() {
            warn!("Dashboard credentials are not configured; every login will be rejected");
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        Ok(Self {
            username,
            password_digest,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            token_ttl,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Check credentials and issue a token. `None` on any mismatch.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<IssuedToken> {
        let (Some(expected_user), Some(expected_password)) = (&self.username, &self.password_digest)
        else {
            Self::reject(username, "credentials not configured");
            return None;
        };

        let user_ok = username.to_lowercase() == *expected_user;
        let password_ok = digests_match(&digest(password), expected_password);
        if !(user_ok && password_ok) {
            Self::reject(username, "invalid credentials");
            return None;
        }

        match self.issue(username) {
            Ok(issued) => {
                info!(username, jti = %issued.claims.jti, "Login succeeded");
                Some(issued)
            }
            Err(e) => {
                warn!(username, error = %e, "Token signing failed");
                None
            }
        }
    }

    fn reject(username: &str, reason: &'static str) {
        counter!("cadence_auth_failures_total", "reason" => reason).increment(1);
        warn!(username, reason, "Login rejected");
    }

    fn issue(&self, username: &str) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.token_ttl)
            .ok_or_else(|| AuthError::Signing("token expiry out of range".to_string()))?;
        let claims = Claims {
            sub: username.to_string(),
            role: ADMIN_ROLE.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        Ok(IssuedToken { token, claims })
    }

    /// Verify a bearer token.
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Token validation failed");
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::InvalidToken(e.to_string()),
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig {
            username: Some("admin".into()),
            password: Some("s3cret".into()),
            secret: Some("unit-test-signing-secret-of-decent-length".into()),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn test_login_issues_admin_token() {
        let gateway = AuthGateway::new(&config()).unwrap();
        let issued = gateway.authenticate("admin", "s3cret").unwrap();

        assert_eq!(issued.claims.sub, "admin");
        assert_eq!(issued.claims.role, ADMIN_ROLE);
        assert_eq!(issued.claims.iss, "CadenceDashboard");
        assert_eq!(issued.claims.aud, "CadenceDashboardUsers");
        assert_eq!(issued.claims.exp - issued.claims.iat, 60 * 60);

        let validated = gateway.validate(&issued.token).unwrap();
        assert_eq!(validated, issued.claims);
    }

    #[test]
    fn test_username_is_case_insensitive_password_is_not() {
        let gateway = AuthGateway::new(&config()).unwrap();
        assert!(gateway.authenticate("ADMIN", "s3cret").is_some());
        assert!(gateway.authenticate("admin", "S3CRET").is_none());
        assert!(gateway.authenticate("root", "s3cret").is_none());
    }

    #[test]
    fn test_missing_credentials_reject_everything() {
        let gateway = AuthGateway::new(&AuthConfig::default()).unwrap();
        assert!(gateway.authenticate("", "").is_none());
        assert!(gateway.authenticate("admin", "admin").is_none());
    }

    #[test]
    fn test_blank_credentials_reject_everything() {
        let gateway = AuthGateway::new(&AuthConfig {
            username: Some(String::new()),
            password: Some(String::new()),
            ..config()
        })
        .unwrap();
        assert!(gateway.authenticate("", "").is_none());
        assert!(gateway.authenticate("admin", "").is_none());

        let blank_password = AuthGateway::new(&AuthConfig {
            password: Some(String::new()),
            ..config()
        })
        .unwrap();
        assert!(blank_password.authenticate("admin", "").is_none());
    }

    #[test]
    fn test_out_of_range_expiry_is_a_configuration_error() {
        let err = AuthGateway::new(&AuthConfig {
            token_expiry_minutes: i64::MAX,
            ..config()
        })
        .err()
        .unwrap();
        assert_eq!(err.code(), ErrorCode::ConfigurationError);
    }

    #[test]
    fn test_expiry_past_calendar_range_fails_login_without_panicking() {
        // Fits a Duration, but not a DateTime added to now.
        let gateway = AuthGateway::new(&AuthConfig {
            token_expiry_minutes: 100_000_000 * 24 * 60,
            ..config()
        })
        .unwrap();
        assert!(gateway.authenticate("admin", "s3cret").is_none());
    }

    #[test]
    fn test_foreign_token_rejected() {
        let issuer = AuthGateway::new(&config()).unwrap();
        let token = issuer.authenticate("admin", "s3cret").unwrap().token;

        let other = AuthGateway::new(&AuthConfig {
            secret: Some("a-completely-different-secret-value".into()),
            ..config()
        })
        .unwrap();
        assert!(matches!(other.validate(&token), Err(AuthError::InvalidToken(_))));

        let wrong_audience = AuthGateway::new(&AuthConfig {
            audience: "SomeoneElse".into(),
            ..config()
        })
        .unwrap();
        assert!(wrong_audience.validate(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let gateway = AuthGateway::new(&AuthConfig {
            token_expiry_minutes: -1,
            ..config()
        })
        .unwrap();
        let token = gateway.authenticate("admin", "s3cret").unwrap().token;
        assert!(matches!(gateway.validate(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_ephemeral_secret_is_per_gateway() {
        let unconfigured = AuthConfig {
            secret: None,
            ..config()
        };
        let first = AuthGateway::new(&unconfigured).unwrap();
        let second = AuthGateway::new(&unconfigured).unwrap();

        let token = first.authenticate("admin", "s3cret").unwrap().token;
        assert!(first.validate(&token).is_ok());
        assert!(second.validate(&token).is_err());
    }

    #[test]
    fn test_garbage_token() {
        let gateway = AuthGateway::new(&config()).unwrap();
        assert!(matches!(gateway.validate("not-a-jwt"), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_auth_error_codes() {
        let error: CadenceError = AuthError::TokenExpired.into();
        assert_eq!(error.code(), ErrorCode::TokenExpired);
        assert_eq!(error.http_status().as_u16(), 401);
    }
}
