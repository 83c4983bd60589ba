//! Access token issuance and verification.
//!
//! Tokens are HS256 JWTs. Besides the standard claims they carry the
//! caller's [`Privilege`], which is what the password-change authorizer
//! acts on.
//!
//! # Example
//!
//! ```rust,ignore
//! use lockward::auth::{JwtConfig, JwtTokenService, TokenService, TokenSubject};
//!
//! let tokens = JwtTokenService::new(JwtConfig::with_secret("your-secret-key", "lockward"))?;
//!
//! let issued = tokens.issue(TokenSubject::user(&principal, "app"))?;
//! let claims = tokens.verify(&issued.access_token)?;
//! assert_eq!(claims.sub, principal.id);
//! ```

use crate::auth::caller::{CallerContext, Privilege};
use crate::auth::storage::Principal;
use crate::error::{LockwardError, Result};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Minimum accepted length of the HS256 signing secret.
pub const MIN_SECRET_LENGTH: usize = 32;

/// Configuration for token issuance.
#[derive(Clone)]
pub struct JwtConfig {
    secret: Vec<u8>,
    /// Token issuer (iss claim)
    pub issuer: String,
    /// Access token lifetime (default: 12 hours)
    pub access_token_ttl: Duration,
}

impl JwtConfig {
    /// Create config with an HS256 symmetric key.
    pub fn with_secret(secret: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            secret: secret.into().into_bytes(),
            issuer: issuer.into(),
            access_token_ttl: Duration::from_secs(12 * 60 * 60),
        }
    }

    /// Set access token TTL.
    pub fn access_token_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = ttl;
        self
    }
}

/// Claims carried by access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Principal id for user tokens, client id for client tokens
    pub sub: String,
    pub iss: String,
    pub exp: u64,
    pub iat: u64,
    pub jti: String,
    /// Client the token was issued to
    pub client_id: String,
    /// Username, for user tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub privilege: Privilege,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scope: Vec<String>,
}

impl AccessClaims {
    /// Caller context for authorization decisions.
    pub fn caller(&self) -> CallerContext {
        CallerContext::new(self.sub.clone(), self.privilege)
    }
}

/// Who a token is being issued for.
#[derive(Debug, Clone)]
pub struct TokenSubject<'a> {
    pub subject: &'a str,
    pub client_id: &'a str,
    pub user_name: Option<&'a str>,
    pub privilege: Privilege,
    pub scope: Vec<String>,
}

impl<'a> TokenSubject<'a> {
    /// Subject for a user authenticated through `client_id`.
    pub fn user(principal: &'a Principal, client_id: &'a str) -> Self {
        let privilege = if principal.administrator {
            Privilege::Administrative
        } else {
            Privilege::SelfService
        };
        Self {
            subject: &principal.id,
            client_id,
            user_name: Some(&principal.username),
            privilege,
            scope: Vec::new(),
        }
    }

    /// Subject for a client acting on its own behalf.
    pub fn client(client_id: &'a str) -> Self {
        Self {
            subject: client_id,
            client_id,
            user_name: None,
            privilege: Privilege::ClientCredential,
            scope: Vec::new(),
        }
    }

    /// Set the granted scope.
    pub fn with_scope(mut self, scope: Vec<String>) -> Self {
        self.scope = scope;
        self
    }
}

/// An issued access token.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub access_token: String,
    /// Always "bearer"
    pub token_type: &'static str,
    /// Lifetime in seconds
    pub expires_in: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub scope: String,
    pub jti: String,
}

/// Token issuance and validation.
pub trait TokenService: Send + Sync {
    /// Issue an access token.
    fn issue(&self, subject: TokenSubject<'_>) -> Result<IssuedToken>;

    /// Verify an access token and return its claims.
    fn verify(&self, token: &str) -> Result<AccessClaims>;
}

/// HS256 JWT token service.
#[derive(Clone)]
pub struct JwtTokenService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtTokenService {
    /// Create a token service.
    ///
    /// Fails if the secret is shorter than [`MIN_SECRET_LENGTH`].
    pub fn new(config: JwtConfig) -> Result<Self> {
        if config.secret.len() < MIN_SECRET_LENGTH {
            return Err(LockwardError::internal(format!(
                "JWT secret must be at least {} bytes",
                MIN_SECRET_LENGTH
            )));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_issuer(&[config.issuer.clone()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(&config.secret),
            decoding_key: DecodingKey::from_secret(&config.secret),
            validation,
            config,
        })
    }

    /// Get the issuer string.
    pub fn issuer(&self) -> &str {
        &self.config.issuer
    }
}

impl TokenService for JwtTokenService {
    fn issue(&self, subject: TokenSubject<'_>) -> Result<IssuedToken> {
        let now = current_timestamp();
        let ttl = self.config.access_token_ttl.as_secs();
        let jti = generate_jti();

        let claims = AccessClaims {
            sub: subject.subject.to_string(),
            iss: self.config.issuer.clone(),
            exp: now.saturating_add(ttl),
            iat: now,
            jti: jti.clone(),
            client_id: subject.client_id.to_string(),
            user_name: subject.user_name.map(String::from),
            privilege: subject.privilege,
            scope: subject.scope,
        };

        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| LockwardError::Internal(format!("Failed to encode access token: {}", e)))?;

        Ok(IssuedToken {
            access_token,
            token_type: "bearer",
            expires_in: ttl,
            scope: claims.scope.join(" "),
            jti,
        })
    }

    fn verify(&self, token: &str) -> Result<AccessClaims> {
        Ok(decode::<AccessClaims>(token, &self.decoding_key, &self.validation)?.claims)
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn generate_jti() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-for-jwt-signing-min-32-chars";

    fn service() -> JwtTokenService {
        JwtTokenService::new(JwtConfig::with_secret(SECRET, "lockward-test")).unwrap()
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(JwtTokenService::new(JwtConfig::with_secret("short", "x")).is_err());
    }

    #[test]
    fn test_user_token_carries_privilege() {
        let tokens = service();
        let joe = Principal::new("user-1", "joe");
        let issued = tokens.issue(TokenSubject::user(&joe, "app")).unwrap();

        assert_eq!(issued.token_type, "bearer");
        let claims = tokens.verify(&issued.access_token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.client_id, "app");
        assert_eq!(claims.user_name.as_deref(), Some("joe"));
        assert_eq!(claims.caller(), CallerContext::self_service("user-1"));

        let admin = Principal::new("user-2", "root").administrator();
        let issued = tokens.issue(TokenSubject::user(&admin, "app")).unwrap();
        let claims = tokens.verify(&issued.access_token).unwrap();
        assert_eq!(claims.privilege, Privilege::Administrative);
    }

    #[test]
    fn test_client_token() {
        let tokens = service();
        let issued = tokens
            .issue(TokenSubject::client("admin").with_scope(vec!["password.write".into()]))
            .unwrap();
        assert_eq!(issued.scope, "password.write");

        let claims = tokens.verify(&issued.access_token).unwrap();
        assert_eq!(claims.caller(), CallerContext::client("admin"));
        assert!(claims.user_name.is_none());
    }

    #[test]
    fn test_huge_ttl_saturates_expiry() {
        let tokens = JwtTokenService::new(
            JwtConfig::with_secret(SECRET, "lockward-test")
                .access_token_ttl(Duration::from_secs(u64::MAX)),
        )
        .unwrap();

        let issued = tokens.issue(TokenSubject::client("admin")).unwrap();
        let claims = tokens.verify(&issued.access_token).unwrap();
        assert_eq!(claims.exp, u64::MAX);
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let other = JwtTokenService::new(JwtConfig::with_secret(
            "another-secret-key-that-is-long-enough!!",
            "lockward-test",
        ))
        .unwrap();
        let issued = other.issue(TokenSubject::client("admin")).unwrap();

        assert!(matches!(
            service().verify(&issued.access_token),
            Err(LockwardError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_foreign_issuer_rejected() {
        let other = JwtTokenService::new(JwtConfig::with_secret(SECRET, "someone-else")).unwrap();
        let issued = other.issue(TokenSubject::client("admin")).unwrap();
        assert!(service().verify(&issued.access_token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = service();
        let claims = AccessClaims {
            sub: "user-1".into(),
            iss: "lockward-test".into(),
            exp: current_timestamp() - 10,
            iat: current_timestamp() - 100,
            jti: generate_jti(),
            client_id: "app".into(),
            user_name: None,
            privilege: Privilege::SelfService,
            scope: vec![],
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            tokens.verify(&token),
            Err(LockwardError::Unauthorized(msg)) if msg.contains("expired")
        ));
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(matches!(
            service().verify("not.a.token"),
            Err(LockwardError::Unauthorized(_))
        ));
    }
}
