//! Access and refresh token codec
//!
//! Tokens are HS256 signed JWTs. Every token carries the subject, issue and
//! expiry timestamps, its [`TokenKind`] and a unique `jti`; access tokens also
//! embed a snapshot of the user's roles.
//!
//! The codec is stateless. Verification checks the signature and expiry with
//! zero leeway and never consults session state; revocation is the session
//! store's job.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::{
    Error, UserId,
    crypto::{SECRET_KEY_LEN, generate_secret_key},
    error::{AuthenticationError, ConfigurationError, CryptoError},
    rbac::Role,
};

/// Default lifetime of access tokens (24 hours)
pub fn default_access_ttl() -> Duration {
    Duration::hours(24)
}

/// Default lifetime of refresh tokens (7 days)
pub fn default_refresh_ttl() -> Duration {
    Duration::days(7)
}

/// Longest accepted token lifetime (10 years)
pub fn max_ttl() -> Duration {
    Duration::days(3650)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// JWT claims for access and refresh tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user ID
    pub sub: String,
    /// Issued at in seconds (as UTC timestamp)
    pub iat: i64,
    /// Expiration time in seconds (as UTC timestamp)
    pub exp: i64,
    pub kind: TokenKind,
    /// Unique token id
    pub jti: String,
    /// Roles snapshot, present on access tokens only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<BTreeSet<Role>>,
    /// Issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl Claims {
    pub fn user_id(&self) -> UserId {
        UserId::new(&self.sub)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// A freshly signed token together with the claims it carries
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub claims: Claims,
}

impl SignedToken {
    pub fn as_str(&self) -> &str {
        &self.token
    }

    pub fn into_inner(self) -> String {
        self.token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.claims.expires_at()
    }
}

/// Configuration for the token codec
#[derive(Clone)]
pub struct TokenConfig {
    secret: Vec<u8>,
    /// Issuer claim, checked on verification when set
    pub issuer: Option<String>,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl TokenConfig {
    /// Create a configuration signing with the given HS256 secret
    pub fn new_hs256(secret: Vec<u8>) -> Self {
        Self {
            secret,
            issuer: None,
            access_ttl: default_access_ttl(),
            refresh_ttl: default_refresh_ttl(),
        }
    }

    /// Create a configuration with a secret generated from the OS RNG
    pub fn new_random() -> Self {
        Self::new_hs256(generate_secret_key())
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    pub fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }

    /// Reject secrets too short for HS256 and lifetimes outside
    /// `(0, max_ttl()]`
    pub fn validate(&self) -> Result<(), Error> {
        crate::ensure_config!(
            self.secret.len() >= SECRET_KEY_LEN,
            ConfigurationError::InvalidSecret(format!("must be at least {SECRET_KEY_LEN} bytes"))
        );
        crate::ensure_config!(
            self.access_ttl > Duration::zero() && self.access_ttl <= max_ttl(),
            ConfigurationError::InvalidTtl("access")
        );
        crate::ensure_config!(
            self.refresh_ttl > Duration::zero() && self.refresh_ttl <= max_ttl(),
            ConfigurationError::InvalidTtl("refresh")
        );
        Ok(())
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// Signs and verifies tokens
pub struct TokenCodec {
    config: TokenConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(config: TokenConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Self {
            encoding_key: EncodingKey::from_secret(&config.secret),
            decoding_key: DecodingKey::from_secret(&config.secret),
            validation,
            config,
        }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Sign a token for `user_id` valid for `ttl`
    ///
    /// `roles` is embedded in access tokens and ignored for refresh tokens.
    pub fn issue(
        &self,
        kind: TokenKind,
        user_id: &UserId,
        roles: &BTreeSet<Role>,
        ttl: Duration,
    ) -> Result<SignedToken, Error> {
        let iat = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            iat,
            exp: iat + ttl.num_seconds(),
            kind,
            jti: uuid::Uuid::new_v4().to_string(),
            roles: match kind {
                TokenKind::Access => Some(roles.clone()),
                TokenKind::Refresh => None,
            },
            iss: self.config.issuer.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| CryptoError::TokenSigning(e.to_string()))?;

        Ok(SignedToken { token, claims })
    }

    /// Sign a token using the configured lifetime for `kind`
    pub fn issue_default(
        &self,
        kind: TokenKind,
        user_id: &UserId,
        roles: &BTreeSet<Role>,
    ) -> Result<SignedToken, Error> {
        self.issue(kind, user_id, roles, self.config.ttl(kind))
    }

    /// Verify a token's signature and expiry and return its claims
    pub fn verify(&self, token: &str) -> Result<Claims, Error> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                let err = match e.kind() {
                    ErrorKind::ExpiredSignature => AuthenticationError::TokenExpired,
                    ErrorKind::InvalidSignature => AuthenticationError::TokenInvalidSignature,
                    _ => AuthenticationError::TokenMalformed(e.to_string()),
                };
                tracing::debug!(error = %err, "Token verification failed");
                err
            })?;

        Ok(token_data.claims)
    }

    /// Verify a token and require it to be of the given kind
    pub fn verify_kind(&self, token: &str, kind: TokenKind) -> Result<Claims, Error> {
        let claims = self.verify(token)?;
        if claims.kind != kind {
            return Err(AuthenticationError::TokenMalformed(format!(
                "expected {kind} token, got {} token",
                claims.kind
            ))
            .into());
        }
        Ok(claims)
    }
}
