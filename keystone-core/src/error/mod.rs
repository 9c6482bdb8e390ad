pub mod utilities;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Authentication(#[from] AuthenticationError),

    #[error("Authorization error: {0}")]
    Authorization(#[from] AuthorizationError),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Cryptographic error: {0}")]
    Crypto(#[from] CryptoError),
}

#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("Missing token")]
    MissingToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token signature")]
    TokenInvalidSignature,

    #[error("Malformed token: {0}")]
    TokenMalformed(String),

    #[error("Session not found")]
    SessionNotFound,

    #[error("Refresh token not found")]
    RefreshTokenNotFound,
}

#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error("Insufficient role: requires one of [{}]", .required.join(", "))]
    InsufficientRole { required: Vec<String> },

    #[error("Insufficient permission: requires one of [{}]", .required.join(", "))]
    InsufficientPermission { required: Vec<String> },
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Identity provider failure: {0}")]
    Provider(String),
}

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Invalid TTL for {0}: must be positive and at most 10 years")]
    InvalidTtl(&'static str),

    #[error("Invalid session limit: must be at least 1")]
    InvalidSessionLimit,

    #[error("Invalid signing secret: {0}")]
    InvalidSecret(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Token signing failed: {0}")]
    TokenSigning(String),
}

impl Error {
    /// HTTP status a transport layer should answer with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Authentication(_) => 401,
            Error::Authorization(_) => 403,
            Error::Identity(IdentityError::Provider(_)) => 502,
            Error::Identity(_) | Error::Configuration(_) => 400,
            Error::Crypto(_) => 500,
        }
    }

    pub fn is_authentication_error(&self) -> bool {
        matches!(self, Error::Authentication(_))
    }

    pub fn is_authorization_error(&self) -> bool {
        matches!(self, Error::Authorization(_))
    }

    pub fn is_identity_error(&self) -> bool {
        matches!(self, Error::Identity(_))
    }

    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    pub fn is_crypto_error(&self) -> bool {
        matches!(self, Error::Crypto(_))
    }
}
