//! Configuration for [`crate::Keystone`]
//!
//! `KeystoneConfig` can be built in code with the `with_*` setters or
//! deserialized from JSON, where lifetimes are given in seconds:
//!
//! ```rust
//! use keystone::KeystoneConfig;
//!
//! let config = KeystoneConfig::from_json(r#"{
//!     "access_ttl": 900,
//!     "max_sessions_per_user": 3,
//!     "role_catalog": {"user": ["read"], "admin": ["*"]}
//! }"#).unwrap();
//!
//! assert_eq!(config.access_ttl.num_minutes(), 15);
//! assert_eq!(config.refresh_ttl.num_days(), 7);
//! ```

use chrono::Duration;
use keystone_core::{
    Error, RoleCatalog, TokenConfig, ensure_config,
    error::{ConfigurationError, utilities::invalid_config},
    rbac::{DEFAULT_ROLE, Role},
    token::{default_access_ttl, default_refresh_ttl},
};
use serde::Deserialize;

/// Default cap on concurrent sessions per user
pub const DEFAULT_MAX_SESSIONS_PER_USER: usize = 5;

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct KeystoneConfig {
    /// HS256 signing secret; a random one is generated at startup when unset
    pub jwt_secret: Option<String>,
    /// Issuer claim written into and required from tokens
    pub issuer: Option<String>,
    #[serde(with = "seconds")]
    pub access_ttl: Duration,
    #[serde(with = "seconds")]
    pub refresh_ttl: Duration,
    pub max_sessions_per_user: usize,
    /// Replace the refresh token on every refresh instead of reusing it
    pub rotate_refresh_tokens: bool,
    pub role_catalog: RoleCatalog,
}

impl Default for KeystoneConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            issuer: None,
            access_ttl: default_access_ttl(),
            refresh_ttl: default_refresh_ttl(),
            max_sessions_per_user: DEFAULT_MAX_SESSIONS_PER_USER,
            rotate_refresh_tokens: false,
            role_catalog: RoleCatalog::default(),
        }
    }
}

impl KeystoneConfig {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(invalid_config)
    }

    pub fn with_jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.jwt_secret = Some(secret.into());
        self
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

    pub fn with_max_sessions_per_user(mut self, max_sessions: usize) -> Self {
        self.max_sessions_per_user = max_sessions;
        self
    }

    pub fn with_refresh_rotation(mut self, rotate: bool) -> Self {
        self.rotate_refresh_tokens = rotate;
        self
    }

    pub fn with_role_catalog(mut self, catalog: RoleCatalog) -> Self {
        self.role_catalog = catalog;
        self
    }

    /// Token codec configuration derived from this config
    pub fn token_config(&self) -> TokenConfig {
        let config = match &self.jwt_secret {
            Some(secret) => TokenConfig::new_hs256(secret.as_bytes().to_vec()),
            None => TokenConfig::new_random(),
        }
        .with_access_ttl(self.access_ttl)
        .with_refresh_ttl(self.refresh_ttl);

        match &self.issuer {
            Some(issuer) => config.with_issuer(issuer.clone()),
            None => config,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        ensure_config!(
            self.max_sessions_per_user >= 1,
            ConfigurationError::InvalidSessionLimit
        );
        self.token_config().validate()?;

        if !self.role_catalog.contains(&Role::new(DEFAULT_ROLE)) {
            tracing::warn!(
                role = DEFAULT_ROLE,
                "Role catalog lacks the default role; unassigned users get no permissions"
            );
        }
        Ok(())
    }
}

impl std::fmt::Debug for KeystoneConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeystoneConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("max_sessions_per_user", &self.max_sessions_per_user)
            .field("rotate_refresh_tokens", &self.rotate_refresh_tokens)
            .field("role_catalog", &self.role_catalog)
            .finish()
    }
}

mod seconds {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, de::Error};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = i64::deserialize(deserializer)?;
        Duration::try_seconds(seconds).ok_or_else(|| D::Error::custom("duration out of range"))
    }
}
