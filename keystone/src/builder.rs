//! Builder for [`Keystone`] instances
//!
//! ```rust
//! use chrono::Duration;
//! use keystone::KeystoneBuilder;
//!
//! let keystone = KeystoneBuilder::new()
//!     .with_jwt_secret("this_is_a_test_secret_key_for_hs256_jwt_tokens_not_for_prod")
//!     .with_issuer("my-app")
//!     .with_access_ttl(Duration::minutes(15))
//!     .with_max_sessions_per_user(3)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(keystone.config().max_sessions_per_user, 3);
//! ```

use std::sync::Arc;

use chrono::Duration;

use crate::{Keystone, KeystoneConfig, KeystoneError, RbacResolver, RoleCatalog, SessionStore};

/// Builder for [`Keystone`]
///
/// Session store and RBAC resolver default to fresh instances. Supply your
/// own to share them between several `Keystone` instances.
#[derive(Default)]
pub struct KeystoneBuilder {
    config: KeystoneConfig,
    store: Option<Arc<SessionStore>>,
    rbac: Option<Arc<RbacResolver>>,
}

impl KeystoneBuilder {
    /// Create a builder with default configuration.
    ///
    /// # Defaults
    ///
    /// - Signing secret: random, generated at build time
    /// - Access token lifetime: 24 hours
    /// - Refresh token lifetime: 7 days
    /// - Sessions per user: 5
    /// - Refresh token rotation: disabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn with_config(mut self, config: KeystoneConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.config = self.config.with_jwt_secret(secret);
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.config = self.config.with_issuer(issuer);
        self
    }

    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.config = self.config.with_access_ttl(ttl);
        self
    }

    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.config = self.config.with_refresh_ttl(ttl);
        self
    }

    pub fn with_max_sessions_per_user(mut self, max_sessions: usize) -> Self {
        self.config = self.config.with_max_sessions_per_user(max_sessions);
        self
    }

    pub fn with_refresh_rotation(mut self, rotate: bool) -> Self {
        self.config = self.config.with_refresh_rotation(rotate);
        self
    }

    /// Replace the role catalog
    ///
    /// Ignored when an RBAC resolver is supplied with [`Self::with_rbac`].
    pub fn with_role_catalog(mut self, catalog: RoleCatalog) -> Self {
        self.config = self.config.with_role_catalog(catalog);
        self
    }

    pub fn with_session_store(mut self, store: Arc<SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_rbac(mut self, rbac: Arc<RbacResolver>) -> Self {
        self.rbac = Some(rbac);
        self
    }

    /// Validate the configuration and build the instance
    pub fn build(self) -> Result<Keystone, KeystoneError> {
        let store = self.store.unwrap_or_default();
        let rbac = match self.rbac {
            Some(rbac) => rbac,
            None => Arc::new(RbacResolver::new(self.config.role_catalog.clone())),
        };

        Keystone::with_state(self.config, store, rbac)
    }
}
