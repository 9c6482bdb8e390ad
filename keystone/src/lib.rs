//! # Keystone
//!
//! Keystone is the identity, session and authorization core of a generated
//! application. It takes the user-info payload an OAuth provider returned
//! (Google, Microsoft, GitHub, Auth0 or Okta), turns it into a session with
//! signed access and refresh tokens, and answers per-request authentication
//! and role/permission checks.
//!
//! The OAuth redirect and code exchange themselves are performed by an
//! [`IdentityProvider`] implementation supplied by the application.
//!
//! ## Session lifecycle
//!
//! ```text
//! login ──▶ Active ──refresh──▶ Active ──logout / logout_all / eviction──▶ Invalidated
//! ```
//!
//! Each user may hold at most `max_sessions_per_user` sessions; a login past
//! the cap evicts the least recently active session. Logging out removes the
//! session, and with it the only thing that makes its tokens usable: every
//! call to [`Keystone::authenticate`] requires the presented access token to
//! be the current token of a live session.
//!
//! ## Example
//!
//! ```rust
//! use keystone::{Keystone, KeystoneConfig};
//! use serde_json::json;
//!
//! let keystone = Keystone::new(KeystoneConfig::default()).unwrap();
//!
//! let login = keystone
//!     .login("google", &json!({"id": "42", "email": "a@b.com", "name": "A"}), None)
//!     .unwrap();
//! assert_eq!(login.user_id.as_str(), "google_42");
//!
//! let context = keystone.authenticate(Some(&login.access_token)).unwrap();
//! keystone.authorize(&context, &[], &["read".into()]).unwrap();
//!
//! keystone.logout(&login.session_id).unwrap();
//! assert!(keystone.authenticate(Some(&login.access_token)).is_err());
//! ```
use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use keystone_core::{error::AuthenticationError, storage::TokenReplacement};
use serde::Serialize;
use serde_json::Value;

pub mod builder;
pub mod config;

pub use builder::KeystoneBuilder;
pub use config::KeystoneConfig;

/// Re-export core types from keystone_core
///
/// These types are commonly used when working with the Keystone API.
pub use keystone_core::{
    AuthContext, AuthorizationGate, Claims, ClientMetadata, Identity, IdentityProvider,
    Permission, PermissionSet, Provider, RbacResolver, Role, RoleCatalog, Session, SessionId,
    SessionStore, TokenCodec, TokenKind, UserId, bearer_token,
};

/// Errors that can occur when using Keystone.
pub use keystone_core::Error as KeystoneError;

/// Result of a successful login
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub access_token: String,
    pub refresh_token: String,
    pub roles: BTreeSet<Role>,
    pub permissions: PermissionSet,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Result of a successful refresh
#[derive(Debug, Clone, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    /// Replacement refresh token, present only when rotation is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// The session lifecycle manager
///
/// `Keystone` owns the token codec and shares the session store and RBAC
/// resolver through `Arc`s, so one instance can serve any number of threads
/// or tasks. Every operation is synchronous and completes as a single atomic
/// step against the session store.
pub struct Keystone {
    config: KeystoneConfig,
    codec: Arc<TokenCodec>,
    rbac: Arc<RbacResolver>,
    store: Arc<SessionStore>,
    gate: AuthorizationGate,
}

impl Keystone {
    /// Create a Keystone with its own in-memory session store
    pub fn new(config: KeystoneConfig) -> Result<Self, KeystoneError> {
        let rbac = Arc::new(RbacResolver::new(config.role_catalog.clone()));
        Self::with_state(config, Arc::new(SessionStore::new()), rbac)
    }

    /// Create a Keystone over an existing session store and RBAC resolver
    pub fn with_state(
        config: KeystoneConfig,
        store: Arc<SessionStore>,
        rbac: Arc<RbacResolver>,
    ) -> Result<Self, KeystoneError> {
        config.validate()?;

        let codec = Arc::new(TokenCodec::new(config.token_config()));
        let gate = AuthorizationGate::new(codec.clone(), store.clone());

        Ok(Self {
            config,
            codec,
            rbac,
            store,
            gate,
        })
    }

    pub fn builder() -> KeystoneBuilder {
        KeystoneBuilder::new()
    }

    pub fn config(&self) -> &KeystoneConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn rbac(&self) -> &Arc<RbacResolver> {
        &self.rbac
    }

    pub fn codec(&self) -> &Arc<TokenCodec> {
        &self.codec
    }

    /// Log in with a provider's raw user-info payload
    ///
    /// # Errors
    ///
    /// Identity errors from normalization, or a crypto error if signing fails.
    pub fn login(
        &self,
        provider: &str,
        raw_payload: &Value,
        client: Option<ClientMetadata>,
    ) -> Result<LoginResponse, KeystoneError> {
        let identity = keystone_core::normalize(provider, raw_payload)?;
        self.login_identity(identity, client)
    }

    /// Log in with an already normalized identity
    pub fn login_identity(
        &self,
        identity: Identity,
        client: Option<ClientMetadata>,
    ) -> Result<LoginResponse, KeystoneError> {
        let user_id = UserId::from_identity(&identity);
        let roles = self.rbac.get_roles(&user_id);
        let permissions = self.rbac.resolve(&roles);

        let access = self
            .codec
            .issue_default(TokenKind::Access, &user_id, &roles)?;
        let refresh = self
            .codec
            .issue_default(TokenKind::Refresh, &user_id, &roles)?;
        let refresh_expires_at = refresh.expires_at();

        let session = Session::builder()
            .user_id(user_id.clone())
            .identity(identity)
            .roles(roles.clone())
            .permissions(permissions.clone())
            .access_token(access.into_inner())
            .refresh_token(refresh.into_inner())
            .refresh_expires_at(refresh_expires_at)
            .client(client)
            .build()?;
        let response = LoginResponse {
            session_id: session.session_id.clone(),
            user_id: user_id.clone(),
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            roles,
            permissions,
            expires_in: self.config.access_ttl.num_seconds(),
        };

        let evicted = self
            .store
            .create_bounded(session, self.config.max_sessions_per_user);

        tracing::info!(
            user_id = %user_id,
            session_id = %response.session_id,
            evicted = evicted.len(),
            "User logged in"
        );
        Ok(response)
    }

    /// Complete an OAuth callback through `identity_provider` and log in
    ///
    /// The provider is awaited before any session state is touched; the
    /// login itself runs to completion without suspending.
    pub async fn complete_login<P>(
        &self,
        identity_provider: &P,
        provider: &str,
        code: &str,
        client: Option<ClientMetadata>,
    ) -> Result<LoginResponse, KeystoneError>
    where
        P: IdentityProvider + ?Sized,
    {
        let provider = provider.parse::<Provider>()?;
        let payload = identity_provider.complete_auth(provider, code).await?;
        let identity = provider.normalize(&payload)?;
        self.login_identity(identity, client)
    }

    /// Issue a new access token for the session owning `refresh_token`
    ///
    /// The refresh token stays valid until its own expiry unless refresh
    /// rotation is enabled, in which case it is replaced and the response
    /// carries the new one.
    ///
    /// # Errors
    ///
    /// Token codec errors for an invalid or expired refresh token, or
    /// [`AuthenticationError::RefreshTokenNotFound`] if its session is gone.
    pub fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, KeystoneError> {
        let claims = self.codec.verify_kind(refresh_token, TokenKind::Refresh)?;

        let entry = self
            .store
            .find_by_refresh_token(refresh_token)
            .filter(|entry| entry.user_id.as_str() == claims.sub)
            .ok_or(AuthenticationError::RefreshTokenNotFound)?;
        let session = self
            .store
            .get(&entry.session_id)
            .ok_or(AuthenticationError::RefreshTokenNotFound)?;

        let access = self
            .codec
            .issue_default(TokenKind::Access, &session.user_id, &session.roles)?;
        let rotated = if self.config.rotate_refresh_tokens {
            let refresh = self.codec.issue_default(
                TokenKind::Refresh,
                &session.user_id,
                &session.roles,
            )?;
            let expires_at = refresh.expires_at();
            Some((refresh.into_inner(), expires_at))
        } else {
            None
        };

        let updated = self.store.replace_tokens(
            refresh_token,
            TokenReplacement {
                access_token: access.into_inner(),
                refresh_token: rotated,
            },
            Utc::now(),
        )?;

        tracing::debug!(
            user_id = %updated.user_id,
            session_id = %updated.session_id,
            rotated = self.config.rotate_refresh_tokens,
            "Refreshed access token"
        );
        Ok(RefreshResponse {
            access_token: updated.access_token,
            expires_in: self.config.access_ttl.num_seconds(),
            refresh_token: self
                .config
                .rotate_refresh_tokens
                .then_some(updated.refresh_token),
        })
    }

    /// Invalidate one session and its refresh token
    pub fn logout(&self, session_id: &SessionId) -> Result<(), KeystoneError> {
        let session = self
            .store
            .invalidate(session_id)
            .ok_or(AuthenticationError::SessionNotFound)?;

        tracing::info!(user_id = %session.user_id, session_id = %session_id, "User logged out");
        Ok(())
    }

    /// Invalidate every session of a user, returning how many were removed
    pub fn logout_all(&self, user_id: &UserId) -> usize {
        let count = self.store.invalidate_all(user_id);
        tracing::info!(user_id = %user_id, sessions = count, "User logged out everywhere");
        count
    }

    /// See [`AuthorizationGate::authenticate`]
    pub fn authenticate(&self, token: Option<&str>) -> Result<AuthContext, KeystoneError> {
        self.gate.authenticate(token)
    }

    /// See [`AuthorizationGate::authorize`]
    pub fn authorize(
        &self,
        context: &AuthContext,
        required_roles: &[Role],
        required_permissions: &[Permission],
    ) -> Result<(), KeystoneError> {
        self.gate
            .authorize(context, required_roles, required_permissions)
    }

    /// Assign a role; takes effect for sessions created afterwards
    pub fn assign_role(&self, user_id: &UserId, role: &Role) -> Result<(), KeystoneError> {
        self.rbac.assign(user_id, role)
    }

    /// Remove a role; takes effect for sessions created afterwards
    pub fn remove_role(&self, user_id: &UserId, role: &Role) -> bool {
        self.rbac.remove(user_id, role)
    }

    pub fn get_roles(&self, user_id: &UserId) -> BTreeSet<Role> {
        self.rbac.get_roles(user_id)
    }

    pub fn session(&self, session_id: &SessionId) -> Option<Session> {
        self.store.get(session_id)
    }

    /// Any one session of the user; see [`SessionStore::get_by_user_id`]
    pub fn session_by_user_id(&self, user_id: &UserId) -> Option<Session> {
        self.store.get_by_user_id(user_id)
    }

    /// All sessions of the user, least recently active first
    pub fn sessions_for_user(&self, user_id: &UserId) -> Vec<Session> {
        self.store.list_for_user(user_id)
    }

    /// Drop sessions whose refresh token has expired
    pub fn cleanup_expired_sessions(&self) -> usize {
        let removed = self.store.cleanup_expired(Utc::now());
        if removed > 0 {
            tracing::info!(sessions = removed, "Removed expired sessions");
        }
        removed
    }
}
