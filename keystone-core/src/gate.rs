//! Request-time authentication and authorization
//!
//! [`AuthorizationGate::authenticate`] accepts an access token only if its
//! signature and expiry check out *and* it is still the current access token
//! of a live session. The session lookup happens on every call: invalidating
//! a session is what revokes its tokens, since a signed token stays
//! cryptographically valid until it expires.

use std::sync::Arc;

use chrono::Utc;

use crate::{
    Error, Session, UserId,
    error::{AuthenticationError, AuthorizationError},
    rbac::{Permission, Role},
    storage::SessionStore,
    token::{Claims, TokenCodec, TokenKind},
};

/// Extract the token from an `Authorization: Bearer <token>` header value
///
/// ```rust
/// use keystone_core::gate::bearer_token;
///
/// assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
/// assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
/// ```
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// The verified claims and live session behind a request
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claims: Claims,
    pub session: Session,
}

impl AuthContext {
    pub fn user_id(&self) -> &UserId {
        &self.session.user_id
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.session.roles.contains(role)
    }

    pub fn has_permission(&self, permission: &Permission) -> bool {
        self.session.permissions.contains(permission)
    }
}

pub struct AuthorizationGate {
    codec: Arc<TokenCodec>,
    store: Arc<SessionStore>,
}

impl AuthorizationGate {
    pub fn new(codec: Arc<TokenCodec>, store: Arc<SessionStore>) -> Self {
        Self { codec, store }
    }

    /// Verify an access token and resolve its session
    ///
    /// Records activity on the session.
    ///
    /// # Errors
    ///
    /// * [`AuthenticationError::MissingToken`] if `token` is absent or blank
    /// * any [`TokenCodec::verify`] error
    /// * [`AuthenticationError::SessionNotFound`] if the token no longer
    ///   belongs to a live session
    pub fn authenticate(&self, token: Option<&str>) -> Result<AuthContext, Error> {
        let token = token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthenticationError::MissingToken)?;

        let claims = self.codec.verify_kind(token, TokenKind::Access)?;

        let session = self
            .store
            .touch_by_access_token(token, Utc::now())
            .filter(|session| session.user_id.as_str() == claims.sub)
            .ok_or_else(|| {
                tracing::warn!(user_id = %claims.sub, "Valid access token has no live session");
                AuthenticationError::SessionNotFound
            })?;

        tracing::debug!(
            user_id = %session.user_id,
            session_id = %session.session_id,
            "Authenticated request"
        );
        Ok(AuthContext { claims, session })
    }

    /// Check role and permission requirements
    ///
    /// Passes when `required_roles` is empty or the session holds at least one
    /// of them, and `required_permissions` is empty or the session holds at
    /// least one of them (the wildcard satisfies any permission).
    pub fn authorize(
        &self,
        context: &AuthContext,
        required_roles: &[Role],
        required_permissions: &[Permission],
    ) -> Result<(), Error> {
        authorize_session(&context.session, required_roles, required_permissions)
    }
}

/// Role and permission check against a session, see [`AuthorizationGate::authorize`]
pub fn authorize_session(
    session: &Session,
    required_roles: &[Role],
    required_permissions: &[Permission],
) -> Result<(), Error> {
    if !required_roles.is_empty() && !session.has_any_role(required_roles) {
        return Err(AuthorizationError::InsufficientRole {
            required: required_roles.iter().map(Role::to_string).collect(),
        }
        .into());
    }

    if !required_permissions.is_empty() && !session.permissions.contains_any(required_permissions)
    {
        return Err(AuthorizationError::InsufficientPermission {
            required: required_permissions
                .iter()
                .map(Permission::to_string)
                .collect(),
        }
        .into());
    }

    Ok(())
}
