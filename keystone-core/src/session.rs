//! Session model
//!
//! A session binds a user to the tokens issued at login and to the roles and
//! permissions resolved at that moment. The core session struct is defined as follows:
//!
//! | Field                | Type                     | Description                                          |
//! | -------------------- | ------------------------ | ---------------------------------------------------- |
//! | `session_id`         | `SessionId`              | The unique identifier for the session.               |
//! | `user_id`            | `UserId`                 | The unique identifier for the user.                  |
//! | `identity`           | `Identity`               | The provider identity the session was created from.  |
//! | `roles`              | `BTreeSet<Role>`         | Roles held at login.                                 |
//! | `permissions`        | `PermissionSet`          | Permissions resolved from `roles` at login.          |
//! | `access_token`       | `String`                 | The single currently valid access token.             |
//! | `refresh_token`      | `String`                 | The refresh token bound to this session.             |
//! | `created_at`         | `DateTime`               | The timestamp when the session was created.          |
//! | `last_activity`      | `DateTime`               | The timestamp of the last authenticated use.         |
//! | `refresh_expires_at` | `DateTime`               | When the refresh token, and so the session, expires. |
//! | `client`             | `Option<ClientMetadata>` | User agent and IP address of the creating client.    |

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Error, UserId,
    error::ConfigurationError,
    id::{generate_prefixed_id, validate_prefixed_id},
    identity::Identity,
    rbac::{PermissionSet, Role},
    token::default_refresh_ttl,
};

/// A unique identifier for a session
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: &str) -> Self {
        SessionId(id.to_string())
    }

    pub fn new_random() -> Self {
        SessionId(generate_prefixed_id("sess"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Validate that this ID has the format of a generated session ID
    pub fn is_valid(&self) -> bool {
        validate_prefixed_id(&self.0, "sess")
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new_random()
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Client details captured at login
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMetadata {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl ClientMetadata {
    pub fn new(user_agent: Option<String>, ip_address: Option<String>) -> Self {
        Self {
            user_agent,
            ip_address,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub identity: Identity,
    pub roles: BTreeSet<Role>,
    pub permissions: PermissionSet,
    pub access_token: String,
    pub refresh_token: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    pub client: Option<ClientMetadata>,
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// A session expires together with its refresh token
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.refresh_expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Whether the session holds any of `roles`
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.iter().any(|role| self.roles.contains(role))
    }
}

#[derive(Default)]
pub struct SessionBuilder {
    session_id: Option<SessionId>,
    user_id: Option<UserId>,
    identity: Option<Identity>,
    roles: BTreeSet<Role>,
    permissions: Option<PermissionSet>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    created_at: Option<DateTime<Utc>>,
    last_activity: Option<DateTime<Utc>>,
    refresh_expires_at: Option<DateTime<Utc>>,
    client: Option<ClientMetadata>,
}

impl SessionBuilder {
    pub fn session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Set the identity; the user id is derived from it unless set explicitly
    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn roles(mut self, roles: BTreeSet<Role>) -> Self {
        self.roles = roles;
        self
    }

    pub fn permissions(mut self, permissions: PermissionSet) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn last_activity(mut self, last_activity: DateTime<Utc>) -> Self {
        self.last_activity = Some(last_activity);
        self
    }

    pub fn refresh_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.refresh_expires_at = Some(expires_at);
        self
    }

    pub fn client(mut self, client: Option<ClientMetadata>) -> Self {
        self.client = client;
        self
    }

    pub fn build(self) -> Result<Session, Error> {
        let now = Utc::now();
        let identity = self.identity.ok_or_else(|| {
            ConfigurationError::Invalid("Session identity is required".to_string())
        })?;
        let access_token = self.access_token.ok_or_else(|| {
            ConfigurationError::Invalid("Session access token is required".to_string())
        })?;
        let refresh_token = self.refresh_token.ok_or_else(|| {
            ConfigurationError::Invalid("Session refresh token is required".to_string())
        })?;

        Ok(Session {
            session_id: self.session_id.unwrap_or_default(),
            user_id: self
                .user_id
                .unwrap_or_else(|| UserId::from_identity(&identity)),
            identity,
            roles: self.roles,
            permissions: self.permissions.unwrap_or_else(PermissionSet::empty),
            access_token,
            refresh_token,
            created_at: self.created_at.unwrap_or(now),
            last_activity: self.last_activity.unwrap_or(now),
            refresh_expires_at: self
                .refresh_expires_at
                .unwrap_or(now + default_refresh_ttl()),
            client: self.client,
        })
    }
}
