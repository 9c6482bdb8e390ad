//! Role based access control
//!
//! Permissions derive from role membership only. The [`RoleCatalog`] maps each
//! role to the permissions it grants and is fixed once the [`RbacResolver`] is
//! built. Per-user role assignments are mutable and held in a [`DashMap`], so
//! assigning or removing roles for one user never blocks another user.
//!
//! A role granting the wildcard permission `"*"` resolves to
//! [`PermissionSet::All`], which satisfies every permission check.

use std::collections::{BTreeMap, BTreeSet};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::{Error, UserId, error::ConfigurationError};

/// Permission string that grants every permission
pub const WILDCARD: &str = "*";

/// Role reported for users without explicit assignments
pub const DEFAULT_ROLE: &str = "user";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    pub fn new(role: &str) -> Self {
        Role(role.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(String);

impl Permission {
    pub fn new(permission: &str) -> Self {
        Permission(permission.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.0 == WILDCARD
    }
}

impl From<&str> for Permission {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Permission {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolved permissions of a role set
///
/// Serializes as a list of permission strings; [`PermissionSet::All`] is
/// written as `["*"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<Permission>", from = "Vec<Permission>")]
pub enum PermissionSet {
    /// Every permission is granted
    All,
    /// Exactly the listed permissions are granted
    Only(BTreeSet<Permission>),
}

impl PermissionSet {
    pub fn empty() -> Self {
        PermissionSet::Only(BTreeSet::new())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, PermissionSet::All)
    }

    pub fn contains(&self, permission: &Permission) -> bool {
        match self {
            PermissionSet::All => true,
            PermissionSet::Only(permissions) => permissions.contains(permission),
        }
    }

    /// Whether any of `permissions` is granted
    pub fn contains_any(&self, permissions: &[Permission]) -> bool {
        permissions.iter().any(|permission| self.contains(permission))
    }

    /// Permission names, sorted; `["*"]` for [`PermissionSet::All`]
    pub fn names(&self) -> Vec<String> {
        Vec::<Permission>::from(self.clone())
            .into_iter()
            .map(|permission| permission.0)
            .collect()
    }
}

impl From<PermissionSet> for Vec<Permission> {
    fn from(set: PermissionSet) -> Self {
        match set {
            PermissionSet::All => vec![Permission::new(WILDCARD)],
            PermissionSet::Only(permissions) => permissions.into_iter().collect(),
        }
    }
}

impl From<Vec<Permission>> for PermissionSet {
    fn from(permissions: Vec<Permission>) -> Self {
        permissions.into_iter().collect()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        let mut permissions = BTreeSet::new();
        for permission in iter {
            if permission.is_wildcard() {
                return PermissionSet::All;
            }
            permissions.insert(permission);
        }
        PermissionSet::Only(permissions)
    }
}

/// Role to permission table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleCatalog(BTreeMap<Role, BTreeSet<Permission>>);

impl RoleCatalog {
    pub fn empty() -> Self {
        RoleCatalog(BTreeMap::new())
    }

    /// Add or replace a role
    pub fn with_role<P>(mut self, role: &str, permissions: impl IntoIterator<Item = P>) -> Self
    where
        P: Into<Permission>,
    {
        self.0.insert(
            Role::new(role),
            permissions.into_iter().map(Into::into).collect(),
        );
        self
    }

    pub fn contains(&self, role: &Role) -> bool {
        self.0.contains_key(role)
    }

    pub fn permissions(&self, role: &Role) -> Option<&BTreeSet<Permission>> {
        self.0.get(role)
    }

    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for RoleCatalog {
    fn default() -> Self {
        RoleCatalog::empty()
            .with_role("admin", [WILDCARD])
            .with_role(
                "moderator",
                ["read", "create_own", "update_any", "delete_any"],
            )
            .with_role(DEFAULT_ROLE, ["read", "create_own"])
            .with_role("guest", ["read"])
    }
}

/// Resolves roles to permissions and tracks per-user role assignments
pub struct RbacResolver {
    catalog: RoleCatalog,
    assignments: DashMap<UserId, BTreeSet<Role>>,
}

impl RbacResolver {
    pub fn new(catalog: RoleCatalog) -> Self {
        Self {
            catalog,
            assignments: DashMap::new(),
        }
    }

    pub fn catalog(&self) -> &RoleCatalog {
        &self.catalog
    }

    /// Union of the permissions granted by `roles`
    ///
    /// Roles missing from the catalog grant nothing.
    pub fn resolve<'a>(&self, roles: impl IntoIterator<Item = &'a Role>) -> PermissionSet {
        roles
            .into_iter()
            .filter_map(|role| self.catalog.permissions(role))
            .flatten()
            .cloned()
            .collect()
    }

    /// Roles assigned to a user, or `{"user"}` when none are assigned
    pub fn get_roles(&self, user_id: &UserId) -> BTreeSet<Role> {
        match self.assignments.get(user_id) {
            Some(roles) => roles.clone(),
            None => BTreeSet::from([Role::new(DEFAULT_ROLE)]),
        }
    }

    /// Assign a catalog role to a user
    ///
    /// The first explicit assignment replaces the implicit default role.
    pub fn assign(&self, user_id: &UserId, role: &Role) -> Result<(), Error> {
        if !self.catalog.contains(role) {
            tracing::warn!(user_id = %user_id, role = %role, "Rejected assignment of unknown role");
            return Err(ConfigurationError::UnknownRole(role.to_string()).into());
        }

        self.assignments
            .entry(user_id.clone())
            .or_default()
            .insert(role.clone());

        tracing::info!(user_id = %user_id, role = %role, "Assigned role");
        Ok(())
    }

    /// Remove a role from a user
    ///
    /// Returns whether the role was assigned. Removing the last role restores
    /// the default.
    pub fn remove(&self, user_id: &UserId, role: &Role) -> bool {
        let removed = self
            .assignments
            .get_mut(user_id)
            .is_some_and(|mut roles| roles.remove(role));
        self.assignments
            .remove_if(user_id, |_, roles| roles.is_empty());

        if removed {
            tracing::info!(user_id = %user_id, role = %role, "Removed role");
        }
        removed
    }
}

impl Default for RbacResolver {
    fn default() -> Self {
        Self::new(RoleCatalog::default())
    }
}
