//! User identifiers
//!
//! Users are not stored by this crate. A user is identified by the provider
//! that authenticated them and that provider's stable subject id, joined as
//! `{provider}_{provider_id}` (for example `google_42`).
use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// A unique, stable identifier for a specific user
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: &str) -> Self {
        UserId(id.to_string())
    }

    /// Derive the user id for a normalized identity
    pub fn from_identity(identity: &Identity) -> Self {
        UserId(format!("{}_{}", identity.provider_name, identity.provider_id))
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
