//! Identity normalization
//!
//! OAuth providers report the authenticated user in their own payload shapes.
//! This module turns those raw payloads into a canonical [`Identity`]:
//!
//! | Field            | Type             | Description                                     |
//! | ---------------- | ---------------- | ----------------------------------------------- |
//! | `provider_id`    | `String`         | The provider's stable subject id.               |
//! | `provider_name`  | `Provider`       | The provider that authenticated the user.       |
//! | `email`          | `Option<String>` | Lower-cased email address, if reported.         |
//! | `display_name`   | `Option<String>` | Human readable name, if reported.               |
//! | `avatar_url`     | `Option<String>` | Profile picture URL, if reported.               |
//! | `email_verified` | `bool`           | Whether the provider vouches for the email.     |
//!
//! At least one of `email` and `display_name` is always present.

pub mod mapping;
pub mod provider;

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, error::IdentityError};

pub use mapping::PayloadMapping;
pub use provider::IdentityProvider;

/// Supported identity providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Microsoft,
    Github,
    Auth0,
    Okta,
}

impl Provider {
    pub const ALL: [Provider; 5] = [
        Provider::Google,
        Provider::Microsoft,
        Provider::Github,
        Provider::Auth0,
        Provider::Okta,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Microsoft => "microsoft",
            Self::Github => "github",
            Self::Auth0 => "auth0",
            Self::Okta => "okta",
        }
    }

    /// The payload mapping rule for this provider
    pub fn mapping(&self) -> &'static PayloadMapping {
        match self {
            Self::Google => &mapping::GOOGLE,
            Self::Microsoft => &mapping::MICROSOFT,
            Self::Github => &mapping::GITHUB,
            Self::Auth0 => &mapping::AUTH0,
            Self::Okta => &mapping::OKTA,
        }
    }

    /// Normalize a raw payload returned by this provider
    pub fn normalize(&self, raw_payload: &Value) -> Result<Identity, IdentityError> {
        self.mapping().apply(*self, raw_payload)
    }
}

impl FromStr for Provider {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Provider::ALL
            .into_iter()
            .find(|provider| provider.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| IdentityError::UnsupportedProvider(name.to_string()))
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Canonical user assertion derived from a provider callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub provider_id: String,
    pub provider_name: Provider,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub email_verified: bool,
}

/// Map a provider's raw callback payload into an [`Identity`].
///
/// # Errors
///
/// * [`IdentityError::UnsupportedProvider`] if `provider_name` is not recognized
/// * [`IdentityError::MalformedPayload`] if the provider id is missing, or both
///   email and display name are missing
///
/// # Example
///
/// ```rust
/// use keystone_core::identity::normalize;
/// use serde_json::json;
///
/// let identity = normalize("google", &json!({"id": "42", "email": "a@b.com", "name": "A"})).unwrap();
/// assert_eq!(identity.provider_id, "42");
/// ```
pub fn normalize(provider_name: &str, raw_payload: &Value) -> Result<Identity, Error> {
    let provider = provider_name.parse::<Provider>()?;
    Ok(provider.normalize(raw_payload)?)
}
