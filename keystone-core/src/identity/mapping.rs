//! Per-provider payload mapping rules
//!
//! Each supported provider owns exactly one [`PayloadMapping`] naming the JSON
//! keys its user-info payload uses. Keys listed in a slice are tried in order;
//! no other keys are consulted.

use serde_json::{Map, Value};

use crate::{
    error::{IdentityError, utilities::RequiredFieldExt},
    validation::normalize_email,
};

use super::{Identity, Provider};

/// Required-field contract for one provider's raw payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadMapping {
    /// Key of the stable subject id (string or integer)
    pub id: &'static str,
    /// Keys that may carry the email address
    pub email: &'static [&'static str],
    /// Keys that may carry the display name
    pub display_name: &'static [&'static str],
    /// Key of the avatar URL, when the provider reports one
    pub avatar_url: Option<&'static str>,
    /// Key of the email-verified flag, when the provider reports one
    pub email_verified: Option<&'static str>,
}

pub const GOOGLE: PayloadMapping = PayloadMapping {
    id: "id",
    email: &["email"],
    display_name: &["name"],
    avatar_url: Some("picture"),
    email_verified: Some("verified_email"),
};

/// Microsoft Graph `/me`; work accounts may omit `mail`.
pub const MICROSOFT: PayloadMapping = PayloadMapping {
    id: "id",
    email: &["mail", "userPrincipalName"],
    display_name: &["displayName"],
    avatar_url: None,
    email_verified: None,
};

pub const GITHUB: PayloadMapping = PayloadMapping {
    id: "id",
    email: &["email"],
    display_name: &["name", "login"],
    avatar_url: Some("avatar_url"),
    email_verified: None,
};

pub const AUTH0: PayloadMapping = PayloadMapping {
    id: "sub",
    email: &["email"],
    display_name: &["name"],
    avatar_url: Some("picture"),
    email_verified: Some("email_verified"),
};

pub const OKTA: PayloadMapping = PayloadMapping {
    id: "sub",
    email: &["email"],
    display_name: &["name", "preferred_username"],
    avatar_url: None,
    email_verified: Some("email_verified"),
};

impl PayloadMapping {
    /// Apply this mapping to a raw payload.
    pub fn apply(&self, provider: Provider, payload: &Value) -> Result<Identity, IdentityError> {
        let object = payload.as_object().ok_or_else(|| {
            IdentityError::MalformedPayload("payload must be a JSON object".to_string())
        })?;

        let provider_id = id_field(object, self.id).require_field(self.id)?;

        let email = self.email.iter().find_map(|key| {
            let raw = string_field(object, key)?;
            normalize_email(&raw)
                .inspect_err(|e| {
                    tracing::debug!(%provider, key, error = %e, "Ignoring unusable email")
                })
                .ok()
        });
        let display_name = first_string(object, self.display_name);

        if email.is_none() && display_name.is_none() {
            return Err(IdentityError::MalformedPayload(
                "email or display name is required".to_string(),
            ));
        }

        let avatar_url = self.avatar_url.and_then(|key| string_field(object, key));
        let email_verified = self
            .email_verified
            .and_then(|key| object.get(key))
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Ok(Identity {
            provider_id,
            provider_name: provider,
            email,
            display_name,
            avatar_url,
            email_verified,
        })
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn first_string(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| string_field(object, key))
}

fn id_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::Number(number) => Some(number.to_string()),
        Value::String(_) => string_field(object, key),
        _ => None,
    }
}
