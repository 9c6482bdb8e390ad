use crate::error::IdentityError;
use regex::Regex;
use std::sync::LazyLock;

/// Lazy-loaded email validation regex
///
/// Validates a practical subset of RFC 5322, compiled once and reused. The
/// local part accepts every RFC 5322 `atext` character, so guest accounts such
/// as `jo_example.com#EXT#@tenant.onmicrosoft.com` pass.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("Invalid email regex pattern")
});

/// Normalize and validate an email address reported by an identity provider.
///
/// Surrounding whitespace is trimmed and the address is lower-cased.
///
/// # Examples
///
/// ```rust
/// use keystone_core::validation::normalize_email;
///
/// assert_eq!(normalize_email(" User@Example.COM ").unwrap(), "user@example.com");
/// assert!(normalize_email("invalid-email").is_err());
/// ```
pub fn normalize_email(email: &str) -> Result<String, IdentityError> {
    let email = email.trim().to_lowercase();

    if email.len() > 254 {
        return Err(IdentityError::MalformedPayload("Email is too long".to_string()));
    }

    if EMAIL_REGEX.is_match(&email) {
        Ok(email)
    } else {
        Err(IdentityError::MalformedPayload(format!("Invalid email format: {email}")))
    }
}
