//! Prefixed identifier generation
//!
//! Session ids are generated as `{prefix}_{random}` where the random part is
//! at least 96 bits of OS randomness encoded as URL-safe base64.

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};

/// Minimum number of random bytes in a generated id.
const MIN_ID_BYTES: usize = 12;

/// Generate a prefixed ID with 96 bits of entropy
///
/// # Example
/// ```
/// use keystone_core::id::generate_prefixed_id;
///
/// let session_id = generate_prefixed_id("sess");
/// assert!(session_id.starts_with("sess_"));
/// ```
///
/// # Panics
///
/// Panics if the OS random number generator fails.
pub fn generate_prefixed_id(prefix: &str) -> String {
    let mut bytes = [0u8; MIN_ID_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .expect("OS RNG failure - system entropy source unavailable");

    format!("{prefix}_{}", BASE64_URL_SAFE_NO_PAD.encode(bytes))
}

/// Validate that a prefixed ID has the expected format
pub fn validate_prefixed_id(id: &str, expected_prefix: &str) -> bool {
    let Some(random_part) = id
        .strip_prefix(expected_prefix)
        .and_then(|rest| rest.strip_prefix('_'))
    else {
        return false;
    };

    match BASE64_URL_SAFE_NO_PAD.decode(random_part) {
        Ok(decoded) => decoded.len() >= MIN_ID_BYTES,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_prefixed_id() {
        let id = generate_prefixed_id("sess");
        assert!(id.starts_with("sess_"));

        let id2 = generate_prefixed_id("sess");
        assert_ne!(id, id2);
    }

    #[test]
    fn test_validate_prefixed_id() {
        let id = generate_prefixed_id("sess");
        assert!(validate_prefixed_id(&id, "sess"));
        assert!(!validate_prefixed_id(&id, "usr"));

        assert!(!validate_prefixed_id("sess", "sess"));
        assert!(!validate_prefixed_id("sess_", "sess"));
        assert!(!validate_prefixed_id("sess_short", "sess"));
        assert!(!validate_prefixed_id("sess_invalid!", "sess"));
    }

    #[test]
    fn test_id_is_url_safe() {
        let id = generate_prefixed_id("sess");
        assert!(
            id.chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        );
    }
}
