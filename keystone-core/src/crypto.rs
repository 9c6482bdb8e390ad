//! Cryptographic helpers for secret generation and token indexing
//!
//! The refresh token index is keyed by SHA256 digests of refresh tokens rather
//! than the tokens themselves, and token equality checks use constant-time
//! comparison via the `subtle` crate.

use rand::{TryRngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Length in bytes of a generated HS256 signing secret.
pub const SECRET_KEY_LEN: usize = 32;

/// Generate a random signing secret from the OS RNG.
///
/// # Panics
///
/// Panics if the OS random number generator fails. This indicates a critical
/// system failure from which recovery is not possible for key material.
pub fn generate_secret_key() -> Vec<u8> {
    let mut bytes = vec![0u8; SECRET_KEY_LEN];
    OsRng
        .try_fill_bytes(&mut bytes)
        .expect("OS RNG failure - system entropy source unavailable");
    bytes
}

/// Hash a token for use as an index key.
///
/// Returns the hex-encoded SHA256 digest of the token.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Perform constant-time comparison of two byte slices.
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_secret_key() {
        let a = generate_secret_key();
        let b = generate_secret_key();

        assert_eq!(a.len(), SECRET_KEY_LEN);
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_is_deterministic_hex() {
        let hash1 = hash_token("refresh_token");
        let hash2 = hash_token("refresh_token");

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
        assert!(hash1.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(hash1, hash_token("other_token"));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare(b"hello", b"hello"));
        assert!(constant_time_compare(b"", b""));
        assert!(!constant_time_compare(b"hello", b"world"));
        assert!(!constant_time_compare(b"short", b"longer_string"));
    }
}
