//! Content and location hashing
//!
//! Cache keys are built from two SHA-1 digests: one over the file's logical
//! location (the key prefix) and one over its content (the key suffix).

use sha1::{Digest, Sha1};

/// Lowercase hex SHA-1 digest of arbitrary bytes.
///
/// Pure and deterministic; collision-resistant enough that two distinct
/// contents are treated as distinct with overwhelming probability.
pub fn hash_bytes(bytes: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes.as_ref());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        assert_eq!(hash_bytes(""), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(
            hash_bytes("hello world"),
            "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed"
        );
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(hash_bytes("same input"), hash_bytes("same input"));
    }

    #[test]
    fn test_distinct_inputs_distinct_digests() {
        assert_ne!(hash_bytes("a"), hash_bytes("b"));
    }

    #[test]
    fn test_digest_shape() {
        let digest = hash_bytes("anything");
        assert_eq!(digest.len(), 40);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(digest, digest.to_lowercase());
    }
}
