//! Opaque access tokens and bearer secret checks.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// 64 hex characters of randomness for portal, viewer and unsubscribe links.
pub fn issue_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// A configured shared secret, kept only as its SHA-256 digest.
#[derive(Clone)]
pub struct BearerSecret {
    digest: Vec<u8>,
}

impl BearerSecret {
    pub fn new(secret: &str) -> Self {
        Self {
            digest: hash_secret(secret),
        }
    }

    /// Short stable label for the secret, safe to use as a map key or in logs.
    pub fn fingerprint(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.digest[..12])
    }

    /// Constant-time comparison of digests so timing does not leak prefixes.
    pub fn verify(&self, presented: &str) -> bool {
        self.digest.ct_eq(&hash_secret(presented)).unwrap_u8() == 1
    }
}

impl std::fmt::Debug for BearerSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerSecret(..)")
    }
}

fn hash_secret(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_are_long_and_distinct() {
        let first = issue_token();
        let second = issue_token();
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|ch| ch.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }

    #[test]
    fn bearer_secret_matches_only_exact_value() {
        let secret = BearerSecret::new("s3cret-value");
        assert!(secret.verify("s3cret-value"));
        assert!(!secret.verify("s3cret-valu"));
        assert!(!secret.verify(""));
        assert_eq!(format!("{secret:?}"), "BearerSecret(..)");
    }

    #[test]
    fn fingerprint_is_stable_and_hides_the_secret() {
        let secret = BearerSecret::new("s3cret-value");
        assert_eq!(secret.fingerprint(), BearerSecret::new("s3cret-value").fingerprint());
        assert_ne!(secret.fingerprint(), BearerSecret::new("other").fingerprint());
        assert_eq!(secret.fingerprint().len(), 16);
        assert!(!secret.fingerprint().contains("s3cret"));
    }
}
