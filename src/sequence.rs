//! Deterministic identifiers and content hashes.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};
use xxhash_rust::xxh3::xxh3_64;

/// 64-bit content hash encoded as 11 URL-safe base64 characters.
pub fn short_hash(content: &str) -> String {
    URL_SAFE_NO_PAD.encode(xxh3_64(content.as_bytes()).to_be_bytes())
}

/// Stable SHA-256 hex digest, used for template fingerprints.
pub fn digest_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Per-compile counter yielding stable short identifiers.
///
/// Two sequences with the same salt produce the same identifiers in the same
/// order, which keeps payload emission byte-identical across compiles.
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    salt: String,
    counter: u64,
}

impl Sequence {
    pub fn new(salt: impl Into<String>) -> Self {
        Self {
            salt: salt.into(),
            counter: 0,
        }
    }

    /// Child sequence salted with `name`, e.g. a component name.
    pub fn salted(&self, name: &str) -> Self {
        Self::new(format!("{}/{}", self.salt, name))
    }

    pub fn next(&mut self) -> u64 {
        let value = self.counter;
        self.counter += 1;
        value
    }

    pub fn next_hash(&mut self) -> String {
        let value = self.next();
        short_hash(&format!("{}:{}", self.salt, value))
    }

    /// Interpolation placeholder, usable as a CSS class name.
    pub fn placeholder(&mut self) -> String {
        format!("_i_{}", self.next_hash())
    }

    /// Element handle class for a named reference.
    pub fn reference_handle(&self, var_name: &str) -> String {
        format!("_ref_{}", short_hash(&format!("{}#{}", self.salt, var_name)))
    }

    /// Element handle class for an anonymous bound element.
    pub fn element_handle(&mut self) -> String {
        format!("_ref_{}", self.next_hash())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_hash_is_eleven_url_safe_chars() {
        let hash = short_hash("console.log('hi')");
        assert_eq!(hash.len(), 11);
        assert!(hash
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(hash, short_hash("console.log('hi')"));
    }

    #[test]
    fn test_sequences_with_same_salt_agree() {
        let mut a = Sequence::new("page").salted("counter");
        let mut b = Sequence::new("page").salted("counter");
        assert_eq!(a.placeholder(), b.placeholder());
        assert_eq!(a.element_handle(), b.element_handle());
        assert_ne!(a.placeholder(), a.placeholder());
    }

    #[test]
    fn test_digest_is_hex() {
        let digest = digest_hex("<div></div>");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
