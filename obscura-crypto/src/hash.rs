//! Hashing utilities with domain separation.
//!
//! Every hash in the protocol is keccak-256, matching Ethereum's address
//! scheme, and every invocation carries a unique domain separator:
//!
//! ```text
//! output = keccak256(len(domain) || domain || input)
//! ```
//!
//! This prevents cross-protocol attacks where the same input might be
//! used in different contexts. In particular, the stealth scalar and the
//! view tag hash the same shared secret; domain separation is what keeps
//! the published view tag from leaking scalar bits.

use sha3::{Digest, Keccak256};

use obscura_core::constants::KECCAK256_SIZE;

/// Computes the plain keccak-256 hash of the input.
///
/// Note: keccak-256 is NOT SHA3-256. They use different padding.
pub fn keccak256(input: &[u8]) -> [u8; KECCAK256_SIZE] {
    let mut hasher = Keccak256::new();
    Digest::update(&mut hasher, input);
    hasher.finalize().into()
}

/// Computes keccak-256 with domain separation.
///
/// # Arguments
///
/// * `domain` - Domain separator bytes (unique per use case)
/// * `input` - Input data to hash
pub fn keccak256_tagged(domain: &[u8], input: &[u8]) -> [u8; KECCAK256_SIZE] {
    let mut hasher = Keccak256::new();

    // Domain separation: prepend domain with length prefix
    Digest::update(&mut hasher, (domain.len() as u32).to_le_bytes());
    Digest::update(&mut hasher, domain);

    Digest::update(&mut hasher, input);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use obscura_core::constants::*;

    #[test]
    fn test_keccak256_known_vector() {
        let hash = keccak256(b"hello");

        let expected =
            hex::decode("1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8")
                .unwrap();
        assert_eq!(hash.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_keccak256_tagged_deterministic() {
        let h1 = keccak256_tagged(b"domain", b"input");
        let h2 = keccak256_tagged(b"domain", b"input");
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_keccak256_domain_separation() {
        let h1 = keccak256_tagged(b"domain1", b"input");
        let h2 = keccak256_tagged(b"domain2", b"input");
        assert_ne!(h1, h2);

        // Tagged hash must also differ from the plain hash of the input
        assert_ne!(keccak256_tagged(b"d", b"input"), keccak256(b"input"));
    }

    #[test]
    fn test_protocol_domains_produce_different_outputs() {
        let input = [0u8; 32];

        let spend = keccak256_tagged(DOMAIN_SPENDING_KEY, &input);
        let view = keccak256_tagged(DOMAIN_VIEWING_KEY, &input);
        let scalar = keccak256_tagged(DOMAIN_STEALTH_SCALAR, &input);
        let tag = keccak256_tagged(DOMAIN_VIEW_TAG, &input);

        assert_ne!(spend, view);
        assert_ne!(spend, scalar);
        assert_ne!(scalar, tag);
        assert_ne!(view, tag);
    }
}
