//! Deterministic key derivation from a wallet signature.
//!
//! The user signs a fixed message with their ordinary wallet; the 65-byte
//! signature seeds both stealth key pairs. Signing the same message again
//! always reproduces the same keys, so there is nothing extra to back up.
//!
//! ## Derivation
//!
//! ```text
//! spending_sk = reduce(keccak256(DOMAIN_SPENDING_KEY || signature))
//! viewing_sk  = reduce(keccak256(DOMAIN_VIEWING_KEY  || signature))
//! ```
//!
//! The full signature feeds each hash; the two keys differ only in their
//! domain separator. Deriving each key from a signature fragment would
//! halve the entropy backing it, so that is deliberately not done here.

use obscura_core::constants::{DOMAIN_SPENDING_KEY, DOMAIN_VIEWING_KEY, SIGNATURE_SIZE};
use obscura_core::error::{ObscuraError, Result};
use obscura_core::types::{KeyPair, StealthKeySet};

use crate::curve::{encode_scalar, public_key_for, scalar_from_hash};
use crate::hash::keccak256_tagged;

/// The fixed message a wallet signs to seed key derivation.
///
/// Any wallet signing this exact byte string produces the same key set
/// every time.
pub const KEY_DERIVATION_MESSAGE: &[u8] =
    b"Obscura stealth keys v1\n\nSign this message to derive your stealth address keys.\nOnly sign this in the official app.";

/// Derives the complete stealth key set from a wallet signature.
///
/// # Arguments
///
/// * `signature` - A 65-byte `r || s || v` signature over
///   [`KEY_DERIVATION_MESSAGE`]
///
/// # Errors
///
/// Returns [`ObscuraError::InvalidSignature`] if the signature has the
/// wrong length, is all zeros, or (with probability ~2^-256) reduces to a
/// degenerate zero scalar.
pub fn derive_key_set(signature: &[u8]) -> Result<StealthKeySet> {
    if signature.len() != SIGNATURE_SIZE {
        return Err(ObscuraError::InvalidSignature(format!(
            "expected {} bytes, got {}",
            SIGNATURE_SIZE,
            signature.len()
        )));
    }

    if signature.iter().all(|&b| b == 0) {
        return Err(ObscuraError::InvalidSignature(
            "signature is all zeros".into(),
        ));
    }

    let spending = keypair_from_seed(DOMAIN_SPENDING_KEY, signature)?;
    let viewing = keypair_from_seed(DOMAIN_VIEWING_KEY, signature)?;

    Ok(StealthKeySet::new(spending, viewing))
}

fn keypair_from_seed(domain: &[u8], signature: &[u8]) -> Result<KeyPair> {
    let digest = keccak256_tagged(domain, signature);
    let scalar = scalar_from_hash(&digest);

    let public = public_key_for(&scalar)
        .map_err(|_| ObscuraError::InvalidSignature("signature reduces to zero scalar".into()))?;

    Ok(KeyPair::new(public, encode_scalar(&scalar)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{decode_public_key, decode_secret_scalar};
    use k256::ProjectivePoint;

    fn test_signature() -> Vec<u8> {
        // Shape of a real r || s || v signature
        let mut sig = vec![0xA7u8; 64];
        sig.push(27);
        sig
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let sig = test_signature();
        let keys1 = derive_key_set(&sig).unwrap();
        let keys2 = derive_key_set(&sig).unwrap();

        assert_eq!(keys1.spending.public, keys2.spending.public);
        assert_eq!(keys1.viewing.public, keys2.viewing.public);
        assert_eq!(
            keys1.spending.secret.as_bytes(),
            keys2.spending.secret.as_bytes()
        );
    }

    #[test]
    fn test_spending_and_viewing_keys_differ() {
        let keys = derive_key_set(&test_signature()).unwrap();
        assert_ne!(keys.spending.public, keys.viewing.public);
        assert_ne!(
            keys.spending.secret.as_bytes(),
            keys.viewing.secret.as_bytes()
        );
    }

    #[test]
    fn test_different_signatures_different_keys() {
        let keys1 = derive_key_set(&test_signature()).unwrap();

        let mut other = test_signature();
        other[0] ^= 1;
        let keys2 = derive_key_set(&other).unwrap();

        assert_ne!(keys1.spending.public, keys2.spending.public);
        assert_ne!(keys1.viewing.public, keys2.viewing.public);
    }

    #[test]
    fn test_public_keys_match_secrets() {
        let keys = derive_key_set(&test_signature()).unwrap();

        for pair in [&keys.spending, &keys.viewing] {
            let scalar = decode_secret_scalar(&pair.secret).unwrap();
            let point = decode_public_key(&pair.public).unwrap();
            assert_eq!(point, ProjectivePoint::GENERATOR * scalar);
        }
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(matches!(
            derive_key_set(&[0xA7; 64]),
            Err(ObscuraError::InvalidSignature(_))
        ));
        assert!(derive_key_set(&[0xA7; 66]).is_err());
        assert!(derive_key_set(&[]).is_err());
    }

    #[test]
    fn test_rejects_all_zero_signature() {
        assert!(matches!(
            derive_key_set(&[0u8; SIGNATURE_SIZE]),
            Err(ObscuraError::InvalidSignature(_))
        ));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn arb_signature() -> impl Strategy<Value = Vec<u8>> {
            prop::collection::vec(any::<u8>(), SIGNATURE_SIZE)
                .prop_filter("all-zero signatures are rejected", |sig| {
                    sig.iter().any(|&b| b != 0)
                })
        }

        proptest! {
            #[test]
            fn derivation_succeeds_and_is_deterministic(sig in arb_signature()) {
                let keys1 = derive_key_set(&sig).unwrap();
                let keys2 = derive_key_set(&sig).unwrap();

                prop_assert_eq!(keys1.spending.public, keys2.spending.public);
                prop_assert_eq!(keys1.viewing.public, keys2.viewing.public);
                prop_assert_ne!(keys1.spending.public, keys1.viewing.public);
            }

            #[test]
            fn wrong_length_always_rejected(sig in prop::collection::vec(any::<u8>(), 0..130)) {
                prop_assume!(sig.len() != SIGNATURE_SIZE);
                prop_assert!(derive_key_set(&sig).is_err());
            }
        }
    }
}
