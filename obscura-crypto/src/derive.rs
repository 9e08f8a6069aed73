//! Stealth key and address derivation.
//!
//! This module implements the core ECDH operations shared by senders and
//! recipients.
//!
//! ## Derivation Flow
//!
//! ```text
//! S = eph_sk · viewing_pk        (sender)
//!   = viewing_sk · eph_pk        (recipient, same point)
//!       ↓
//! t = reduce(keccak256(DOMAIN_STEALTH_SCALAR || S))
//!       ↓
//! stealth_pk = spending_pk + t·G
//!       ↓
//! eth_address = keccak256(uncompressed(stealth_pk)[1..])[12..32]
//! ```
//!
//! ## Private Key Derivation
//!
//! Only the holder of the spending secret can spend:
//!
//! ```text
//! stealth_sk = (spending_sk + t) mod n
//! ```
//!
//! The viewing secret alone yields `t` and therefore detection, but never
//! the stealth private key.

use k256::{ProjectivePoint, Scalar};
use zeroize::{Zeroize, ZeroizeOnDrop};

use obscura_core::constants::{DOMAIN_STEALTH_SCALAR, ETH_ADDRESS_SIZE, PUBLIC_KEY_SIZE};
use obscura_core::error::{ObscuraError, Result};
use obscura_core::types::{CurvePublicKey, EthAddress, SecretScalar};

use crate::curve::{decode_public_key, decode_secret_scalar, encode_point, encode_scalar};
use crate::hash::{keccak256, keccak256_tagged};

// ═══════════════════════════════════════════════════════════════════════════════
// SHARED SECRET
// ═══════════════════════════════════════════════════════════════════════════════

/// An ECDH shared secret point, compressed.
///
/// Both sides of a payment arrive at the same point from different key
/// material. Zeroized on drop; everything downstream (stealth scalar,
/// view tag) is derived from these bytes.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret {
    bytes: [u8; PUBLIC_KEY_SIZE],
}

impl SharedSecret {
    /// Returns the compressed SEC1 bytes of the shared point.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SharedSecret([REDACTED])")
    }
}

/// Computes the ECDH shared secret `S = secret · public`.
///
/// The sender calls this with (ephemeral secret, viewing public); the
/// recipient with (viewing secret, ephemeral public). Both yield the same
/// point.
pub fn compute_shared_secret(
    secret: &SecretScalar,
    public: &CurvePublicKey,
) -> Result<SharedSecret> {
    let scalar = decode_secret_scalar(secret)?;
    let point = decode_public_key(public)?;
    shared_secret_from_parts(&scalar, &point)
}

/// ECDH over already-validated arithmetic types.
pub(crate) fn shared_secret_from_parts(
    scalar: &Scalar,
    point: &ProjectivePoint,
) -> Result<SharedSecret> {
    let shared = point * scalar;
    let encoded = encode_point(&shared)
        .map_err(|_| ObscuraError::InvalidPublicKey("ECDH produced the identity".into()))?;

    Ok(SharedSecret {
        bytes: *encoded.as_array(),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// STEALTH SCALAR
// ═══════════════════════════════════════════════════════════════════════════════

/// Derives the stealth scalar `t` from a shared secret.
pub fn derive_stealth_scalar(shared: &SharedSecret) -> Scalar {
    let digest = keccak256_tagged(DOMAIN_STEALTH_SCALAR, shared.as_bytes());
    crate::curve::scalar_from_hash(&digest)
}

// ═══════════════════════════════════════════════════════════════════════════════
// STEALTH PUBLIC KEY DERIVATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Derives the stealth public key `P = spending_pk + t·G`.
pub fn derive_stealth_public_key(
    spending_pk: &CurvePublicKey,
    shared: &SharedSecret,
) -> Result<CurvePublicKey> {
    let spend_point = decode_public_key(spending_pk)?;
    let t = derive_stealth_scalar(shared);

    let stealth_point = spend_point + ProjectivePoint::GENERATOR * t;
    encode_point(&stealth_point)
}

// ═══════════════════════════════════════════════════════════════════════════════
// STEALTH PRIVATE KEY DERIVATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Derives the stealth private key `p = (spending_sk + t) mod n`.
///
/// # Security
///
/// The output controls funds. It is zeroized on drop and must never be
/// logged or serialized outside an explicit export.
pub fn derive_stealth_private_key(
    spending_sk: &SecretScalar,
    shared: &SharedSecret,
) -> Result<SecretScalar> {
    let spend_scalar = decode_secret_scalar(spending_sk)?;
    let t = derive_stealth_scalar(shared);

    let stealth_scalar = spend_scalar + t;
    if bool::from(k256::elliptic_curve::Field::is_zero(&stealth_scalar)) {
        // spending_sk == -t: probability ~2^-256, but it would be an
        // unspendable key, so fail loudly
        return Err(ObscuraError::RecoveryError(
            "derived stealth key is zero".into(),
        ));
    }

    Ok(encode_scalar(&stealth_scalar))
}

// ═══════════════════════════════════════════════════════════════════════════════
// ETHEREUM ADDRESS DERIVATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Derives the Ethereum address of a public key.
///
/// Standard Ethereum rule: keccak-256 of the 64-byte uncompressed point
/// (without the 0x04 prefix), last 20 bytes.
pub fn derive_eth_address(pk: &CurvePublicKey) -> Result<EthAddress> {
    use k256::elliptic_curve::sec1::ToEncodedPoint;

    let point = decode_public_key(pk)?;
    let uncompressed = point.to_affine().to_encoded_point(false);
    let hash = keccak256(&uncompressed.as_bytes()[1..]);

    let mut address_bytes = [0u8; ETH_ADDRESS_SIZE];
    address_bytes.copy_from_slice(&hash[32 - ETH_ADDRESS_SIZE..]);

    Ok(EthAddress::from_array(address_bytes))
}

/// Derives only the stealth address (for senders).
pub fn derive_stealth_address(
    spending_pk: &CurvePublicKey,
    shared: &SharedSecret,
) -> Result<EthAddress> {
    let stealth_pk = derive_stealth_public_key(spending_pk, shared)?;
    derive_eth_address(&stealth_pk)
}

// ═══════════════════════════════════════════════════════════════════════════════
// VERIFICATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Verifies that a stealth address was correctly derived.
///
/// Used to confirm a discovered payment is actually addressed to this
/// recipient. Constant-time comparison.
pub fn verify_stealth_address(
    spending_pk: &CurvePublicKey,
    shared: &SharedSecret,
    expected_address: &EthAddress,
) -> Result<bool> {
    let derived = derive_stealth_address(spending_pk, shared)?;
    Ok(subtle::ConstantTimeEq::ct_eq(derived.as_bytes(), expected_address.as_bytes()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{public_key_for, random_scalar};
    use crate::keys::derive_key_set;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn test_keys() -> obscura_core::types::StealthKeySet {
        let mut sig = vec![0x5Eu8; 64];
        sig.push(28);
        derive_key_set(&sig).unwrap()
    }

    fn ephemeral() -> (SecretScalar, CurvePublicKey) {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let scalar = random_scalar(&mut rng);
        let pk = public_key_for(&scalar).unwrap();
        (encode_scalar(&scalar), pk)
    }

    #[test]
    fn test_ecdh_agreement() {
        let keys = test_keys();
        let (eph_sk, eph_pk) = ephemeral();

        // Sender: eph_sk · viewing_pk
        let sender_secret = compute_shared_secret(&eph_sk, &keys.viewing.public).unwrap();
        // Recipient: viewing_sk · eph_pk
        let recipient_secret = compute_shared_secret(&keys.viewing.secret, &eph_pk).unwrap();

        assert_eq!(sender_secret.as_bytes(), recipient_secret.as_bytes());
    }

    #[test]
    fn test_stealth_keys_are_consistent() {
        let keys = test_keys();
        let (eph_sk, _) = ephemeral();

        let shared = compute_shared_secret(&eph_sk, &keys.viewing.public).unwrap();

        // The stealth private key's public key must equal the derived
        // stealth public key
        let stealth_pk = derive_stealth_public_key(&keys.spending.public, &shared).unwrap();
        let stealth_sk = derive_stealth_private_key(&keys.spending.secret, &shared).unwrap();

        let scalar = decode_secret_scalar(&stealth_sk).unwrap();
        assert_eq!(public_key_for(&scalar).unwrap(), stealth_pk);
    }

    #[test]
    fn test_stealth_address_matches_both_sides() {
        let keys = test_keys();
        let (eph_sk, eph_pk) = ephemeral();

        let sender_shared = compute_shared_secret(&eph_sk, &keys.viewing.public).unwrap();
        let sender_address = derive_stealth_address(&keys.spending.public, &sender_shared).unwrap();

        let recipient_shared = compute_shared_secret(&keys.viewing.secret, &eph_pk).unwrap();
        let recipient_address =
            derive_stealth_address(&keys.spending.public, &recipient_shared).unwrap();

        assert_eq!(sender_address, recipient_address);
    }

    #[test]
    fn test_stealth_address_matches_private_key() {
        let keys = test_keys();
        let (eph_sk, _) = ephemeral();
        let shared = compute_shared_secret(&eph_sk, &keys.viewing.public).unwrap();

        let address = derive_stealth_address(&keys.spending.public, &shared).unwrap();

        let stealth_sk = derive_stealth_private_key(&keys.spending.secret, &shared).unwrap();
        let scalar = decode_secret_scalar(&stealth_sk).unwrap();
        let stealth_pk = public_key_for(&scalar).unwrap();

        assert_eq!(derive_eth_address(&stealth_pk).unwrap(), address);
    }

    #[test]
    fn test_different_ephemerals_different_addresses() {
        let keys = test_keys();
        let mut rng = ChaCha20Rng::seed_from_u64(9);

        let s1 = random_scalar(&mut rng);
        let s2 = random_scalar(&mut rng);

        let shared1 =
            compute_shared_secret(&encode_scalar(&s1), &keys.viewing.public).unwrap();
        let shared2 =
            compute_shared_secret(&encode_scalar(&s2), &keys.viewing.public).unwrap();

        let addr1 = derive_stealth_address(&keys.spending.public, &shared1).unwrap();
        let addr2 = derive_stealth_address(&keys.spending.public, &shared2).unwrap();

        assert_ne!(addr1, addr2);
    }

    #[test]
    fn test_verify_stealth_address() {
        let keys = test_keys();
        let (eph_sk, _) = ephemeral();
        let shared = compute_shared_secret(&eph_sk, &keys.viewing.public).unwrap();

        let address = derive_stealth_address(&keys.spending.public, &shared).unwrap();
        assert!(verify_stealth_address(&keys.spending.public, &shared, &address).unwrap());

        let wrong = EthAddress::from_array([0xFF; ETH_ADDRESS_SIZE]);
        assert!(!verify_stealth_address(&keys.spending.public, &shared, &wrong).unwrap());
    }

    #[test]
    fn test_eth_address_known_vector() {
        // secret key 1 has a well-known address
        let one = SecretScalar::from_array({
            let mut b = [0u8; 32];
            b[31] = 1;
            b
        });
        let scalar = decode_secret_scalar(&one).unwrap();
        let pk = public_key_for(&scalar).unwrap();
        let address = derive_eth_address(&pk).unwrap();

        assert_eq!(
            address.to_hex_string(),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }

    #[test]
    fn test_shared_secret_rejects_invalid_inputs() {
        let keys = test_keys();
        let zero_sk = SecretScalar::from_array([0u8; 32]);
        assert!(compute_shared_secret(&zero_sk, &keys.viewing.public).is_err());

        let garbage_pk = CurvePublicKey::from_array([0xFF; PUBLIC_KEY_SIZE]);
        assert!(compute_shared_secret(&keys.viewing.secret, &garbage_pk).is_err());
    }
}
