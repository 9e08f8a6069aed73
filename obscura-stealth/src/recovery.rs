//! Stealth private key recovery (recipient side).
//!
//! Once a payment is discovered, the recipient combines the spending
//! secret with the stealth scalar to obtain the one-time private key.
//! Every recovery self-verifies: the recovered key's address must equal
//! the announced one before the key is handed out.

use zeroize::ZeroizeOnDrop;

use obscura_core::error::{ObscuraError, Result};
use obscura_core::types::{Announcement, CurvePublicKey, EthAddress, KeyPair, SecretScalar};
use obscura_crypto::derive::{
    compute_shared_secret, derive_eth_address, derive_stealth_private_key,
};
use obscura_crypto::{decode_secret_scalar, public_key_for};

/// A recovered stealth private key with its public counterpart.
///
/// The secret controls funds; it is zeroized on drop and excluded from
/// Debug output.
#[derive(ZeroizeOnDrop)]
pub struct RecoveredKey {
    /// The stealth private key
    pub secret: SecretScalar,
    /// The matching public key
    #[zeroize(skip)]
    pub public: CurvePublicKey,
    /// The address the key controls
    #[zeroize(skip)]
    pub address: EthAddress,
}

impl std::fmt::Debug for RecoveredKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveredKey")
            .field("address", &self.address)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Recovers the stealth private key for an ephemeral public key.
///
/// # Errors
///
/// Returns [`ObscuraError::RecoveryError`] if the recovered key does not
/// reproduce the expected address. That means the inputs are mismatched
/// (wrong ephemeral key, or keys from a different wallet), and no key is
/// returned.
pub fn recover_stealth_key(
    ephemeral_pk: &CurvePublicKey,
    viewing_sk: &SecretScalar,
    spending: &KeyPair,
    expected_address: &EthAddress,
) -> Result<RecoveredKey> {
    let shared = compute_shared_secret(viewing_sk, ephemeral_pk)?;
    let secret = derive_stealth_private_key(&spending.secret, &shared)?;

    // Self-verify before releasing the key
    let scalar = decode_secret_scalar(&secret)?;
    let public = public_key_for(&scalar)?;
    let address = derive_eth_address(&public)?;

    if address != *expected_address {
        return Err(ObscuraError::RecoveryError(format!(
            "recovered key controls {} but announcement claims {}",
            address, expected_address
        )));
    }

    Ok(RecoveredKey {
        secret,
        public,
        address,
    })
}

/// Recovers the stealth private key for a discovered announcement.
pub fn recover_for_announcement(
    announcement: &Announcement,
    viewing_sk: &SecretScalar,
    spending: &KeyPair,
) -> Result<RecoveredKey> {
    announcement.validate()?;
    recover_stealth_key(
        &announcement.ephemeral_pk,
        viewing_sk,
        spending,
        &announcement.stealth_address,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::create_stealth_payment;
    use obscura_core::types::{MetaAddress, StealthKeySet};
    use obscura_crypto::derive_key_set;

    fn test_keys(seed: u8) -> StealthKeySet {
        let mut sig = vec![seed; 64];
        sig.push(28);
        derive_key_set(&sig).unwrap()
    }

    #[test]
    fn test_recover_for_announcement() {
        let keys = test_keys(0x31);
        let meta = MetaAddress::new(keys.spending.public, keys.viewing.public);
        let payment = create_stealth_payment(&meta).unwrap();

        let recovered =
            recover_for_announcement(&payment.announcement, &keys.viewing.secret, &keys.spending)
                .unwrap();

        assert_eq!(recovered.address, payment.details.address);
        assert_eq!(recovered.public, payment.details.stealth_pk);
    }

    #[test]
    fn test_recovery_with_wrong_keys_fails() {
        let keys = test_keys(0x31);
        let other = test_keys(0x32);
        let meta = MetaAddress::new(keys.spending.public, keys.viewing.public);
        let payment = create_stealth_payment(&meta).unwrap();

        // Someone else's keys cannot recover this payment
        let result =
            recover_for_announcement(&payment.announcement, &other.viewing.secret, &other.spending);
        assert!(matches!(result, Err(ObscuraError::RecoveryError(_))));
    }

    #[test]
    fn test_recovery_with_tampered_address_fails() {
        let keys = test_keys(0x33);
        let meta = MetaAddress::new(keys.spending.public, keys.viewing.public);
        let mut payment = create_stealth_payment(&meta).unwrap();

        payment.announcement.stealth_address = EthAddress::from_array([0xEE; 20]);

        let result = recover_for_announcement(
            &payment.announcement,
            &keys.viewing.secret,
            &keys.spending,
        );
        assert!(matches!(result, Err(ObscuraError::RecoveryError(_))));
    }

    #[test]
    fn test_recovered_key_debug_redacted() {
        let keys = test_keys(0x34);
        let meta = MetaAddress::new(keys.spending.public, keys.viewing.public);
        let payment = create_stealth_payment(&meta).unwrap();

        let recovered =
            recover_for_announcement(&payment.announcement, &keys.viewing.secret, &keys.spending)
                .unwrap();

        let debug = format!("{:?}", recovered);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains(&hex::encode(recovered.secret.as_bytes())));
    }
}
