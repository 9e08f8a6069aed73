//! Obscura wallet implementation.
//!
//! The wallet bundles the derived key set with its meta-address and
//! provides the high-level recipient operations: matching announcements
//! and recovering one-time private keys.

use serde::{Deserialize, Serialize};

use obscura_core::error::Result;
use obscura_core::types::{Announcement, CurvePublicKey, MetaAddress, StealthKeySet};
use obscura_crypto::derive_key_set;

use crate::discovery::{MatchedPayment, ScanOutcome, scan_announcement};
use crate::recovery::{RecoveredKey, recover_for_announcement};

/// An Obscura wallet holding the stealth key set.
///
/// - Spending keys: derive stealth private keys and spend funds
/// - Viewing keys: scan announcements (can be shared with watch-only
///   services)
pub struct StealthWallet {
    keys: StealthKeySet,
    meta_address: MetaAddress,
}

impl StealthWallet {
    /// Creates a wallet from a 65-byte wallet signature.
    ///
    /// The same signature always reproduces the same wallet, so users
    /// re-derive instead of backing up keys.
    pub fn from_signature(signature: &[u8]) -> Result<Self> {
        let keys = derive_key_set(signature)?;
        Ok(Self::from_keys(keys))
    }

    /// Creates a wallet from an existing key set.
    pub fn from_keys(keys: StealthKeySet) -> Self {
        let meta_address = MetaAddress::new(keys.spending.public, keys.viewing.public);
        Self { keys, meta_address }
    }

    /// Creates a wallet with a non-default chain tag.
    pub fn from_keys_for_chain(keys: StealthKeySet, chain_tag: impl Into<String>) -> Self {
        let meta_address =
            MetaAddress::with_chain_tag(keys.spending.public, keys.viewing.public, chain_tag);
        Self { keys, meta_address }
    }

    /// Returns the meta-address for publishing.
    ///
    /// This is what recipients register so others can pay them.
    pub fn meta_address(&self) -> &MetaAddress {
        &self.meta_address
    }

    /// Returns the spending public key.
    pub fn spending_public_key(&self) -> &CurvePublicKey {
        &self.keys.spending.public
    }

    /// Returns the viewing public key.
    pub fn viewing_public_key(&self) -> &CurvePublicKey {
        &self.keys.viewing.public
    }

    /// Returns the underlying key set.
    pub fn keys(&self) -> &StealthKeySet {
        &self.keys
    }

    /// Attempts to match an announcement against this wallet.
    ///
    /// Returns `Ok(Some(_))` on a confirmed match, `Ok(None)` when the
    /// announcement is for someone else, and `Err(_)` only for malformed
    /// announcements.
    pub fn try_match(&self, announcement: &Announcement) -> Result<Option<MatchedPayment>> {
        match scan_announcement(
            announcement,
            &self.keys.viewing.secret,
            &self.keys.spending.public,
        ) {
            ScanOutcome::Matched(payment) => Ok(Some(payment)),
            ScanOutcome::Failed(e) => Err(e),
            _ => Ok(None),
        }
    }

    /// Recovers the one-time private key for a matched announcement.
    pub fn recover(&self, announcement: &Announcement) -> Result<RecoveredKey> {
        recover_for_announcement(announcement, &self.keys.viewing.secret, &self.keys.spending)
    }

    /// Exports the viewing key for a watch-only scanning service.
    ///
    /// The export contains the viewing *secret*, which enables detection
    /// of incoming payments but never spending. Compromise of this export
    /// costs privacy, not funds.
    pub fn export_viewing_key(&self) -> ViewingKeyExport {
        ViewingKeyExport {
            viewing_secret_key: hex::encode(self.keys.viewing.secret.as_bytes()),
            viewing_public_key: self.keys.viewing.public.to_hex(),
            spending_public_key: self.keys.spending.public.to_hex(),
        }
    }
}

impl std::fmt::Debug for StealthWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StealthWallet")
            .field("meta_address", &self.meta_address)
            .field("keys", &"[REDACTED]")
            .finish()
    }
}

/// Exported viewing key information for watch-only scanning.
///
/// Holds the viewing secret in hex; treat the export itself as sensitive.
#[derive(Clone, Serialize, Deserialize)]
pub struct ViewingKeyExport {
    /// Viewing secret key (hex) - enables scanning, not spending
    pub viewing_secret_key: String,
    /// Viewing public key (hex)
    pub viewing_public_key: String,
    /// Spending public key (hex) - needed for address derivation
    pub spending_public_key: String,
}

impl std::fmt::Debug for ViewingKeyExport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewingKeyExport")
            .field("viewing_secret_key", &"[REDACTED]")
            .field("viewing_public_key", &self.viewing_public_key)
            .field("spending_public_key", &self.spending_public_key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::create_stealth_payment;

    fn test_signature(seed: u8) -> Vec<u8> {
        let mut sig = vec![seed; 64];
        sig.push(27);
        sig
    }

    #[test]
    fn test_wallet_from_signature_deterministic() {
        let sig = test_signature(0x41);
        let w1 = StealthWallet::from_signature(&sig).unwrap();
        let w2 = StealthWallet::from_signature(&sig).unwrap();

        assert_eq!(w1.meta_address(), w2.meta_address());
        assert!(w1.meta_address().validate().is_ok());
    }

    #[test]
    fn test_wallet_match_and_recover() {
        let wallet = StealthWallet::from_signature(&test_signature(0x42)).unwrap();
        let payment = create_stealth_payment(wallet.meta_address()).unwrap();

        let matched = wallet.try_match(&payment.announcement).unwrap();
        assert!(matched.is_some());

        let recovered = wallet.recover(&payment.announcement).unwrap();
        assert_eq!(recovered.address, payment.details.address);
    }

    #[test]
    fn test_wallet_ignores_foreign_payment() {
        let wallet = StealthWallet::from_signature(&test_signature(0x43)).unwrap();
        let other = StealthWallet::from_signature(&test_signature(0x44)).unwrap();
        let payment = create_stealth_payment(other.meta_address()).unwrap();

        assert!(wallet.try_match(&payment.announcement).unwrap().is_none());
    }

    #[test]
    fn test_custom_chain_tag() {
        let keys = derive_key_set(&test_signature(0x45)).unwrap();
        let wallet = StealthWallet::from_keys_for_chain(keys, "base");
        assert_eq!(wallet.meta_address().chain_tag, "base");
    }

    #[test]
    fn test_viewing_key_export() {
        let wallet = StealthWallet::from_signature(&test_signature(0x46)).unwrap();
        let export = wallet.export_viewing_key();

        assert_eq!(export.viewing_public_key, wallet.viewing_public_key().to_hex());
        assert_eq!(
            export.spending_public_key,
            wallet.spending_public_key().to_hex()
        );
        assert_eq!(export.viewing_secret_key.len(), 64);

        // Debug must not leak the secret
        let debug = format!("{:?}", export);
        assert!(!debug.contains(&export.viewing_secret_key));
    }

    #[test]
    fn test_wallet_debug_redacted() {
        let wallet = StealthWallet::from_signature(&test_signature(0x47)).unwrap();
        let debug = format!("{:?}", wallet);
        assert!(debug.contains("REDACTED"));
    }
}
