//! Common traits for Obscura.
//!
//! These traits are the seams between the protocol engine and the outside
//! world: the on-chain registry, the announcement log, the user's wallet,
//! and key persistence. Everything chain-facing is injected through them,
//! which keeps the engine testable against in-memory fakes.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Announcement, EthAddress, StealthKeySet};

// ═══════════════════════════════════════════════════════════════════════════════
// META-ADDRESS REGISTRY TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface for the meta-address registry (ERC-6538 style).
///
/// Maps a registrant's ordinary address to their published meta-address
/// bytes. Implementations might use:
/// - In-memory storage (for testing/development)
/// - A JSON file (for the CLI)
/// - An on-chain registry contract
#[async_trait]
pub trait MetaAddressRegistry: Send + Sync {
    /// Looks up the registered meta-address bytes for a registrant.
    ///
    /// Returns the raw payload as stored; callers decode it with
    /// `MetaAddress::decode`, which tolerates on-chain padding.
    async fn get_meta_address(&self, registrant: &EthAddress, scheme_id: u32)
        -> Result<Option<Vec<u8>>>;

    /// Registers (or replaces) the caller's meta-address.
    async fn set_meta_address(
        &self,
        registrant: &EthAddress,
        scheme_id: u32,
        meta_address: &[u8],
    ) -> Result<()>;

    /// Registers a meta-address on behalf of another registrant,
    /// authorized by the registrant's signature over the payload.
    ///
    /// The default implementation only checks the signature shape; an
    /// on-chain backend would verify it against the registrant.
    async fn set_meta_address_for(
        &self,
        registrant: &EthAddress,
        scheme_id: u32,
        meta_address: &[u8],
        signature: &[u8],
    ) -> Result<()> {
        if signature.len() != crate::constants::SIGNATURE_SIZE {
            return Err(crate::error::ObscuraError::InvalidSignature(format!(
                "expected {} bytes, got {}",
                crate::constants::SIGNATURE_SIZE,
                signature.len()
            )));
        }
        self.set_meta_address(registrant, scheme_id, meta_address)
            .await
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ANNOUNCEMENT LOG TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Filter for fetching a slice of the announcement log.
#[derive(Clone, Debug, Default)]
pub struct LogFilter {
    /// Lowest block number to include (inclusive)
    pub from_block: Option<u64>,
    /// Highest block number to include (inclusive)
    pub to_block: Option<u64>,
    /// Restrict to a single scheme id
    pub scheme_id: Option<u32>,
}

impl LogFilter {
    /// Filter covering a closed block range.
    pub fn block_range(from: u64, to: u64) -> Self {
        Self {
            from_block: Some(from),
            to_block: Some(to),
            scheme_id: None,
        }
    }

    /// Returns true if the announcement passes this filter.
    pub fn matches(&self, ann: &Announcement) -> bool {
        if let Some(scheme) = self.scheme_id {
            if ann.scheme_id != scheme {
                return false;
            }
        }
        // Announcements without a block number only match unbounded filters
        match ann.block_number {
            Some(block) => {
                self.from_block.map_or(true, |from| block >= from)
                    && self.to_block.map_or(true, |to| block <= to)
            }
            None => self.from_block.is_none() && self.to_block.is_none(),
        }
    }
}

/// Interface for the announcement log (ERC-5564 `Announcement` events).
#[async_trait]
pub trait AnnouncementLog: Send + Sync {
    /// Publishes an announcement.
    ///
    /// Returns the assigned announcement ID.
    async fn announce(&self, announcement: Announcement) -> Result<u64>;

    /// Fetches announcements matching the filter, ordered by id.
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Announcement>>;

    /// Returns total announcement count.
    async fn count(&self) -> Result<u64>;

    /// Returns the highest block number any announcement carries.
    async fn latest_block(&self) -> Result<Option<u64>>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// WALLET SIGNER TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface to the user's wallet for the key-derivation signature.
///
/// Key derivation is seeded by the wallet signing a fixed message; the
/// engine never sees the wallet's private key.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Signs the given message, returning a 65-byte `r || s || v` signature.
    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>>;

    /// The wallet's ordinary address (used as the registrant).
    fn address(&self) -> EthAddress;
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHAIN READER TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Read-only chain access for balance checks on discovered addresses.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Returns the native-token balance of an address, in wei.
    async fn get_balance(&self, address: &EthAddress) -> Result<u128>;

    /// Returns the current chain head block number.
    async fn block_number(&self) -> Result<u64>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEY STORE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface for key persistence.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Saves a key set.
    async fn save(&self, keys: &StealthKeySet) -> Result<()>;

    /// Loads the stored key set.
    async fn load(&self) -> Result<StealthKeySet>;

    /// Checks if keys exist in storage.
    async fn exists(&self) -> Result<bool>;

    /// Deletes stored keys.
    async fn delete(&self) -> Result<()>;
}
