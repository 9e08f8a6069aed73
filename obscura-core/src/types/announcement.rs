//! Announcement types for the Obscura announcement log.
//!
//! Announcements are published by senders alongside a stealth payment and
//! contain the ephemeral key and view tag recipients need to discover it.

use serde::{Deserialize, Serialize};

use super::{CurvePublicKey, EthAddress};
use crate::constants::{
    ETH_ADDRESS_SIZE, PUBLIC_KEY_SIZE, SCHEME_SECP256K1, VIEW_TAG_SPACE, is_supported_scheme,
};
use crate::error::{ObscuraError, Result};

/// An announcement published to the log (ERC-5564 `Announcement` event).
///
/// Senders publish one per stealth payment. Recipients scan these, using
/// the metadata view tag as a cheap pre-filter before doing full ECDH.
///
/// # Wire Format (binary)
/// ```text
/// scheme_id (4 LE) || stealth_address (20) || ephemeral_pk (33) ||
/// timestamp (8 LE) || metadata_len (4 LE) || metadata
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Announcement {
    /// Unique identifier (assigned by the log)
    pub id: u64,
    /// Scheme id the sender used
    pub scheme_id: u32,
    /// The one-time address that received the payment
    pub stealth_address: EthAddress,
    /// The sender's ephemeral public key
    pub ephemeral_pk: CurvePublicKey,
    /// Arbitrary metadata; byte 0 is the view tag under scheme 1
    #[serde(with = "hex")]
    pub metadata: Vec<u8>,
    /// Unix timestamp when the announcement was created
    pub timestamp: u64,
    /// Optional: Block number if stored on-chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// Optional: Transaction hash if stored on-chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

impl Announcement {
    /// Creates a new scheme-1 announcement.
    pub fn new(stealth_address: EthAddress, ephemeral_pk: CurvePublicKey, view_tag: u8) -> Self {
        Self {
            id: 0, // Assigned by the log
            scheme_id: SCHEME_SECP256K1,
            stealth_address,
            ephemeral_pk,
            metadata: vec![view_tag],
            timestamp: Self::current_timestamp(),
            block_number: None,
            tx_hash: None,
        }
    }

    /// Creates an announcement with extra metadata following the view tag.
    pub fn with_metadata(
        stealth_address: EthAddress,
        ephemeral_pk: CurvePublicKey,
        view_tag: u8,
        extra: &[u8],
    ) -> Self {
        let mut metadata = Vec::with_capacity(1 + extra.len());
        metadata.push(view_tag);
        metadata.extend_from_slice(extra);

        Self {
            id: 0,
            scheme_id: SCHEME_SECP256K1,
            stealth_address,
            ephemeral_pk,
            metadata,
            timestamp: Self::current_timestamp(),
            block_number: None,
            tx_hash: None,
        }
    }

    /// Returns the view tag, if the metadata carries one.
    ///
    /// Under scheme 1 the first metadata byte is the view tag. Empty
    /// metadata yields `None`; such announcements cannot be pre-filtered
    /// and go straight to full ECDH matching.
    pub fn view_tag(&self) -> Option<u8> {
        self.metadata.first().copied()
    }

    /// Validates the announcement structure.
    pub fn validate(&self) -> Result<()> {
        if !is_supported_scheme(self.scheme_id) {
            return Err(ObscuraError::UnsupportedScheme(self.scheme_id));
        }

        if self.stealth_address.is_zero() {
            return Err(ObscuraError::InvalidAnnouncement(
                "stealth address is the zero address".into(),
            ));
        }

        // Check for obviously invalid ephemeral key (all zeros)
        if self.ephemeral_pk.is_zero() {
            return Err(ObscuraError::InvalidAnnouncement(
                "ephemeral key is all zeros".into(),
            ));
        }

        // Timestamp validation (not in the future by more than 1 hour)
        let now = Self::current_timestamp();
        if self.timestamp > now + 3600 {
            return Err(ObscuraError::InvalidAnnouncement(
                "timestamp is too far in the future".into(),
            ));
        }

        Ok(())
    }

    /// Serializes to compact binary format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let size = 4 + ETH_ADDRESS_SIZE + PUBLIC_KEY_SIZE + 8 + 4 + self.metadata.len();

        let mut bytes = Vec::with_capacity(size);
        bytes.extend_from_slice(&self.scheme_id.to_le_bytes());
        bytes.extend_from_slice(self.stealth_address.as_bytes());
        bytes.extend_from_slice(self.ephemeral_pk.as_bytes());
        bytes.extend_from_slice(&self.timestamp.to_le_bytes());
        bytes.extend_from_slice(&(self.metadata.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&self.metadata);

        bytes
    }

    /// Deserializes from compact binary format.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let min_size = 4 + ETH_ADDRESS_SIZE + PUBLIC_KEY_SIZE + 8 + 4;
        if bytes.len() < min_size {
            return Err(ObscuraError::InvalidAnnouncement(format!(
                "too short: {} bytes, minimum {}",
                bytes.len(),
                min_size
            )));
        }

        let mut offset = 0usize;

        let scheme_id = u32::from_le_bytes(
            bytes[offset..offset + 4]
                .try_into()
                .map_err(|_| ObscuraError::InvalidAnnouncement("invalid scheme id".into()))?,
        );
        offset += 4;

        let stealth_address = EthAddress::from_bytes(&bytes[offset..offset + ETH_ADDRESS_SIZE])?;
        offset += ETH_ADDRESS_SIZE;

        let ephemeral_pk = CurvePublicKey::from_bytes(&bytes[offset..offset + PUBLIC_KEY_SIZE])?;
        offset += PUBLIC_KEY_SIZE;

        let timestamp = u64::from_le_bytes(
            bytes[offset..offset + 8]
                .try_into()
                .map_err(|_| ObscuraError::InvalidAnnouncement("invalid timestamp".into()))?,
        );
        offset += 8;

        let metadata_len = u32::from_le_bytes(
            bytes[offset..offset + 4]
                .try_into()
                .map_err(|_| ObscuraError::InvalidAnnouncement("invalid metadata length".into()))?,
        ) as usize;
        offset += 4;

        if bytes.len() < offset + metadata_len {
            return Err(ObscuraError::InvalidAnnouncement(
                "missing metadata bytes".into(),
            ));
        }
        let metadata = bytes[offset..offset + metadata_len].to_vec();

        let announcement = Self {
            id: 0, // ID is assigned by the log, not serialized
            scheme_id,
            stealth_address,
            ephemeral_pk,
            metadata,
            timestamp,
            block_number: None,
            tx_hash: None,
        };

        announcement.validate()?;
        Ok(announcement)
    }

    /// Returns current Unix timestamp in seconds.
    fn current_timestamp() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Builder for creating announcements with optional fields.
#[derive(Default)]
pub struct AnnouncementBuilder {
    scheme_id: Option<u32>,
    stealth_address: Option<EthAddress>,
    ephemeral_pk: Option<CurvePublicKey>,
    metadata: Option<Vec<u8>>,
    timestamp: Option<u64>,
    block_number: Option<u64>,
    tx_hash: Option<String>,
}

impl AnnouncementBuilder {
    /// Creates a new announcement builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the scheme id (optional, defaults to scheme 1).
    pub fn scheme_id(mut self, id: u32) -> Self {
        self.scheme_id = Some(id);
        self
    }

    /// Sets the stealth address (required).
    pub fn stealth_address(mut self, address: EthAddress) -> Self {
        self.stealth_address = Some(address);
        self
    }

    /// Sets the ephemeral public key (required).
    pub fn ephemeral_pk(mut self, pk: CurvePublicKey) -> Self {
        self.ephemeral_pk = Some(pk);
        self
    }

    /// Sets the view tag (required unless raw metadata is given).
    pub fn view_tag(mut self, tag: u8) -> Self {
        match &mut self.metadata {
            Some(m) if !m.is_empty() => m[0] = tag,
            _ => self.metadata = Some(vec![tag]),
        }
        self
    }

    /// Sets raw metadata, replacing any view tag set earlier.
    pub fn metadata(mut self, metadata: Vec<u8>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Sets a custom timestamp (optional, defaults to now).
    pub fn timestamp(mut self, ts: u64) -> Self {
        self.timestamp = Some(ts);
        self
    }

    /// Sets the block number (optional).
    pub fn block_number(mut self, num: u64) -> Self {
        self.block_number = Some(num);
        self
    }

    /// Sets the transaction hash (optional).
    pub fn tx_hash(mut self, hash: String) -> Self {
        self.tx_hash = Some(hash);
        self
    }

    /// Builds the announcement.
    pub fn build(self) -> Result<Announcement> {
        let stealth_address = self
            .stealth_address
            .ok_or_else(|| ObscuraError::ValidationError("stealth_address is required".into()))?;

        let ephemeral_pk = self
            .ephemeral_pk
            .ok_or_else(|| ObscuraError::ValidationError("ephemeral_pk is required".into()))?;

        let metadata = self
            .metadata
            .ok_or_else(|| ObscuraError::ValidationError("view_tag or metadata is required".into()))?;

        let announcement = Announcement {
            id: 0,
            scheme_id: self.scheme_id.unwrap_or(SCHEME_SECP256K1),
            stealth_address,
            ephemeral_pk,
            metadata,
            timestamp: self.timestamp.unwrap_or_else(Announcement::current_timestamp),
            block_number: self.block_number,
            tx_hash: self.tx_hash,
        };

        announcement.validate()?;
        Ok(announcement)
    }
}

/// Statistics about announcements in a log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnnouncementStats {
    /// Total number of announcements
    pub total_count: u64,
    /// Announcements per view tag (for distribution analysis)
    pub view_tag_distribution: Vec<u64>,
    /// Announcements whose metadata carries no view tag
    pub untagged_count: u64,
    /// Earliest announcement timestamp
    pub earliest_timestamp: Option<u64>,
    /// Latest announcement timestamp
    pub latest_timestamp: Option<u64>,
}

impl Default for AnnouncementStats {
    fn default() -> Self {
        Self {
            total_count: 0,
            view_tag_distribution: vec![0; VIEW_TAG_SPACE],
            untagged_count: 0,
            earliest_timestamp: None,
            latest_timestamp: None,
        }
    }
}

impl AnnouncementStats {
    /// Creates empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates stats with a new announcement.
    pub fn add(&mut self, announcement: &Announcement) {
        self.total_count += 1;

        match announcement.view_tag() {
            Some(tag) => self.view_tag_distribution[tag as usize] += 1,
            None => self.untagged_count += 1,
        }

        match self.earliest_timestamp {
            Some(t) if announcement.timestamp < t => {
                self.earliest_timestamp = Some(announcement.timestamp);
            }
            None => {
                self.earliest_timestamp = Some(announcement.timestamp);
            }
            _ => {}
        }

        match self.latest_timestamp {
            Some(t) if announcement.timestamp > t => {
                self.latest_timestamp = Some(announcement.timestamp);
            }
            None => {
                self.latest_timestamp = Some(announcement.timestamp);
            }
            _ => {}
        }
    }
}
