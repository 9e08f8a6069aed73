//! Address types for Obscura.
//!
//! - [`MetaAddress`]: The public, reusable address proxy a recipient
//!   registers on-chain; the codec for the `st:<chain>:<keys>` text form
//!   lives here
//! - [`EthAddress`]: A one-time Ethereum address derived for a specific
//!   payment
//! - [`StealthAddressDetails`]: Everything a sender needs to pay and
//!   announce

use serde::{Deserialize, Serialize};

use super::CurvePublicKey;
use crate::constants::{
    DEFAULT_CHAIN_TAG, ETH_ADDRESS_SIZE, META_ADDRESS_KEYS_HEX_LEN, META_ADDRESS_PREFIX,
    SCHEME_SECP256K1, is_supported_scheme,
};
use crate::error::{ObscuraError, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// META-ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// An Obscura meta-address published for receiving private payments.
///
/// This is what gets stored in the on-chain registry (ERC-6538 style).
/// Senders use it to create stealth addresses; it never changes even
/// though every payment lands on a fresh one-time address.
///
/// # Textual form
///
/// ```text
/// st:<chainTag>:<spendingPubKeyHex><viewingPubKeyHex>
/// ```
///
/// with each key a compressed SEC1 point (66 hex chars). The scheme id is
/// not carried in the text form; version 1 of the format implies scheme 1.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaAddress {
    /// Scheme id (key/address derivation version)
    pub scheme_id: u32,
    /// Chain discriminator, e.g. `eth`
    pub chain_tag: String,
    /// Spending public key - stealth addresses are offsets of this point
    pub spending_pk: CurvePublicKey,
    /// Viewing public key - senders run ECDH against this
    pub viewing_pk: CurvePublicKey,
}

impl MetaAddress {
    /// Creates a meta-address for the default chain tag and scheme.
    pub fn new(spending_pk: CurvePublicKey, viewing_pk: CurvePublicKey) -> Self {
        Self {
            scheme_id: SCHEME_SECP256K1,
            chain_tag: DEFAULT_CHAIN_TAG.to_string(),
            spending_pk,
            viewing_pk,
        }
    }

    /// Creates a meta-address with an explicit chain tag.
    pub fn with_chain_tag(
        spending_pk: CurvePublicKey,
        viewing_pk: CurvePublicKey,
        chain_tag: impl Into<String>,
    ) -> Self {
        Self {
            scheme_id: SCHEME_SECP256K1,
            chain_tag: chain_tag.into(),
            spending_pk,
            viewing_pk,
        }
    }

    /// Validates the meta-address structure.
    pub fn validate(&self) -> Result<()> {
        if !is_supported_scheme(self.scheme_id) {
            return Err(ObscuraError::UnsupportedScheme(self.scheme_id));
        }

        if self.chain_tag.is_empty() || !self.chain_tag.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ObscuraError::ValidationError(format!(
                "invalid chain tag: {:?}",
                self.chain_tag
            )));
        }

        // Check for obviously invalid keys (all zeros)
        if self.spending_pk.is_zero() {
            return Err(ObscuraError::ValidationError(
                "spending key is all zeros".into(),
            ));
        }

        if self.viewing_pk.is_zero() {
            return Err(ObscuraError::ValidationError(
                "viewing key is all zeros".into(),
            ));
        }

        Ok(())
    }

    /// Encodes to the canonical textual form.
    pub fn encode(&self) -> String {
        format!(
            "{}:{}:{}{}",
            META_ADDRESS_PREFIX,
            self.chain_tag,
            self.spending_pk.to_hex(),
            self.viewing_pk.to_hex()
        )
    }

    /// Decodes a meta-address from a raw byte payload.
    ///
    /// On-chain storage may return the string padded with NUL bytes or
    /// other non-printable framing, so decoding scans for the `st:` marker
    /// and trims trailing control bytes before parsing. Past that point it
    /// is strict: the two key fields must be exactly
    /// [`META_ADDRESS_KEYS_HEX_LEN`] hex characters, never silently
    /// truncated.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        let marker = [META_ADDRESS_PREFIX.as_bytes(), b":"].concat();
        let start = raw
            .windows(marker.len())
            .position(|w| w == marker.as_slice())
            .ok_or_else(|| ObscuraError::DecodeError("no scheme marker found".into()))?;

        let mut tail = &raw[start..];
        while let [rest @ .., last] = tail {
            if *last == 0 || last.is_ascii_control() || *last == b' ' {
                tail = rest;
            } else {
                break;
            }
        }

        let text = std::str::from_utf8(tail)
            .map_err(|_| ObscuraError::DecodeError("payload is not valid UTF-8".into()))?;

        Self::parse_str(text)
    }

    fn parse_str(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, ':');

        let prefix = parts.next().unwrap_or_default();
        if prefix != META_ADDRESS_PREFIX {
            return Err(ObscuraError::DecodeError(format!(
                "unexpected prefix: {prefix:?}"
            )));
        }

        let chain_tag = parts
            .next()
            .ok_or_else(|| ObscuraError::DecodeError("missing chain tag".into()))?;
        if chain_tag.is_empty() || !chain_tag.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ObscuraError::DecodeError(format!(
                "invalid chain tag: {chain_tag:?}"
            )));
        }

        let keys = parts
            .next()
            .ok_or_else(|| ObscuraError::DecodeError("missing key material".into()))?;
        if keys.len() != META_ADDRESS_KEYS_HEX_LEN {
            return Err(ObscuraError::DecodeError(format!(
                "key field must be {} hex chars, got {}",
                META_ADDRESS_KEYS_HEX_LEN,
                keys.len()
            )));
        }

        let (spend_hex, view_hex) = keys.split_at(META_ADDRESS_KEYS_HEX_LEN / 2);
        let spending_pk = CurvePublicKey::from_hex(spend_hex)
            .map_err(|e| ObscuraError::DecodeError(format!("spending key: {e}")))?;
        let viewing_pk = CurvePublicKey::from_hex(view_hex)
            .map_err(|e| ObscuraError::DecodeError(format!("viewing key: {e}")))?;

        let meta = Self {
            scheme_id: SCHEME_SECP256K1,
            chain_tag: chain_tag.to_string(),
            spending_pk,
            viewing_pk,
        };

        meta.validate()
            .map_err(|e| ObscuraError::DecodeError(e.to_string()))?;
        Ok(meta)
    }
}

impl Default for MetaAddress {
    fn default() -> Self {
        Self {
            scheme_id: SCHEME_SECP256K1,
            chain_tag: DEFAULT_CHAIN_TAG.to_string(),
            spending_pk: CurvePublicKey::default(),
            viewing_pk: CurvePublicKey::default(),
        }
    }
}

impl std::fmt::Display for MetaAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encode())
    }
}

impl std::str::FromStr for MetaAddress {
    type Err = ObscuraError;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s.as_bytes())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STEALTH (ETHEREUM) ADDRESS
// ═══════════════════════════════════════════════════════════════════════════════

/// A standard 20-byte Ethereum address.
///
/// Stealth addresses are ordinary addresses; only the holder of the
/// matching keys can link one to a meta-address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EthAddress {
    bytes: [u8; ETH_ADDRESS_SIZE],
}

impl EthAddress {
    /// Creates an address from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != ETH_ADDRESS_SIZE {
            return Err(ObscuraError::InvalidStealthAddress(format!(
                "expected {} bytes, got {}",
                ETH_ADDRESS_SIZE,
                bytes.len()
            )));
        }

        let mut arr = [0u8; ETH_ADDRESS_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    /// Creates from a fixed-size array.
    pub fn from_array(bytes: [u8; ETH_ADDRESS_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the `0x`-prefixed hex string.
    pub fn to_hex_string(&self) -> String {
        format!("0x{}", hex::encode(self.bytes))
    }

    /// Parses from hex string (with or without 0x prefix).
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        Self::from_bytes(&bytes)
    }

    /// Returns the zero address.
    pub fn zero() -> Self {
        Self {
            bytes: [0u8; ETH_ADDRESS_SIZE],
        }
    }

    /// Returns true if this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }
}

impl std::fmt::Debug for EthAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EthAddress({})", self.to_hex_string())
    }
}

impl std::fmt::Display for EthAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STEALTH ADDRESS DETAILS
// ═══════════════════════════════════════════════════════════════════════════════

/// Complete result of sender-side stealth address generation.
///
/// Contains everything needed to pay the recipient and publish the
/// announcement. The ephemeral *secret* is intentionally absent; it is
/// discarded inside the generator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StealthAddressDetails {
    /// The one-time Ethereum address to send funds to
    pub address: EthAddress,
    /// The ephemeral public key to publish alongside the payment
    pub ephemeral_pk: CurvePublicKey,
    /// View tag for efficient scanning (never proof of ownership)
    pub view_tag: u8,
    /// The stealth public key (for verification)
    pub stealth_pk: CurvePublicKey,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PUBLIC_KEY_SIZE;

    fn test_meta() -> MetaAddress {
        MetaAddress::new(
            CurvePublicKey::from_array([0x02; PUBLIC_KEY_SIZE]),
            CurvePublicKey::from_array([0x03; PUBLIC_KEY_SIZE]),
        )
    }

    #[test]
    fn test_meta_address_encode_shape() {
        let meta = test_meta();
        let s = meta.encode();
        assert!(s.starts_with("st:eth:"));
        assert_eq!(s.len(), "st:eth:".len() + META_ADDRESS_KEYS_HEX_LEN);
    }

    #[test]
    fn test_meta_address_roundtrip() {
        let meta = test_meta();
        let decoded = MetaAddress::decode(meta.encode().as_bytes()).unwrap();
        assert_eq!(decoded, meta);
    }

    #[test]
    fn test_meta_address_roundtrip_with_padding() {
        let meta = test_meta();
        let mut blob = vec![0u8; 7];
        blob.push(0x01); // non-printable framing byte
        blob.extend_from_slice(meta.encode().as_bytes());
        blob.extend_from_slice(&[0u8; 12]);

        let decoded = MetaAddress::decode(&blob).unwrap();
        assert_eq!(decoded, meta);
    }

    #[test]
    fn test_meta_address_decode_rejects_truncated() {
        let meta = test_meta();
        let s = meta.encode();
        // Drop two hex chars from the key field
        let truncated = &s[..s.len() - 2];
        let result = MetaAddress::decode(truncated.as_bytes());
        assert!(matches!(result, Err(ObscuraError::DecodeError(_))));
    }

    #[test_case::test_case(b"" ; "empty")]
    #[test_case::test_case(b"\0\0\0\0" ; "nul padding only")]
    #[test_case::test_case(b"not a meta address" ; "no marker")]
    #[test_case::test_case(b"st::0011" ; "empty chain tag")]
    #[test_case::test_case(b"st:e_th:0011" ; "non alphanumeric tag")]
    #[test_case::test_case(b"st:eth" ; "missing key field")]
    fn test_meta_address_decode_rejects_garbage(raw: &[u8]) {
        assert!(MetaAddress::decode(raw).is_err());
    }

    #[test]
    fn test_meta_address_decode_rejects_bad_hex() {
        let meta = test_meta();
        let mut s = meta.encode();
        // Corrupt one hex char with a non-hex character
        let idx = s.len() - 1;
        s.replace_range(idx..idx + 1, "z");
        assert!(MetaAddress::decode(s.as_bytes()).is_err());
    }

    #[test]
    fn test_meta_address_from_str() {
        let meta = test_meta();
        let parsed: MetaAddress = meta.encode().parse().unwrap();
        assert_eq!(parsed, meta);
    }

    #[test]
    fn test_meta_address_validation() {
        let valid = test_meta();
        assert!(valid.validate().is_ok());

        let mut invalid = valid.clone();
        invalid.spending_pk = CurvePublicKey::default();
        assert!(invalid.validate().is_err());

        let mut bad_scheme = valid.clone();
        bad_scheme.scheme_id = 42;
        assert!(matches!(
            bad_scheme.validate(),
            Err(ObscuraError::UnsupportedScheme(42))
        ));

        let mut bad_tag = valid;
        bad_tag.chain_tag = "e:th".into();
        assert!(bad_tag.validate().is_err());
    }

    #[test]
    fn test_custom_chain_tag_roundtrip() {
        let meta = MetaAddress::with_chain_tag(
            CurvePublicKey::from_array([0x02; PUBLIC_KEY_SIZE]),
            CurvePublicKey::from_array([0x03; PUBLIC_KEY_SIZE]),
            "base",
        );
        let decoded = MetaAddress::decode(meta.encode().as_bytes()).unwrap();
        assert_eq!(decoded.chain_tag, "base");
    }

    #[test]
    fn test_eth_address_formatting() {
        let addr = EthAddress::from_array([0xAB; 20]);
        let s = addr.to_hex_string();
        assert!(s.starts_with("0x"));
        assert_eq!(s.len(), 42); // "0x" + 40 hex chars
    }

    #[test]
    fn test_eth_address_hex_roundtrip() {
        let addr = EthAddress::from_array([0x12; 20]);
        let hex = addr.to_hex_string();
        let addr2 = EthAddress::from_hex(&hex).unwrap();
        assert_eq!(addr, addr2);
    }

    #[test]
    fn test_eth_address_zero() {
        let zero = EthAddress::zero();
        assert!(zero.is_zero());

        let non_zero = EthAddress::from_array([1; 20]);
        assert!(!non_zero.is_zero());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn arb_key() -> impl Strategy<Value = CurvePublicKey> {
            (prop::bool::ANY, prop::array::uniform32(any::<u8>())).prop_map(|(odd, x)| {
                let mut bytes = [0u8; PUBLIC_KEY_SIZE];
                bytes[0] = if odd { 0x03 } else { 0x02 };
                bytes[1..].copy_from_slice(&x);
                CurvePublicKey::from_array(bytes)
            })
        }

        proptest! {
            #[test]
            fn roundtrip_survives_padding(
                spending in arb_key(),
                viewing in arb_key(),
                tag in "[a-z0-9]{1,8}",
                front in 0usize..16,
                back in 0usize..16,
            ) {
                let meta = MetaAddress::with_chain_tag(spending, viewing, tag);

                let mut blob = vec![0u8; front];
                blob.extend_from_slice(meta.encode().as_bytes());
                blob.extend(std::iter::repeat(0u8).take(back));

                prop_assert_eq!(MetaAddress::decode(&blob).unwrap(), meta);
            }

            #[test]
            fn decode_never_panics(raw in prop::collection::vec(any::<u8>(), 0..256)) {
                let _ = MetaAddress::decode(&raw);
            }
        }
    }
}
