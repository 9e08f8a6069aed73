//! Key types for Obscura.
//!
//! This module defines the key structures used in the protocol:
//!
//! - [`CurvePublicKey`]: Compressed SEC1 secp256k1 public key (33 bytes)
//! - [`SecretScalar`]: Secret scalar (32 bytes, zeroized on drop)
//! - [`KeyPair`]: Combined public + secret key
//! - [`StealthKeySet`]: Spending + viewing key pairs derived from one
//!   wallet signature

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::{PUBLIC_KEY_SIZE, SECRET_KEY_SIZE};
use crate::error::{ObscuraError, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// PUBLIC KEY
// ═══════════════════════════════════════════════════════════════════════════════

/// A compressed SEC1 secp256k1 public key.
///
/// Safe to share publicly; two of these make up a meta-address. The bytes
/// are carried opaquely here; curve membership is verified in
/// `obscura-crypto` when the key is decoded to a point.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CurvePublicKey {
    bytes: [u8; PUBLIC_KEY_SIZE],
}

impl CurvePublicKey {
    /// Creates a new public key from raw bytes.
    ///
    /// # Errors
    /// Returns error if bytes length doesn't match `PUBLIC_KEY_SIZE`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PUBLIC_KEY_SIZE {
            return Err(ObscuraError::InvalidKeySize {
                expected: PUBLIC_KEY_SIZE,
                actual: bytes.len(),
            });
        }

        let mut arr = [0u8; PUBLIC_KEY_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    /// Creates a public key from a fixed-size array.
    pub fn from_array(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the raw bytes of the public key.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the public key as a fixed-size array reference.
    pub fn as_array(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.bytes
    }

    /// Returns the hex-encoded public key.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Creates a public key from hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)?;
        Self::from_bytes(&bytes)
    }

    /// Returns true if every byte is zero (structurally invalid).
    pub fn is_zero(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }
}

impl std::fmt::Debug for CurvePublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only show first/last 4 bytes for readability
        write!(
            f,
            "CurvePublicKey({}...{})",
            hex::encode(&self.bytes[..4]),
            hex::encode(&self.bytes[PUBLIC_KEY_SIZE - 4..])
        )
    }
}

impl Default for CurvePublicKey {
    fn default() -> Self {
        Self {
            bytes: [0u8; PUBLIC_KEY_SIZE],
        }
    }
}

// Serde implementation that uses hex encoding
impl Serialize for CurvePublicKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for CurvePublicKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SECRET SCALAR
// ═══════════════════════════════════════════════════════════════════════════════

/// A secp256k1 secret scalar.
///
/// This key is sensitive and will be automatically zeroized when dropped.
/// Never expose this key in logs or error messages. Serde support exists
/// only for the injected [`crate::traits::KeyStore`] persistence boundary.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretScalar {
    bytes: [u8; SECRET_KEY_SIZE],
}

impl SecretScalar {
    /// Creates a new secret scalar from raw bytes.
    ///
    /// # Errors
    /// Returns error if bytes length doesn't match `SECRET_KEY_SIZE`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SECRET_KEY_SIZE {
            return Err(ObscuraError::InvalidKeySize {
                expected: SECRET_KEY_SIZE,
                actual: bytes.len(),
            });
        }

        let mut arr = [0u8; SECRET_KEY_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    /// Creates a secret scalar from a fixed-size array.
    pub fn from_array(bytes: [u8; SECRET_KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the raw bytes of the secret scalar.
    ///
    /// # Security
    /// Handle the returned bytes carefully - do not log or expose them.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the secret scalar as a fixed-size array reference.
    pub fn as_array(&self) -> &[u8; SECRET_KEY_SIZE] {
        &self.bytes
    }

    /// Returns a copy of the scalar bytes.
    ///
    /// The caller takes responsibility for wiping the copy.
    pub fn to_bytes(&self) -> [u8; SECRET_KEY_SIZE] {
        self.bytes
    }
}

impl std::fmt::Debug for SecretScalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose secret key content
        write!(f, "SecretScalar([REDACTED])")
    }
}

impl Serialize for SecretScalar {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&hex::encode(self.bytes))
    }
}

impl<'de> Deserialize<'de> for SecretScalar {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let mut s = String::deserialize(deserializer)?;
        let result = hex::decode(&s)
            .map_err(serde::de::Error::custom)
            .and_then(|bytes| Self::from_bytes(&bytes).map_err(serde::de::Error::custom));
        s.zeroize();
        result
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEY PAIR
// ═══════════════════════════════════════════════════════════════════════════════

/// A complete secp256k1 key pair (public + secret).
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct KeyPair {
    /// Public key (safe to share)
    #[zeroize(skip)]
    pub public: CurvePublicKey,
    /// Secret scalar (keep private, auto-zeroized)
    pub secret: SecretScalar,
}

impl KeyPair {
    /// Creates a new key pair from public and secret keys.
    pub fn new(public: CurvePublicKey, secret: SecretScalar) -> Self {
        Self { public, secret }
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STEALTH KEY SET
// ═══════════════════════════════════════════════════════════════════════════════

/// Complete Obscura key set (spending + viewing), deterministically derived
/// from one wallet signature.
///
/// The spending secret key spends from stealth addresses and must never
/// leave the owner. The viewing secret key only enables scanning and may be
/// handed to watch-only services; its compromise must not endanger funds.
#[derive(Serialize, Deserialize, ZeroizeOnDrop)]
pub struct StealthKeySet {
    /// Keys for spending from stealth addresses
    pub spending: KeyPair,
    /// Keys for viewing/scanning announcements
    pub viewing: KeyPair,
}

impl StealthKeySet {
    /// Creates a new key set.
    pub fn new(spending: KeyPair, viewing: KeyPair) -> Self {
        Self { spending, viewing }
    }
}

impl std::fmt::Debug for StealthKeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StealthKeySet")
            .field("spending", &self.spending)
            .field("viewing", &self.viewing)
            .finish()
    }
}
