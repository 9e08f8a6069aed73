//! Error types for Obscura.
//!
//! This module provides a comprehensive error hierarchy using `thiserror`.
//! All core failures are deterministic results of pure functions; nothing
//! here is retried internally.

use thiserror::Error;

/// Result type alias using `ObscuraError`.
pub type Result<T> = std::result::Result<T, ObscuraError>;

/// Main error type for all Obscura operations.
#[derive(Debug, Error)]
pub enum ObscuraError {
    // ═══════════════════════════════════════════════════════════════════════════
    // CRYPTOGRAPHIC ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Malformed signing material fed to key derivation.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// A byte string is not a valid secp256k1 point (off curve, identity,
    /// or malformed SEC1 encoding).
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Invalid key size or format.
    #[error("Invalid key: expected {expected} bytes, got {actual}")]
    InvalidKeySize { expected: usize, actual: usize },

    /// A recovered stealth private key failed self-verification.
    #[error("Key recovery failed: {0}")]
    RecoveryError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // STEALTH ADDRESS ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// A meta-address payload could not be parsed.
    #[error("Meta-address decode error: {0}")]
    DecodeError(String),

    /// The scheme id is not implemented by this engine.
    #[error("Unsupported scheme id: {0}")]
    UnsupportedScheme(u32),

    /// Invalid stealth address format.
    #[error("Invalid stealth address: {0}")]
    InvalidStealthAddress(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // REGISTRY / LOG ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Invalid announcement format.
    #[error("Invalid announcement: {0}")]
    InvalidAnnouncement(String),

    /// Registry storage failure.
    #[error("Registry error: {0}")]
    RegistryError(String),

    /// Duplicate announcement (same transaction hash).
    #[error("Duplicate announcement: {0}")]
    DuplicateAnnouncement(String),

    /// A scan could not be completed (worker failure, bad configuration).
    #[error("Scan error: {0}")]
    ScanError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid hex encoding.
    #[error("Invalid hex encoding: {0}")]
    HexError(#[from] hex::FromHexError),

    // ═══════════════════════════════════════════════════════════════════════════
    // STORAGE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// File I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Key store failure (missing keys, corrupt store).
    #[error("Key store error: {0}")]
    KeyStoreError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Input validation failed.
    #[error("Validation error: {0}")]
    ValidationError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // EXTERNAL COLLABORATOR ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Signing request to the injected wallet failed.
    #[error("Signer error: {0}")]
    SignerError(String),

    /// Log or chain read from the injected collaborator failed.
    #[error("Chain read error: {0}")]
    ChainError(String),
}

impl ObscuraError {
    /// Returns true if retrying the surrounding *network* call might help.
    /// Core failures are deterministic and never recoverable; only errors
    /// surfaced by injected collaborators are.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ObscuraError::ChainError(_) | ObscuraError::SignerError(_)
        )
    }

    /// Returns true if this is a cryptographic error.
    pub fn is_crypto_error(&self) -> bool {
        matches!(
            self,
            ObscuraError::InvalidSignature(_)
                | ObscuraError::InvalidPublicKey(_)
                | ObscuraError::InvalidKeySize { .. }
                | ObscuraError::RecoveryError(_)
        )
    }

    /// Returns true if this is a validation error.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            ObscuraError::ValidationError(_)
                | ObscuraError::DecodeError(_)
                | ObscuraError::InvalidStealthAddress(_)
                | ObscuraError::InvalidAnnouncement(_)
                | ObscuraError::UnsupportedScheme(_)
        )
    }
}
