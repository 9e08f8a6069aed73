//! Protocol constants for Obscura.
//!
//! All cryptographic sizes are derived from secp256k1 with SEC1 compressed
//! point encoding and keccak-256 hashing, matching Ethereum's address scheme.

// ═══════════════════════════════════════════════════════════════════════════════
// SECP256K1 SIZES
// ═══════════════════════════════════════════════════════════════════════════════

/// Size of a compressed SEC1 secp256k1 public key in bytes.
/// This is the encoding used in meta-addresses and announcements.
pub const PUBLIC_KEY_SIZE: usize = 33;

/// Size of an uncompressed SEC1 secp256k1 public key in bytes (0x04 prefix).
pub const UNCOMPRESSED_PUBLIC_KEY_SIZE: usize = 65;

/// Size of a secp256k1 secret scalar in bytes.
pub const SECRET_KEY_SIZE: usize = 32;

/// Size of an Ethereum-style wallet signature (r || s || v) in bytes.
/// Key derivation accepts exactly this format.
pub const SIGNATURE_SIZE: usize = 65;

// ═══════════════════════════════════════════════════════════════════════════════
// VIEW TAG CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Size of view tag in bytes.
/// Using 1 byte gives 99.6% filtering efficiency (1/256 false positive rate).
pub const VIEW_TAG_SIZE: usize = 1;

/// Number of possible view tag values (2^8 = 256).
pub const VIEW_TAG_SPACE: usize = 256;

// ═══════════════════════════════════════════════════════════════════════════════
// DOMAIN SEPARATORS
// ═══════════════════════════════════════════════════════════════════════════════
// Each keccak-256 invocation uses a unique domain separator so outputs from
// different operations never collide, even with identical inputs.

/// Domain separator for spending key derivation from a wallet signature.
pub const DOMAIN_SPENDING_KEY: &[u8] = b"OBSCURA_SPENDING_KEY_V1";

/// Domain separator for viewing key derivation from a wallet signature.
pub const DOMAIN_VIEWING_KEY: &[u8] = b"OBSCURA_VIEWING_KEY_V1";

/// Domain separator for the stealth scalar `t = H(S)`.
pub const DOMAIN_STEALTH_SCALAR: &[u8] = b"OBSCURA_STEALTH_SCALAR_V1";

/// Domain separator for view tag derivation.
/// Independent from [`DOMAIN_STEALTH_SCALAR`] so the published tag reveals
/// nothing about the stealth scalar.
pub const DOMAIN_VIEW_TAG: &[u8] = b"OBSCURA_VIEW_TAG_V1";

// ═══════════════════════════════════════════════════════════════════════════════
// SCHEME IDENTIFIERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Scheme id for secp256k1 + keccak-256 with compressed points and 1-byte
/// view tags. The only scheme this engine implements; unknown ids are
/// rejected, never defaulted.
pub const SCHEME_SECP256K1: u32 = 1;

/// Returns true if the scheme id is implemented by this engine.
pub fn is_supported_scheme(scheme_id: u32) -> bool {
    scheme_id == SCHEME_SECP256K1
}

// ═══════════════════════════════════════════════════════════════════════════════
// META-ADDRESS FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

/// Canonical meta-address scheme marker.
pub const META_ADDRESS_PREFIX: &str = "st";

/// Default chain tag for Ethereum mainnet-compatible chains.
pub const DEFAULT_CHAIN_TAG: &str = "eth";

/// Hex length of the two concatenated compressed public keys in the textual
/// meta-address form (2 * 33 bytes * 2 chars).
pub const META_ADDRESS_KEYS_HEX_LEN: usize = 2 * PUBLIC_KEY_SIZE * 2;

// ═══════════════════════════════════════════════════════════════════════════════
// ETHEREUM CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Size of Ethereum address in bytes (20 bytes = 160 bits).
pub const ETH_ADDRESS_SIZE: usize = 20;

/// Size of keccak-256 hash output.
pub const KECCAK256_SIZE: usize = 32;

// ═══════════════════════════════════════════════════════════════════════════════
// PERFORMANCE TUNING
// ═══════════════════════════════════════════════════════════════════════════════

/// Default block-range page size when fetching announcements from a log.
pub const DEFAULT_SCAN_BATCH_SIZE: u64 = 1000;

/// Default chunk size for parallel matching within a fetched page.
pub const DEFAULT_PARALLEL_CHUNK_SIZE: usize = 256;
