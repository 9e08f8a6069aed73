//! # Obscura Cryptography
//!
//! secp256k1 primitives for the Obscura stealth address protocol.
//!
//! This crate provides:
//!
//! - **Keys**: Deterministic spending/viewing key derivation from a wallet
//!   signature
//! - **Curve**: Point/scalar codecs and arithmetic over secp256k1
//! - **Derive**: ECDH shared secrets, stealth public/private keys, and
//!   Ethereum addresses
//! - **View Tags**: Efficient computation for scanning optimization
//! - **Hash**: keccak-256 with domain separation
//!
//! ## Security Properties
//!
//! - Secret scalars and shared secrets are zeroized on drop
//! - Address and view tag comparisons are constant-time
//! - Domain separators prevent cross-protocol attacks
//! - Untrusted key bytes are validated (curve membership, non-identity)
//!   before any arithmetic
//!
//! ## Example
//!
//! ```rust,ignore
//! use obscura_crypto::{derive_key_set, compute_shared_secret, compute_view_tag};
//!
//! // Recipient derives keys from a wallet signature
//! let keys = derive_key_set(&signature)?;
//!
//! // Recipient recomputes the sender's shared secret from an announcement
//! let shared = compute_shared_secret(&keys.viewing.secret, &ephemeral_pk)?;
//!
//! // Cheap pre-filter before full address derivation
//! let tag = compute_view_tag(&shared);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod curve;
pub mod derive;
pub mod hash;
pub mod keys;
pub mod view_tag;

// Re-export main functions at crate root
pub use curve::{decode_public_key, decode_secret_scalar, encode_scalar, public_key_for, random_scalar};
pub use derive::{
    SharedSecret, compute_shared_secret, derive_eth_address, derive_stealth_address,
    derive_stealth_private_key, derive_stealth_public_key, verify_stealth_address,
};
pub use hash::{keccak256, keccak256_tagged};
pub use keys::{KEY_DERIVATION_MESSAGE, derive_key_set};
pub use view_tag::{compute_view_tag, verify_view_tag};
