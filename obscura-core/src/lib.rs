//! # Obscura Core
//!
//! Core types, errors, and traits for the Obscura stealth address protocol
//! (ERC-5564 announcements + ERC-6538 meta-address registry on secp256k1
//! chains).
//!
//! This crate provides the foundational building blocks used by all other
//! Obscura crates:
//!
//! - **Types**: Domain models for keys, addresses, meta-addresses, and
//!   announcements
//! - **Errors**: Comprehensive error types with context
//! - **Constants**: Protocol constants, sizes, and domain separators
//! - **Traits**: Interfaces for the on-chain collaborators (registry,
//!   announcer log, wallet signer) the engine consumes but never implements
//!
//! ## Example
//!
//! ```rust
//! use obscura_core::{Announcement, MetaAddress, ObscuraError};
//!
//! // Types are serializable and well-documented
//! let meta = MetaAddress::default();
//! let json = serde_json::to_string(&meta).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{ObscuraError, Result};
pub use traits::*;
pub use types::*;
