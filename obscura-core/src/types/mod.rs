//! Domain types for Obscura.
//!
//! This module provides all the core data structures used throughout the
//! protocol:
//!
//! - [`KeyPair`] / [`StealthKeySet`]: secp256k1 spending and viewing keys
//! - [`MetaAddress`]: Published address proxy for receiving private payments
//! - [`EthAddress`]: One-time stealth address for a specific payment
//! - [`Announcement`]: Published ephemeral key + view tag

mod address;
mod announcement;
mod keys;

pub use address::*;
pub use announcement::*;
pub use keys::*;
