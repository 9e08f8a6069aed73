//! # Obscura Stealth Address Protocol
//!
//! High-level API for creating and discovering stealth payments.
//!
//! This crate provides:
//!
//! - **Wallet**: Key set + meta-address derived from one wallet signature
//! - **Payment**: Sender-side stealth address generation and announcements
//! - **Discovery**: Recipient-side matching with view tag pre-filtering
//! - **Recovery**: One-time private key recovery with self-verification
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use obscura_stealth::{StealthWallet, create_stealth_payment};
//!
//! // Recipient: derive keys from a wallet signature, register meta-address
//! let wallet = StealthWallet::from_signature(&signature)?;
//! let meta_address = wallet.meta_address();
//! // ... register meta_address.encode() on-chain
//!
//! // Sender: create stealth payment
//! let payment = create_stealth_payment(meta_address)?;
//! // Send funds to payment.details.address
//! // Publish payment.announcement to the log
//!
//! // Recipient: match and recover
//! if let Some(matched) = wallet.try_match(&payment.announcement)? {
//!     let key = wallet.recover(&matched.announcement)?;
//!     println!("Payment at {}", key.address);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod discovery;
pub mod payment;
pub mod recovery;
pub mod wallet;

pub use discovery::{MatchedPayment, ScanOutcome, ScanStats, is_for_me, scan_announcement};
pub use payment::{
    StealthPayment, StealthPaymentBuilder, create_stealth_payment, generate_stealth_address,
};
pub use recovery::{RecoveredKey, recover_for_announcement, recover_stealth_key};
pub use wallet::{StealthWallet, ViewingKeyExport};
