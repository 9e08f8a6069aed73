//! # Obscura Registry
//!
//! Meta-address registry and announcement log storage for Obscura.
//!
//! This crate models the two on-chain contracts the protocol relies on:
//!
//! - The **meta-address registry** (ERC-6538): registrant → meta-address
//! - The **announcement log** (ERC-5564): append-only announcements
//!
//! Two backends are provided:
//!
//! - **Memory**: Fast in-memory storage for development and testing
//! - **File**: Persistent single-file storage for the CLI
//!
//! ## Example
//!
//! ```rust,ignore
//! use obscura_registry::{AnnouncementLog, LogFilter, MemoryRegistry};
//!
//! let registry = MemoryRegistry::new();
//!
//! // Publish an announcement
//! let id = registry.announce(announcement).await?;
//!
//! // Fetch a block range
//! let logs = registry.get_logs(&LogFilter::block_range(0, 100)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod file;
mod memory;

pub use file::FileRegistry;
pub use memory::{MemoryRegistry, MetaEntry};

// Re-export the traits from core
pub use obscura_core::traits::{AnnouncementLog, LogFilter, MetaAddressRegistry};
