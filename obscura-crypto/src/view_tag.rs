//! View tag computation for efficient scanning.
//!
//! View tags enable recipients to quickly filter announcements:
//! - Each announcement includes a 1-byte view tag
//! - Recipients compute their expected view tag from the shared secret
//! - Only announcements with matching view tags require the second
//!   point multiplication and address derivation
//!
//! ## Efficiency
//!
//! With 1-byte view tags (256 possible values), ~99.6% of non-matching
//! announcements are skipped after a single ECDH.
//!
//! ## Security
//!
//! View tags leak 1 byte of information about the shared secret. This is
//! acceptable because:
//! 1. The tag is hashed under its own domain separator, independent of
//!    the stealth scalar hash
//! 2. Leaking 8 of 256 bits still leaves 248 bits of security
//! 3. The view tag alone cannot identify the recipient
//!
//! A matching tag is never proof of a payment; matching always finishes
//! with full address comparison.

use obscura_core::constants::{DOMAIN_VIEW_TAG, VIEW_TAG_SPACE};

use crate::derive::SharedSecret;
use crate::hash::keccak256_tagged;

/// Computes the view tag from a shared secret.
///
/// The view tag is the first byte of
/// `keccak256(DOMAIN_VIEW_TAG || shared_secret)`.
pub fn compute_view_tag(shared: &SharedSecret) -> u8 {
    let hash = keccak256_tagged(DOMAIN_VIEW_TAG, shared.as_bytes());
    hash[0]
}

/// Checks if a view tag matches the expected value for a shared secret.
///
/// Constant-time comparison to prevent timing attacks.
pub fn verify_view_tag(shared: &SharedSecret, expected_tag: u8) -> bool {
    let computed_tag = compute_view_tag(shared);
    subtle::ConstantTimeEq::ct_eq(&computed_tag, &expected_tag).into()
}

/// View tag distribution tracker.
///
/// Useful for analyzing the distribution of view tags in a log.
#[derive(Debug, Clone)]
pub struct ViewTagStats {
    /// Count of each view tag value
    pub distribution: Vec<u64>,
    /// Total number of tags analyzed
    pub total: u64,
}

impl Default for ViewTagStats {
    fn default() -> Self {
        Self {
            distribution: vec![0; VIEW_TAG_SPACE],
            total: 0,
        }
    }
}

impl ViewTagStats {
    /// Creates a new stats tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a view tag.
    pub fn add(&mut self, tag: u8) {
        self.distribution[tag as usize] += 1;
        self.total += 1;
    }

    /// Returns the most common view tag.
    pub fn most_common(&self) -> Option<(u8, u64)> {
        self.distribution
            .iter()
            .enumerate()
            .max_by_key(|(_, &count)| count)
            .map(|(tag, &count)| (tag as u8, count))
    }

    /// Returns the expected count per tag for uniform distribution.
    pub fn expected_uniform_count(&self) -> f64 {
        self.total as f64 / VIEW_TAG_SPACE as f64
    }

    /// Computes chi-squared statistic for uniformity test.
    pub fn chi_squared(&self) -> f64 {
        let expected = self.expected_uniform_count();
        if expected == 0.0 {
            return 0.0;
        }

        self.distribution
            .iter()
            .map(|&observed| {
                let diff = observed as f64 - expected;
                (diff * diff) / expected
            })
            .sum()
    }
}
