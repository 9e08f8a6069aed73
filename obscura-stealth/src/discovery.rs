//! Payment discovery (recipient-side matching).
//!
//! Matching needs only the viewing secret and the spending *public* key,
//! so it can run on a watch-only service. A view tag match is never
//! treated as a discovery; matching always finishes with full address
//! comparison, and announcements that pass the tag but fail the address
//! check (1/256 of foreign traffic) are counted as false positives.

use obscura_core::error::{ObscuraError, Result};
use obscura_core::types::{Announcement, CurvePublicKey, EthAddress, SecretScalar};
use obscura_crypto::derive::{compute_shared_secret, derive_eth_address, derive_stealth_public_key};
use obscura_crypto::{compute_view_tag, verify_stealth_address};

/// A payment confirmed to belong to this recipient.
#[derive(Clone, Debug)]
pub struct MatchedPayment {
    /// The announcement that produced the match
    pub announcement: Announcement,
    /// The stealth public key behind the announced address
    pub stealth_pk: CurvePublicKey,
    /// The announced one-time address
    pub stealth_address: EthAddress,
}

/// Result of scanning a single announcement.
#[derive(Debug)]
pub enum ScanOutcome {
    /// View tag didn't match - not for this recipient
    NotForUs,
    /// View tag matched but the full address check failed (expected for
    /// ~1/256 of foreign announcements)
    FalsePositive,
    /// Full match - payment discovered
    Matched(MatchedPayment),
    /// Announcement was malformed or used an unsupported scheme
    Failed(ObscuraError),
}

impl ScanOutcome {
    /// Returns true if a payment was discovered.
    pub fn is_matched(&self) -> bool {
        matches!(self, ScanOutcome::Matched(_))
    }

    /// Returns the matched payment if present.
    pub fn into_matched(self) -> Option<MatchedPayment> {
        match self {
            ScanOutcome::Matched(payment) => Some(payment),
            _ => None,
        }
    }
}

/// Statistics for scanning operations.
#[derive(Debug, Clone, Default)]
pub struct ScanStats {
    /// Total announcements scanned
    pub total_scanned: u64,
    /// Announcements skipped by the view tag pre-filter
    pub view_tag_skips: u64,
    /// View tag matches that failed the full address check
    pub false_positives: u64,
    /// Number of payments discovered
    pub matches: u64,
    /// Number of errors during scanning
    pub errors: u64,
    /// Duration of the scan in milliseconds
    pub duration_ms: u64,
}

impl ScanStats {
    /// Creates a new stats tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a scan outcome.
    pub fn record(&mut self, outcome: &ScanOutcome) {
        self.total_scanned += 1;
        match outcome {
            ScanOutcome::NotForUs => self.view_tag_skips += 1,
            ScanOutcome::FalsePositive => self.false_positives += 1,
            ScanOutcome::Matched(_) => self.matches += 1,
            ScanOutcome::Failed(_) => self.errors += 1,
        }
    }

    /// Returns the scan rate (announcements per second).
    pub fn rate(&self) -> f64 {
        if self.duration_ms == 0 {
            0.0
        } else {
            (self.total_scanned as f64 / self.duration_ms as f64) * 1000.0
        }
    }

    /// Returns the filter efficiency (percentage skipped by view tag).
    pub fn filter_efficiency(&self) -> f64 {
        if self.total_scanned == 0 {
            0.0
        } else {
            (self.view_tag_skips as f64 / self.total_scanned as f64) * 100.0
        }
    }
}

/// Scans one announcement: ECDH, view tag pre-filter, full address check.
pub fn scan_announcement(
    announcement: &Announcement,
    viewing_sk: &SecretScalar,
    spending_pk: &CurvePublicKey,
) -> ScanOutcome {
    if let Err(e) = announcement.validate() {
        return ScanOutcome::Failed(e);
    }

    let shared = match compute_shared_secret(viewing_sk, &announcement.ephemeral_pk) {
        Ok(s) => s,
        Err(e) => return ScanOutcome::Failed(e),
    };

    // Pre-filter: skip on tag mismatch when the announcement carries one.
    // Untagged announcements fall through to the full check.
    if let Some(tag) = announcement.view_tag() {
        if compute_view_tag(&shared) != tag {
            return ScanOutcome::NotForUs;
        }
    }

    // Full check: the announced address must equal the derived one
    match verify_stealth_address(spending_pk, &shared, &announcement.stealth_address) {
        Ok(true) => {}
        Ok(false) => return ScanOutcome::FalsePositive,
        Err(e) => return ScanOutcome::Failed(e),
    }

    let stealth_pk = match derive_stealth_public_key(spending_pk, &shared) {
        Ok(pk) => pk,
        Err(e) => return ScanOutcome::Failed(e),
    };

    ScanOutcome::Matched(MatchedPayment {
        announcement: announcement.clone(),
        stealth_pk,
        stealth_address: announcement.stealth_address,
    })
}

/// Returns true if the announcement pays this recipient.
///
/// Full check regardless of view tag; use [`scan_announcement`] when the
/// tag pre-filter matters for throughput.
pub fn is_for_me(
    announcement: &Announcement,
    viewing_sk: &SecretScalar,
    spending_pk: &CurvePublicKey,
) -> Result<bool> {
    announcement.validate()?;
    let shared = compute_shared_secret(viewing_sk, &announcement.ephemeral_pk)?;
    let derived = derive_eth_address(&derive_stealth_public_key(spending_pk, &shared)?)?;
    Ok(derived == announcement.stealth_address)
}

/// Scans a batch, returning matched payments with their batch indices.
pub fn scan_announcements(
    announcements: &[Announcement],
    viewing_sk: &SecretScalar,
    spending_pk: &CurvePublicKey,
) -> Vec<(usize, MatchedPayment)> {
    announcements
        .iter()
        .enumerate()
        .filter_map(
            |(idx, ann)| match scan_announcement(ann, viewing_sk, spending_pk) {
                ScanOutcome::Matched(payment) => Some((idx, payment)),
                _ => None,
            },
        )
        .collect()
}

/// Scans a batch while collecting statistics.
pub fn scan_with_stats(
    announcements: &[Announcement],
    viewing_sk: &SecretScalar,
    spending_pk: &CurvePublicKey,
) -> (Vec<MatchedPayment>, ScanStats) {
    let started = std::time::Instant::now();
    let mut stats = ScanStats::new();
    let mut matched = Vec::new();

    for ann in announcements {
        let outcome = scan_announcement(ann, viewing_sk, spending_pk);
        stats.record(&outcome);
        if let ScanOutcome::Matched(payment) = outcome {
            matched.push(payment);
        }
    }

    stats.duration_ms = started.elapsed().as_millis() as u64;
    (matched, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::create_stealth_payment;
    use obscura_core::types::{MetaAddress, StealthKeySet};
    use obscura_crypto::derive_key_set;

    fn test_keys(seed: u8) -> StealthKeySet {
        let mut sig = vec![seed; 64];
        sig.push(27);
        derive_key_set(&sig).unwrap()
    }

    fn announcement_for(keys: &StealthKeySet) -> Announcement {
        let meta = MetaAddress::new(keys.spending.public, keys.viewing.public);
        create_stealth_payment(&meta).unwrap().announcement
    }

    #[test]
    fn test_scan_announcement_match() {
        let keys = test_keys(0x21);
        let ann = announcement_for(&keys);

        let outcome = scan_announcement(&ann, &keys.viewing.secret, &keys.spending.public);
        assert!(outcome.is_matched());

        let payment = outcome.into_matched().unwrap();
        assert_eq!(payment.stealth_address, ann.stealth_address);
        assert!(!payment.stealth_address.is_zero());
    }

    #[test]
    fn test_scan_announcement_not_for_us() {
        let keys = test_keys(0x21);
        let other = test_keys(0x22);
        let ann = announcement_for(&other);

        let outcome = scan_announcement(&ann, &keys.viewing.secret, &keys.spending.public);
        assert!(!outcome.is_matched());
    }

    #[test]
    fn test_forged_view_tag_is_false_positive() {
        let keys = test_keys(0x21);
        let other = test_keys(0x22);

        // Take a foreign announcement and forge its tag to what this
        // recipient would compute; the address check must still reject it
        let mut ann = announcement_for(&other);
        let shared =
            compute_shared_secret(&keys.viewing.secret, &ann.ephemeral_pk).unwrap();
        ann.metadata = vec![compute_view_tag(&shared)];

        let outcome = scan_announcement(&ann, &keys.viewing.secret, &keys.spending.public);
        assert!(matches!(outcome, ScanOutcome::FalsePositive));
    }

    #[test]
    fn test_untagged_announcement_still_matches() {
        let keys = test_keys(0x23);
        let mut ann = announcement_for(&keys);
        ann.metadata.clear();

        let outcome = scan_announcement(&ann, &keys.viewing.secret, &keys.spending.public);
        assert!(outcome.is_matched());
    }

    #[test]
    fn test_is_for_me() {
        let keys = test_keys(0x24);
        let ann = announcement_for(&keys);
        assert!(is_for_me(&ann, &keys.viewing.secret, &keys.spending.public).unwrap());

        let other = test_keys(0x25);
        assert!(!is_for_me(&ann, &other.viewing.secret, &other.spending.public).unwrap());
    }

    #[test]
    fn test_scan_batch_with_stats() {
        let keys = test_keys(0x26);
        let other = test_keys(0x27);

        let announcements = vec![
            announcement_for(&keys),
            announcement_for(&other),
            announcement_for(&keys),
        ];

        let matched = scan_announcements(&announcements, &keys.viewing.secret, &keys.spending.public);
        assert_eq!(matched.len(), 2);
        assert_eq!(matched[0].0, 0);
        assert_eq!(matched[1].0, 2);

        let (found, stats) =
            scan_with_stats(&announcements, &keys.viewing.secret, &keys.spending.public);
        assert_eq!(found.len(), 2);
        assert_eq!(stats.total_scanned, 3);
        assert_eq!(stats.matches, 2);
        // The foreign announcement almost certainly misses the tag
        assert_eq!(stats.view_tag_skips + stats.false_positives, 1);
    }

    #[test]
    fn test_scan_invalid_announcement_fails() {
        let keys = test_keys(0x28);
        let mut ann = announcement_for(&keys);
        ann.scheme_id = 99;

        let outcome = scan_announcement(&ann, &keys.viewing.secret, &keys.spending.public);
        assert!(matches!(outcome, ScanOutcome::Failed(_)));
    }
}
