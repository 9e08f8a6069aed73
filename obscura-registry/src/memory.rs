//! In-memory registry and announcement log.
//!
//! Fast, thread-safe storage suitable for development, testing, and
//! single-process deployments. Models the two on-chain contracts: the
//! ERC-6538 meta-address registry and the ERC-5564 announcer.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, instrument};

use obscura_core::error::{ObscuraError, Result};
use obscura_core::traits::{AnnouncementLog, LogFilter, MetaAddressRegistry};
use obscura_core::types::{Announcement, AnnouncementStats, EthAddress};

/// Serializable meta-address registry entry.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct MetaEntry {
    /// Who registered
    pub registrant: EthAddress,
    /// Scheme the entry was registered under
    pub scheme_id: u32,
    /// Raw meta-address payload as stored (possibly padded)
    #[serde(with = "hex")]
    pub payload: Vec<u8>,
}

/// In-memory registry and announcement log.
///
/// # Indexing
///
/// Announcements are indexed by:
/// - ID: For direct lookup
/// - View tag: For pre-filtered queries (O(1) bucket lookup)
/// - Block number: For range scans (assigned at publish time)
/// - Tx hash: For duplicate detection (when provided)
///
/// # Thread Safety
///
/// All operations are thread-safe and can be called concurrently.
#[derive(Debug)]
pub struct MemoryRegistry {
    /// Meta-address registry: (registrant, scheme) → payload
    meta_addresses: DashMap<(EthAddress, u32), Vec<u8>>,
    /// Primary announcement storage: ID → Announcement
    announcements: DashMap<u64, Announcement>,
    /// View tag index: tag → [announcement IDs]
    view_tag_index: DashMap<u8, Vec<u64>>,
    /// Tx hash index: normalized tx_hash → announcement ID
    tx_hash_index: DashMap<String, u64>,
    /// Next announcement ID
    next_id: AtomicU64,
    /// Simulated chain head; unmined announcements get the next block
    head_block: AtomicU64,
    /// Log statistics
    stats: RwLock<AnnouncementStats>,
}

impl MemoryRegistry {
    /// Creates a new empty in-memory registry.
    pub fn new() -> Self {
        Self {
            meta_addresses: DashMap::new(),
            announcements: DashMap::new(),
            view_tag_index: DashMap::new(),
            tx_hash_index: DashMap::new(),
            next_id: AtomicU64::new(1),
            head_block: AtomicU64::new(0),
            stats: RwLock::new(AnnouncementStats::new()),
        }
    }

    /// Creates a registry with preallocated announcement capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            meta_addresses: DashMap::new(),
            announcements: DashMap::with_capacity(capacity),
            view_tag_index: DashMap::with_capacity(256), // One bucket per view tag
            tx_hash_index: DashMap::new(),
            next_id: AtomicU64::new(1),
            head_block: AtomicU64::new(0),
            stats: RwLock::new(AnnouncementStats::new()),
        }
    }

    /// Normalizes a tx hash for indexing (lowercase, trimmed).
    fn normalize_tx_hash(hash: &str) -> String {
        hash.trim().to_lowercase()
    }

    /// Returns the current statistics.
    pub fn stats(&self) -> AnnouncementStats {
        self.stats.read().clone()
    }

    /// Clears all announcements and registry entries.
    pub fn clear(&self) {
        self.meta_addresses.clear();
        self.announcements.clear();
        self.view_tag_index.clear();
        self.tx_hash_index.clear();
        self.next_id.store(1, Ordering::SeqCst);
        self.head_block.store(0, Ordering::SeqCst);
        *self.stats.write() = AnnouncementStats::new();
    }

    /// Returns the number of announcements.
    pub fn len(&self) -> usize {
        self.announcements.len()
    }

    /// Returns true if the log is empty.
    pub fn is_empty(&self) -> bool {
        self.announcements.is_empty()
    }

    /// Retrieves announcements by view tag.
    ///
    /// O(1) bucket lookup, then O(n) over the (typically small) bucket.
    pub fn get_by_view_tag(&self, view_tag: u8) -> Vec<Announcement> {
        let ids = match self.view_tag_index.get(&view_tag) {
            Some(ids) => ids.clone(),
            None => return Vec::new(),
        };

        let mut announcements = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(ann) = self.announcements.get(&id) {
                announcements.push(ann.clone());
            }
        }
        announcements
    }

    /// Returns all announcements ordered by id (for export/backup).
    pub fn all_announcements(&self) -> Vec<Announcement> {
        let mut announcements: Vec<Announcement> = self
            .announcements
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        announcements.sort_by_key(|a| a.id);
        announcements
    }

    /// Returns all registry entries (for export/backup).
    pub fn all_meta_entries(&self) -> Vec<MetaEntry> {
        self.meta_addresses
            .iter()
            .map(|entry| MetaEntry {
                registrant: entry.key().0,
                scheme_id: entry.key().1,
                payload: entry.value().clone(),
            })
            .collect()
    }

    /// Imports announcements, preserving ids where already assigned.
    ///
    /// Useful for restoring from backup or syncing from another source.
    pub fn import(&self, announcements: Vec<Announcement>) -> Result<usize> {
        let mut imported = 0;

        for mut ann in announcements {
            if ann.id == 0 {
                ann.id = self.next_id.fetch_add(1, Ordering::SeqCst);
            } else {
                let current = self.next_id.load(Ordering::SeqCst);
                if ann.id >= current {
                    self.next_id.store(ann.id + 1, Ordering::SeqCst);
                }
            }

            ann.validate()?;

            if let Some(block) = ann.block_number {
                let head = self.head_block.load(Ordering::SeqCst);
                if block > head {
                    self.head_block.store(block, Ordering::SeqCst);
                }
            }

            self.index_announcement(&ann);
            self.stats.write().add(&ann);
            self.announcements.insert(ann.id, ann);
            imported += 1;
        }

        Ok(imported)
    }

    /// Imports registry entries.
    pub fn import_meta(&self, entries: Vec<MetaEntry>) {
        for entry in entries {
            self.meta_addresses
                .insert((entry.registrant, entry.scheme_id), entry.payload);
        }
    }

    fn index_announcement(&self, ann: &Announcement) {
        if let Some(tag) = ann.view_tag() {
            self.view_tag_index.entry(tag).or_default().push(ann.id);
        }
        if let Some(ref hash) = ann.tx_hash {
            self.tx_hash_index
                .insert(Self::normalize_tx_hash(hash), ann.id);
        }
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetaAddressRegistry for MemoryRegistry {
    #[instrument(skip(self))]
    async fn get_meta_address(
        &self,
        registrant: &EthAddress,
        scheme_id: u32,
    ) -> Result<Option<Vec<u8>>> {
        Ok(self
            .meta_addresses
            .get(&(*registrant, scheme_id))
            .map(|entry| entry.value().clone()))
    }

    #[instrument(skip(self, meta_address))]
    async fn set_meta_address(
        &self,
        registrant: &EthAddress,
        scheme_id: u32,
        meta_address: &[u8],
    ) -> Result<()> {
        if meta_address.is_empty() {
            return Err(ObscuraError::RegistryError(
                "meta-address payload cannot be empty".into(),
            ));
        }

        debug!(registrant = %registrant, scheme_id, "Registering meta-address");
        self.meta_addresses
            .insert((*registrant, scheme_id), meta_address.to_vec());
        Ok(())
    }
}

#[async_trait]
impl AnnouncementLog for MemoryRegistry {
    /// Publishes a new announcement.
    ///
    /// The announcement is validated, assigned an ID and a block number,
    /// indexed by view tag, and stored in memory.
    #[instrument(skip(self, announcement), fields(view_tag = ?announcement.view_tag()))]
    async fn announce(&self, mut announcement: Announcement) -> Result<u64> {
        announcement.validate()?;

        // Reject duplicate tx_hash if provided
        if let Some(ref hash) = announcement.tx_hash {
            let normalized = Self::normalize_tx_hash(hash);
            if normalized.is_empty() {
                return Err(ObscuraError::InvalidAnnouncement(
                    "tx_hash cannot be empty".into(),
                ));
            }
            if self.tx_hash_index.contains_key(&normalized) {
                return Err(ObscuraError::DuplicateAnnouncement(normalized));
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        announcement.id = id;

        // Unmined announcements are placed in the next simulated block
        if announcement.block_number.is_none() {
            announcement.block_number = Some(self.head_block.fetch_add(1, Ordering::SeqCst) + 1);
        } else if let Some(block) = announcement.block_number {
            let head = self.head_block.load(Ordering::SeqCst);
            if block > head {
                self.head_block.store(block, Ordering::SeqCst);
            }
        }

        debug!(id, block = ?announcement.block_number, "Publishing announcement");

        self.index_announcement(&announcement);
        self.stats.write().add(&announcement);
        self.announcements.insert(id, announcement);

        Ok(id)
    }

    #[instrument(skip(self, filter))]
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Announcement>> {
        let mut announcements: Vec<Announcement> = self
            .announcements
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        announcements.sort_by_key(|a| a.id);

        debug!(count = announcements.len(), "Retrieved logs");
        Ok(announcements)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.announcements.len() as u64)
    }

    async fn latest_block(&self) -> Result<Option<u64>> {
        let head = self.head_block.load(Ordering::SeqCst);
        Ok(if head == 0 { None } else { Some(head) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obscura_core::constants::{ETH_ADDRESS_SIZE, PUBLIC_KEY_SIZE};
    use obscura_core::types::CurvePublicKey;

    fn make_test_announcement(view_tag: u8) -> Announcement {
        Announcement::new(
            EthAddress::from_array([0x11; ETH_ADDRESS_SIZE]),
            CurvePublicKey::from_array([0x02; PUBLIC_KEY_SIZE]),
            view_tag,
        )
    }

    #[tokio::test]
    async fn test_announce_assigns_ids_and_blocks() {
        let registry = MemoryRegistry::new();

        let id1 = registry.announce(make_test_announcement(0x01)).await.unwrap();
        let id2 = registry.announce(make_test_announcement(0x02)).await.unwrap();
        assert_eq!(id1, 1);
        assert_eq!(id2, 2);

        let logs = registry.get_logs(&LogFilter::default()).await.unwrap();
        assert_eq!(logs[0].block_number, Some(1));
        assert_eq!(logs[1].block_number, Some(2));
        assert_eq!(registry.latest_block().await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_get_logs_block_range() {
        let registry = MemoryRegistry::new();

        for tag in 0..5u8 {
            registry.announce(make_test_announcement(tag)).await.unwrap();
        }

        let logs = registry
            .get_logs(&LogFilter::block_range(2, 4))
            .await
            .unwrap();
        assert_eq!(logs.len(), 3);
        assert!(logs.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn test_get_logs_scheme_filter() {
        let registry = MemoryRegistry::new();
        registry.announce(make_test_announcement(0x01)).await.unwrap();

        let filter = LogFilter {
            scheme_id: Some(99),
            ..Default::default()
        };
        assert!(registry.get_logs(&filter).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_by_view_tag() {
        let registry = MemoryRegistry::new();

        registry.announce(make_test_announcement(0x42)).await.unwrap();
        registry.announce(make_test_announcement(0x42)).await.unwrap();
        registry.announce(make_test_announcement(0x00)).await.unwrap();

        assert_eq!(registry.get_by_view_tag(0x42).len(), 2);
        assert_eq!(registry.get_by_view_tag(0x00).len(), 1);
        assert!(registry.get_by_view_tag(0xFF).is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_tx_hash_rejected() {
        let registry = MemoryRegistry::new();

        let mut ann1 = make_test_announcement(0x01);
        ann1.tx_hash = Some("0xABCD".into());
        registry.announce(ann1).await.unwrap();

        // Same hash, different case
        let mut ann2 = make_test_announcement(0x02);
        ann2.tx_hash = Some("0xabcd".into());
        let result = registry.announce(ann2).await;
        assert!(matches!(
            result,
            Err(ObscuraError::DuplicateAnnouncement(_))
        ));
    }

    #[tokio::test]
    async fn test_meta_address_registry() {
        let registry = MemoryRegistry::new();
        let registrant = EthAddress::from_array([0xAA; ETH_ADDRESS_SIZE]);

        assert!(registry
            .get_meta_address(&registrant, 1)
            .await
            .unwrap()
            .is_none());

        registry
            .set_meta_address(&registrant, 1, b"st:eth:00112233")
            .await
            .unwrap();

        let stored = registry.get_meta_address(&registrant, 1).await.unwrap();
        assert_eq!(stored.as_deref(), Some(b"st:eth:00112233".as_ref()));

        // Different scheme id is a different slot
        assert!(registry
            .get_meta_address(&registrant, 2)
            .await
            .unwrap()
            .is_none());

        // Re-registration replaces
        registry
            .set_meta_address(&registrant, 1, b"st:eth:44556677")
            .await
            .unwrap();
        let replaced = registry.get_meta_address(&registrant, 1).await.unwrap();
        assert_eq!(replaced.as_deref(), Some(b"st:eth:44556677".as_ref()));
    }

    #[tokio::test]
    async fn test_empty_meta_address_rejected() {
        let registry = MemoryRegistry::new();
        let registrant = EthAddress::from_array([0xAA; ETH_ADDRESS_SIZE]);

        let result = registry.set_meta_address(&registrant, 1, b"").await;
        assert!(matches!(result, Err(ObscuraError::RegistryError(_))));
    }

    #[tokio::test]
    async fn test_stats() {
        let registry = MemoryRegistry::new();

        registry.announce(make_test_announcement(0x42)).await.unwrap();
        registry.announce(make_test_announcement(0x42)).await.unwrap();
        registry.announce(make_test_announcement(0x00)).await.unwrap();

        let stats = registry.stats();
        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.view_tag_distribution[0x42], 2);
        assert_eq!(stats.view_tag_distribution[0x00], 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let registry = MemoryRegistry::new();

        registry.announce(make_test_announcement(0x01)).await.unwrap();
        assert_eq!(registry.len(), 1);

        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.latest_block().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_import_export() {
        let registry1 = MemoryRegistry::new();
        registry1.announce(make_test_announcement(0x01)).await.unwrap();
        registry1.announce(make_test_announcement(0x02)).await.unwrap();

        let announcements = registry1.all_announcements();
        assert_eq!(announcements.len(), 2);

        let registry2 = MemoryRegistry::new();
        let imported = registry2.import(announcements).unwrap();
        assert_eq!(imported, 2);
        assert_eq!(registry2.len(), 2);
        // Block numbers survive the round-trip
        assert_eq!(registry2.latest_block().await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_concurrent_announce() {
        use std::sync::Arc;
        use tokio::task::JoinSet;

        let registry = Arc::new(MemoryRegistry::new());
        let mut tasks = JoinSet::new();

        for i in 0..100u8 {
            let reg = registry.clone();
            tasks.spawn(async move {
                reg.announce(make_test_announcement(i)).await.unwrap()
            });
        }

        while let Some(result) = tasks.join_next().await {
            result.unwrap();
        }

        assert_eq!(registry.len(), 100);
    }

    #[tokio::test]
    async fn test_invalid_announcement_rejected() {
        let registry = MemoryRegistry::new();

        let mut invalid = make_test_announcement(0x00);
        invalid.ephemeral_pk = CurvePublicKey::default();

        assert!(registry.announce(invalid).await.is_err());
    }
}
