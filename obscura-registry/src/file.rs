//! File-backed registry with persistence.
//!
//! Wraps the in-memory registry with periodic saves to a single file.
//! Suitable for the CLI and single-node deployments where durability is
//! needed.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};

use obscura_core::error::{ObscuraError, Result};
use obscura_core::traits::{AnnouncementLog, LogFilter, MetaAddressRegistry};
use obscura_core::types::{Announcement, AnnouncementStats, EthAddress};

use crate::memory::{MemoryRegistry, MetaEntry};

/// File format magic bytes
const MAGIC: &[u8; 4] = b"OBSC";
/// Current file format version
const VERSION: u8 = 1;
/// Header size: magic + version + count
const HEADER_LEN: usize = 13;

/// Serialized registry state.
#[derive(Serialize, Deserialize)]
struct Snapshot {
    meta_addresses: Vec<MetaEntry>,
    announcements: Vec<Announcement>,
}

/// File-backed registry and announcement log.
///
/// Uses a memory registry internally with persistence to disk.
///
/// # File Format
///
/// ```text
/// magic (4 bytes): "OBSC"
/// version (1 byte): 1
/// count (8 bytes): number of announcements
/// snapshot (variable): JSON-serialized registry state
/// ```
pub struct FileRegistry {
    /// Path to the storage file
    path: PathBuf,
    /// In-memory storage
    memory: MemoryRegistry,
    /// Whether there are unsaved changes
    dirty: AtomicBool,
    /// Auto-save threshold (save after N writes)
    auto_save_threshold: u64,
    /// Writes since last save
    writes_since_save: AtomicU64,
}

impl FileRegistry {
    /// Creates a new file registry at the given path.
    ///
    /// If the file exists, it will be loaded. Otherwise, an empty registry
    /// is created and the file will be created on first save.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let registry = Self {
            path,
            memory: MemoryRegistry::new(),
            dirty: AtomicBool::new(false),
            auto_save_threshold: 100,
            writes_since_save: AtomicU64::new(0),
        };

        if registry.path.exists() {
            registry.load().await?;
        }

        Ok(registry)
    }

    /// Creates a file registry with custom auto-save threshold.
    pub async fn with_auto_save(path: impl AsRef<Path>, threshold: u64) -> Result<Self> {
        let mut registry = Self::new(path).await?;
        registry.auto_save_threshold = threshold;
        Ok(registry)
    }

    /// Loads the snapshot from the file.
    #[instrument(skip(self))]
    async fn load(&self) -> Result<()> {
        let mut file = fs::File::open(&self.path).await?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents).await?;

        if contents.len() < HEADER_LEN {
            return Err(ObscuraError::RegistryError("file too short".into()));
        }

        if &contents[0..4] != MAGIC {
            return Err(ObscuraError::RegistryError("invalid magic bytes".into()));
        }

        let version = contents[4];
        if version != VERSION {
            return Err(ObscuraError::RegistryError(format!(
                "unsupported file version {version}, expected {VERSION}"
            )));
        }

        let count = u64::from_le_bytes(
            contents[5..HEADER_LEN]
                .try_into()
                .map_err(|_| ObscuraError::RegistryError("corrupt header".into()))?,
        );
        info!(count, "Loading registry from file");

        if contents.len() > HEADER_LEN {
            let snapshot: Snapshot = serde_json::from_slice(&contents[HEADER_LEN..])?;
            self.memory.import_meta(snapshot.meta_addresses);
            self.memory.import(snapshot.announcements)?;
        }

        self.dirty.store(false, Ordering::SeqCst);
        debug!("Registry loaded successfully");

        Ok(())
    }

    /// Saves the snapshot to the file.
    #[instrument(skip(self))]
    pub async fn save(&self) -> Result<()> {
        let snapshot = Snapshot {
            meta_addresses: self.memory.all_meta_entries(),
            announcements: self.memory.all_announcements(),
        };
        let count = snapshot.announcements.len() as u64;

        info!(count, path = ?self.path, "Saving registry to file");

        let serialized = serde_json::to_vec(&snapshot)?;

        let mut contents = Vec::with_capacity(HEADER_LEN + serialized.len());
        contents.extend_from_slice(MAGIC);
        contents.push(VERSION);
        contents.extend_from_slice(&count.to_le_bytes());
        contents.extend_from_slice(&serialized);

        // Write atomically (write to temp, then rename)
        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&contents).await?;
        file.sync_all().await?;

        fs::rename(&temp_path, &self.path).await?;

        self.dirty.store(false, Ordering::SeqCst);
        self.writes_since_save.store(0, Ordering::SeqCst);

        debug!("Registry saved successfully");
        Ok(())
    }

    /// Checks if there are unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Forces a save if dirty.
    pub async fn flush(&self) -> Result<()> {
        if self.is_dirty() {
            self.save().await?;
        }
        Ok(())
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the underlying memory registry for direct access.
    pub fn memory(&self) -> &MemoryRegistry {
        &self.memory
    }

    /// Returns statistics.
    pub fn stats(&self) -> AnnouncementStats {
        self.memory.stats()
    }

    /// Returns the number of announcements.
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    async fn record_write(&self) -> Result<()> {
        self.dirty.store(true, Ordering::SeqCst);
        let writes = self.writes_since_save.fetch_add(1, Ordering::SeqCst);
        if writes >= self.auto_save_threshold {
            self.save().await?;
        }
        Ok(())
    }
}

impl Drop for FileRegistry {
    fn drop(&mut self) {
        // Best-effort only; async save is not possible in Drop
        if self.is_dirty() {
            warn!("FileRegistry dropped with unsaved changes");
        }
    }
}

#[async_trait]
impl MetaAddressRegistry for FileRegistry {
    async fn get_meta_address(
        &self,
        registrant: &EthAddress,
        scheme_id: u32,
    ) -> Result<Option<Vec<u8>>> {
        self.memory.get_meta_address(registrant, scheme_id).await
    }

    async fn set_meta_address(
        &self,
        registrant: &EthAddress,
        scheme_id: u32,
        meta_address: &[u8],
    ) -> Result<()> {
        self.memory
            .set_meta_address(registrant, scheme_id, meta_address)
            .await?;
        self.record_write().await
    }
}

#[async_trait]
impl AnnouncementLog for FileRegistry {
    async fn announce(&self, announcement: Announcement) -> Result<u64> {
        let id = self.memory.announce(announcement).await?;
        self.record_write().await?;
        Ok(id)
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<Announcement>> {
        self.memory.get_logs(filter).await
    }

    async fn count(&self) -> Result<u64> {
        self.memory.count().await
    }

    async fn latest_block(&self) -> Result<Option<u64>> {
        self.memory.latest_block().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obscura_core::constants::{ETH_ADDRESS_SIZE, PUBLIC_KEY_SIZE};
    use obscura_core::types::CurvePublicKey;
    use tempfile::tempdir;

    fn make_test_announcement(view_tag: u8) -> Announcement {
        Announcement::new(
            EthAddress::from_array([0x11; ETH_ADDRESS_SIZE]),
            CurvePublicKey::from_array([0x02; PUBLIC_KEY_SIZE]),
            view_tag,
        )
    }

    #[tokio::test]
    async fn test_new_empty_registry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.bin");

        let registry = FileRegistry::new(&path).await.unwrap();
        assert!(registry.is_empty());
        assert!(!path.exists()); // File not created until save
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.bin");
        let registrant = EthAddress::from_array([0xAA; ETH_ADDRESS_SIZE]);

        // Create and populate
        {
            let registry = FileRegistry::new(&path).await.unwrap();
            registry.announce(make_test_announcement(0x01)).await.unwrap();
            registry.announce(make_test_announcement(0x02)).await.unwrap();
            registry
                .set_meta_address(&registrant, 1, b"st:eth:payload")
                .await
                .unwrap();
            registry.save().await.unwrap();
        }

        // Load in new instance
        {
            let registry = FileRegistry::new(&path).await.unwrap();
            assert_eq!(registry.len(), 2);

            let logs = registry.get_logs(&LogFilter::default()).await.unwrap();
            assert_eq!(logs.len(), 2);
            assert_eq!(logs[0].view_tag(), Some(0x01));

            let stored = registry.get_meta_address(&registrant, 1).await.unwrap();
            assert_eq!(stored.as_deref(), Some(b"st:eth:payload".as_ref()));
        }
    }

    #[tokio::test]
    async fn test_dirty_tracking() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.bin");

        let registry = FileRegistry::new(&path).await.unwrap();
        assert!(!registry.is_dirty());

        registry.announce(make_test_announcement(0x01)).await.unwrap();
        assert!(registry.is_dirty());

        registry.save().await.unwrap();
        assert!(!registry.is_dirty());
    }

    #[tokio::test]
    async fn test_auto_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.bin");

        let registry = FileRegistry::with_auto_save(&path, 2).await.unwrap();

        registry.announce(make_test_announcement(0x01)).await.unwrap();
        registry.announce(make_test_announcement(0x02)).await.unwrap();
        registry.announce(make_test_announcement(0x03)).await.unwrap();

        // Auto-save has fired; a fresh instance sees the data
        let registry2 = FileRegistry::new(&path).await.unwrap();
        assert_eq!(registry2.len(), 3);
    }

    #[tokio::test]
    async fn test_flush() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.bin");

        let registry = FileRegistry::new(&path).await.unwrap();
        registry.announce(make_test_announcement(0x01)).await.unwrap();

        registry.flush().await.unwrap();
        assert!(!registry.is_dirty());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_invalid_file_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.bin");

        fs::write(&path, b"invalid data").await.unwrap();

        let result = FileRegistry::new(&path).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_atomic_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.bin");
        let temp_path = path.with_extension("tmp");

        let registry = FileRegistry::new(&path).await.unwrap();
        registry.announce(make_test_announcement(0x01)).await.unwrap();
        registry.save().await.unwrap();

        assert!(!temp_path.exists());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_block_numbers_survive_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.bin");

        {
            let registry = FileRegistry::new(&path).await.unwrap();
            registry.announce(make_test_announcement(0x01)).await.unwrap();
            registry.announce(make_test_announcement(0x02)).await.unwrap();
            registry.save().await.unwrap();
        }

        let registry = FileRegistry::new(&path).await.unwrap();
        assert_eq!(registry.latest_block().await.unwrap(), Some(2));

        // New announcements continue after the loaded head
        registry.announce(make_test_announcement(0x03)).await.unwrap();
        assert_eq!(registry.latest_block().await.unwrap(), Some(3));
    }
}
