//! Registry persistence.
//!
//! The registry is the set of card identifiers allowed to operate the lock.
//! Stores only load and save whole sets; membership checks happen in memory
//! in the controller.
//!
//! The file format is a JSON document with a single `cards` array:
//!
//! ```json
//! { "cards": ["04a1b2c3", "deadbeef"] }
//! ```

#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use autolock_core::CardId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Load/save access to the persisted registry.
///
/// # Examples
///
/// ```no_run
/// use autolock_storage::{RegistryStore, FileRegistryStore};
///
/// # async fn example() -> autolock_storage::StorageResult<()> {
/// let store = FileRegistryStore::new("autolock-cards.json");
/// let mut cards = store.load().await?;
/// cards.insert("04a1b2c3".parse().unwrap());
/// store.save(&cards).await?;
/// # Ok(())
/// # }
/// ```
pub trait RegistryStore: Send + Sync {
    /// Read the persisted identifiers.
    async fn load(&self) -> StorageResult<BTreeSet<CardId>>;

    /// Replace the persisted identifiers.
    async fn save(&self, cards: &BTreeSet<CardId>) -> StorageResult<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    cards: Vec<String>,
}

/// Registry kept in a JSON file.
///
/// A missing file is an empty registry. Entries that are not valid
/// identifiers are skipped with a warning rather than discarding the file.
/// Saves write a sibling temporary file and rename it over the original.
#[derive(Debug, Clone)]
pub struct FileRegistryStore {
    path: PathBuf,
}

impl FileRegistryStore {
    /// Create a store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the registry file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl RegistryStore for FileRegistryStore {
    async fn load(&self) -> StorageResult<BTreeSet<CardId>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No registry at {}, starting empty", self.path.display());
                return Ok(BTreeSet::new());
            }
            Err(e) => return Err(e.into()),
        };

        let file: RegistryFile = serde_json::from_slice(&bytes)?;
        let mut cards = BTreeSet::new();

        for entry in file.cards {
            match CardId::parse(&entry) {
                Ok(id) => {
                    cards.insert(id);
                }
                Err(e) => warn!("Skipping registry entry {:?}: {}", entry, e),
            }
        }

        debug!(
            "Loaded {} cards from {}",
            cards.len(),
            self.path.display()
        );
        Ok(cards)
    }

    async fn save(&self, cards: &BTreeSet<CardId>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file = RegistryFile {
            cards: cards.iter().map(|id| id.as_str().to_string()).collect(),
        };
        let json = serde_json::to_vec_pretty(&file)?;

        let temp = self.temp_path();
        tokio::fs::write(&temp, json).await?;
        tokio::fs::rename(&temp, &self.path).await?;

        debug!("Saved {} cards to {}", cards.len(), self.path.display());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    cards: BTreeSet<CardId>,
    saves: usize,
    failing: bool,
}

/// In-memory registry, for tests and simulation.
///
/// A store created with [`MemoryRegistryStore::failing`] rejects every load
/// and save, which models an unwritable disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRegistryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-filled with `cards`.
    pub fn with_cards(cards: impl IntoIterator<Item = CardId>) -> Self {
        let store = Self::default();
        store.lock().cards.extend(cards);
        store
    }

    /// Create a store whose every operation fails.
    pub fn failing() -> Self {
        let store = Self::default();
        store.lock().failing = true;
        store
    }

    /// Current contents.
    pub fn cards(&self) -> BTreeSet<CardId> {
        self.lock().cards.clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RegistryStore for MemoryRegistryStore {
    async fn load(&self) -> StorageResult<BTreeSet<CardId>> {
        let state = self.lock();
        if state.failing {
            return Err(StorageError::Unavailable("memory store offline".to_string()));
        }
        Ok(state.cards.clone())
    }

    async fn save(&self, cards: &BTreeSet<CardId>) -> StorageResult<()> {
        let mut state = self.lock();
        if state.failing {
            return Err(StorageError::Unavailable("memory store offline".to_string()));
        }
        state.cards = cards.clone();
        state.saves += 1;
        Ok(())
    }
}

/// Enum wrapper for registry store dispatch.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyRegistryStore {
    File(FileRegistryStore),
    Memory(MemoryRegistryStore),
}

impl RegistryStore for AnyRegistryStore {
    async fn load(&self) -> StorageResult<BTreeSet<CardId>> {
        match self {
            Self::File(store) => store.load().await,
            Self::Memory(store) => store.load().await,
        }
    }

    async fn save(&self, cards: &BTreeSet<CardId>) -> StorageResult<()> {
        match self {
            Self::File(store) => store.save(cards).await,
            Self::Memory(store) => store.save(cards).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> CardId {
        CardId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryRegistryStore::with_cards([id("04a1b2c3")]);
        let mut cards = store.load().await.unwrap();
        assert_eq!(cards.len(), 1);

        cards.insert(id("deadbeef"));
        store.save(&cards).await.unwrap();

        assert_eq!(store.cards(), cards);
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_memory_store() {
        let store = MemoryRegistryStore::failing();
        assert!(matches!(
            store.load().await,
            Err(StorageError::Unavailable(_))
        ));
        assert!(store.save(&BTreeSet::new()).await.is_err());
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let store = FileRegistryStore::new("/var/lib/autolock/cards.json");
        assert_eq!(
            store.temp_path(),
            PathBuf::from("/var/lib/autolock/cards.json.tmp")
        );
    }

    #[tokio::test]
    async fn test_any_store_dispatch() {
        let memory = MemoryRegistryStore::new();
        let store = AnyRegistryStore::Memory(memory.clone());

        let cards: BTreeSet<CardId> = [id("deadbeef")].into_iter().collect();
        store.save(&cards).await.unwrap();
        assert_eq!(memory.cards(), cards);
    }
}
