//! Persistence for the Autolock door controller.
//!
//! Two things outlive a process run: the controller configuration and the
//! registry of cards allowed to operate the lock. Both are kept as small JSON
//! documents.
//!
//! - [`AutolockConfig`] - pins, angles, timings and gesture bindings
//! - [`RegistryStore`] - load/save access to the card registry, with a
//!   file-backed ([`FileRegistryStore`]) and an in-memory
//!   ([`MemoryRegistryStore`]) implementation
//!
//! # Examples
//!
//! ```no_run
//! use autolock_storage::{AutolockConfig, FileRegistryStore, RegistryStore};
//!
//! # async fn example() -> autolock_storage::StorageResult<()> {
//! let config = AutolockConfig::load("autolock.json").await?;
//! let store = FileRegistryStore::new(&config.registry_path);
//!
//! let cards = store.load().await?;
//! println!("{} registered cards", cards.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod registry;

pub use config::{AutolockConfig, PinConfig};
pub use error::{StorageError, StorageResult};
pub use registry::{AnyRegistryStore, FileRegistryStore, MemoryRegistryStore, RegistryStore};
