//! Local key-value persistence port.
//!
//! Stores persist a handful of string entries (token pair, cart contents)
//! through this port rather than touching the filesystem themselves, so any
//! backing can be injected: [`FileStore`] for the real console,
//! [`MemoryStore`] for tests.

mod file;
mod memory;

use std::sync::Arc;

use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Persisted entry names.
pub mod keys {
    /// Bearer token for authenticated requests.
    pub const ACCESS_TOKEN: &str = "access_token";
    /// Token used to mint a replacement access token.
    pub const REFRESH_TOKEN: &str = "refresh_token";
    /// Serialized cart line list.
    pub const CART: &str = "cart";
}

/// Errors from the persistence port.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file could not be serialized.
    #[error("Storage serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// String key-value storage with durable writes.
///
/// All operations are synchronous; entries are tiny and writes are rare
/// (after a store mutation), so blocking I/O is acceptable at the call
/// sites.
pub trait KvStore: Send + Sync {
    /// Read an entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write an entry, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove an entry. Removing an absent entry is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Remove every entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn clear(&self) -> Result<(), StorageError>;
}

/// Shared handle to an injected store.
pub type SharedKv = Arc<dyn KvStore>;
