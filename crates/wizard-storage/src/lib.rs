//! Storage module for the wizard engine.
//!
//! This crate provides the key-value storage abstraction the persistence
//! adapter sits on. Backends implement [`StorageInterface`] over raw bytes;
//! the [`SnapshotStore`] adapter layers snapshot validation, versioning and
//! the save/load/purge semantics of the wizard on top.

use async_trait::async_trait;
use thiserror::Error;

/// Snapshot persistence adapter.
pub mod snapshot_store;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

pub use snapshot_store::SnapshotStore;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// The requested key does not exist.
	#[error("Not found")]
	NotFound,
	/// Error serializing or deserializing data.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error from the underlying storage backend.
	#[error("Storage backend error: {0}")]
	Backend(String),
	/// Invalid backend configuration.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for raw key-value storage backends.
///
/// Implementations store opaque byte payloads under string keys. Keys are
/// namespaced by the caller (`namespace:id`); backends treat them as flat
/// strings.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves the bytes stored under a key.
	///
	/// Returns [`StorageError::NotFound`] when the key has never been
	/// written or has been deleted.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores bytes under a key, replacing any existing value.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Deletes the value under a key.
	///
	/// Deleting an absent key succeeds, so callers can purge without
	/// checking existence first.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Whether a key currently holds a value.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;
}

/// Type alias for storage factory functions.
///
/// Each backend exposes a factory that builds it from its TOML
/// configuration table.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;
