//! In-memory storage implementation.
//!
//! Holds all values in a process-local map. Nothing survives a restart, so
//! this backend suits tests and single-session demos; resumable deployments
//! use the file backend.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory storage backed by a shared map.
#[derive(Clone)]
pub struct MemoryStorage {
	store: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
	/// Creates an empty in-memory store.
	pub fn new() -> Self {
		Self {
			store: Arc::new(RwLock::new(HashMap::new())),
		}
	}
}

impl Default for MemoryStorage {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let store = self.store.read().await;
		store.get(key).cloned().ok_or(StorageError::NotFound)
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		store.insert(key.to_string(), value);
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		store.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let store = self.store.read().await;
		Ok(store.contains_key(key))
	}
}

/// Factory function to create a memory storage backend.
///
/// The memory backend takes no configuration; the table is accepted and
/// ignored so all backends share one factory signature.
pub fn create_storage(_config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	Ok(Box::new(MemoryStorage::new()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_basic_operations() {
		let storage = MemoryStorage::new();

		storage
			.set_bytes("snapshots:catering", b"snapshot".to_vec())
			.await
			.unwrap();
		assert_eq!(
			storage.get_bytes("snapshots:catering").await.unwrap(),
			b"snapshot"
		);
		assert!(storage.exists("snapshots:catering").await.unwrap());

		storage.delete("snapshots:catering").await.unwrap();
		assert!(matches!(
			storage.get_bytes("snapshots:catering").await,
			Err(StorageError::NotFound)
		));
	}

	#[tokio::test]
	async fn test_overwrite() {
		let storage = MemoryStorage::new();

		storage
			.set_bytes("snapshots:events", b"first".to_vec())
			.await
			.unwrap();
		storage
			.set_bytes("snapshots:events", b"second".to_vec())
			.await
			.unwrap();

		assert_eq!(
			storage.get_bytes("snapshots:events").await.unwrap(),
			b"second"
		);
	}

	#[tokio::test]
	async fn test_delete_is_idempotent() {
		let storage = MemoryStorage::new();

		storage.delete("snapshots:missing").await.unwrap();
		storage
			.set_bytes("snapshots:missing", b"x".to_vec())
			.await
			.unwrap();
		storage.delete("snapshots:missing").await.unwrap();
		storage.delete("snapshots:missing").await.unwrap();

		assert!(!storage.exists("snapshots:missing").await.unwrap());
	}
}
