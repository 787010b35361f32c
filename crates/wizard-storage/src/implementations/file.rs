//! File-based storage implementation.
//!
//! Stores each key as one JSON file under a configured directory. Writes go
//! through a temporary file followed by a rename, so a crash mid-write
//! leaves the previous value intact rather than a truncated record; the
//! loader's validation handles anything that slips through.
//!
//! Two processes pointed at the same directory race last-writer-wins per
//! key. That mirrors the persistence contract and is not coordinated here.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::fs;

/// Configuration for the file storage backend.
#[derive(Debug, Deserialize)]
struct FileStorageConfig {
	/// Directory that holds one file per key.
	storage_path: String,
}

/// File storage rooted at a base directory.
pub struct FileStorage {
	base_path: PathBuf,
}

impl FileStorage {
	/// Creates the backend, creating the base directory if needed.
	pub fn new(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
		let base_path = base_path.into();
		std::fs::create_dir_all(&base_path).map_err(|e| {
			StorageError::Configuration(format!(
				"cannot create storage directory {}: {}",
				base_path.display(),
				e
			))
		})?;
		Ok(Self { base_path })
	}

	/// Maps a key to its file path. Separator characters are flattened so a
	/// key can never escape the base directory.
	fn file_path(&self, key: &str) -> PathBuf {
		let safe: String = key
			.chars()
			.map(|c| match c {
				'/' | '\\' | ':' => '_',
				c => c,
			})
			.collect();
		self.base_path.join(format!("{}.json", safe))
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		match fs::read(self.file_path(key)).await {
			Ok(bytes) => Ok(bytes),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let path = self.file_path(key);
		let temp_path = path.with_extension("json.tmp");

		fs::write(&temp_path, &value)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		match fs::remove_file(self.file_path(key)).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		fs::try_exists(self.file_path(key))
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: directory for the per-key files
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	let config: FileStorageConfig = config
		.clone()
		.try_into()
		.map_err(|e| StorageError::Configuration(format!("invalid file storage config: {}", e)))?;

	Ok(Box::new(FileStorage::new(config.storage_path)?))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn round_trips_bytes_through_disk() {
		let dir = tempfile::tempdir().unwrap();
		let storage = FileStorage::new(dir.path()).unwrap();

		storage
			.set_bytes("snapshots:catering", b"{\"value\":1}".to_vec())
			.await
			.unwrap();
		assert_eq!(
			storage.get_bytes("snapshots:catering").await.unwrap(),
			b"{\"value\":1}"
		);
	}

	#[tokio::test]
	async fn missing_key_is_not_found() {
		let dir = tempfile::tempdir().unwrap();
		let storage = FileStorage::new(dir.path()).unwrap();

		assert!(matches!(
			storage.get_bytes("snapshots:events").await,
			Err(StorageError::NotFound)
		));
	}

	#[tokio::test]
	async fn delete_is_idempotent() {
		let dir = tempfile::tempdir().unwrap();
		let storage = FileStorage::new(dir.path()).unwrap();

		storage
			.set_bytes("snapshots:events", b"x".to_vec())
			.await
			.unwrap();
		storage.delete("snapshots:events").await.unwrap();
		storage.delete("snapshots:events").await.unwrap();
		assert!(!storage.exists("snapshots:events").await.unwrap());
	}

	#[tokio::test]
	async fn key_separators_stay_inside_the_directory() {
		let dir = tempfile::tempdir().unwrap();
		let storage = FileStorage::new(dir.path()).unwrap();

		storage
			.set_bytes("snapshots:../escape", b"x".to_vec())
			.await
			.unwrap();

		let mut entries = std::fs::read_dir(dir.path()).unwrap();
		let name = entries.next().unwrap().unwrap().file_name();
		assert_eq!(name.to_str().unwrap(), "snapshots_.._escape.json");
		assert!(entries.next().is_none());
	}

	#[tokio::test]
	async fn overwrite_replaces_previous_value() {
		let dir = tempfile::tempdir().unwrap();
		let storage = FileStorage::new(dir.path()).unwrap();

		storage
			.set_bytes("snapshots:subscription", b"first".to_vec())
			.await
			.unwrap();
		storage
			.set_bytes("snapshots:subscription", b"second".to_vec())
			.await
			.unwrap();
		assert_eq!(
			storage.get_bytes("snapshots:subscription").await.unwrap(),
			b"second"
		);
	}
}
