//! Snapshot persistence adapter.
//!
//! One [`SnapshotStore`] per journey, bound to that journey's fixed storage
//! key. The adapter is deliberately forgiving in both directions: a failed
//! save is logged and swallowed so the wizard continues in memory, and an
//! unreadable record loads as "no snapshot" rather than an error. Only the
//! owning flow controller writes a journey's key.

use crate::{StorageError, StorageInterface};
use std::sync::Arc;
use wizard_types::{
	validate_snapshot_bytes, Journey, PersistenceDirective, SettledTransition, SnapshotValidation,
	StoredSnapshot, WizardSnapshot,
};

/// Persists and restores one journey's snapshot.
pub struct SnapshotStore {
	storage: Arc<dyn StorageInterface>,
	journey: Journey,
	key: String,
}

impl SnapshotStore {
	/// Creates the adapter for a journey over the given backend.
	pub fn new(storage: Arc<dyn StorageInterface>, journey: Journey) -> Self {
		Self {
			key: format!("snapshots:{}", journey.as_str()),
			storage,
			journey,
		}
	}

	/// The journey this store belongs to.
	pub fn journey(&self) -> Journey {
		self.journey
	}

	/// Saves a snapshot at the current schema version.
	///
	/// Best effort: serialization or backend failures are logged at `warn`
	/// and reported as `false`, never raised. The journey keeps running with
	/// in-memory state only.
	pub async fn save(&self, snapshot: &WizardSnapshot) -> bool {
		let bytes = match serde_json::to_vec(&StoredSnapshot::latest(snapshot)) {
			Ok(bytes) => bytes,
			Err(e) => {
				tracing::warn!(
					journey = %self.journey,
					error = %e,
					"Failed to serialize snapshot; continuing without persistence"
				);
				return false;
			}
		};

		match self.storage.set_bytes(&self.key, bytes).await {
			Ok(()) => {
				tracing::debug!(journey = %self.journey, state = %snapshot.value, "Persisted snapshot");
				true
			}
			Err(e) => {
				tracing::warn!(
					journey = %self.journey,
					error = %e,
					"Failed to persist snapshot; continuing without persistence"
				);
				false
			}
		}
	}

	/// Loads the persisted snapshot, if a usable one exists.
	///
	/// Absence, unreadable payloads, unsupported versions and records for a
	/// different journey all come back as `None`; invalid payloads are
	/// logged with the validation reason before being discarded.
	pub async fn load(&self) -> Option<WizardSnapshot> {
		let bytes = match self.storage.get_bytes(&self.key).await {
			Ok(bytes) => bytes,
			Err(StorageError::NotFound) => return None,
			Err(e) => {
				tracing::warn!(journey = %self.journey, error = %e, "Snapshot read failed; starting fresh");
				return None;
			}
		};

		match validate_snapshot_bytes(&bytes, self.journey) {
			SnapshotValidation::Valid(snapshot) => Some(snapshot),
			SnapshotValidation::Invalid(reason) => {
				tracing::warn!(
					journey = %self.journey,
					%reason,
					"Discarding invalid persisted snapshot"
				);
				None
			}
		}
	}

	/// Removes the persisted snapshot. Idempotent: purging an absent record
	/// succeeds.
	pub async fn purge(&self) -> bool {
		match self.storage.delete(&self.key).await {
			Ok(()) => {
				tracing::debug!(journey = %self.journey, "Purged snapshot");
				true
			}
			Err(e) => {
				tracing::warn!(journey = %self.journey, error = %e, "Snapshot purge failed");
				false
			}
		}
	}

	/// Applies a settled transition's persistence directive.
	pub async fn apply(&self, settled: &SettledTransition) -> bool {
		match settled.directive {
			PersistenceDirective::Persist => self.save(&settled.snapshot).await,
			PersistenceDirective::Purge => self.purge().await,
		}
	}
}
