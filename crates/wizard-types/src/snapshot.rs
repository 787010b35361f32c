//! Persisted snapshots, schema versioning and validation.
//!
//! A snapshot is the pair `{ value, context }`: the current state path and
//! the full journey context. Stored records additionally carry a schema
//! version; records written before versioning exist, so an absent version
//! reads as version 0 and is migrated by identity (the shapes match).
//!
//! Validation is a tagged result, never error control flow: callers match on
//! [`SnapshotValidation`] and treat anything invalid as "no snapshot".

use crate::context::JourneyContext;
use crate::journey::Journey;
use crate::state::StatePath;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Schema version written with every persisted snapshot.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A point-in-time picture of a journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardSnapshot {
	/// Dotted state path, e.g. `catering.otpEntry`.
	pub value: StatePath,
	pub context: JourneyContext,
}

impl WizardSnapshot {
	/// Creates a snapshot from a state path and context.
	pub fn new(value: impl Into<StatePath>, context: JourneyContext) -> Self {
		Self {
			value: value.into(),
			context,
		}
	}
}

/// Wire form of a persisted snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSnapshot {
	/// Absent in records written before versioning; reads as 0.
	#[serde(default)]
	pub version: u32,
	pub value: StatePath,
	pub context: JourneyContext,
}

impl StoredSnapshot {
	/// Wraps a snapshot at the current schema version for writing.
	pub fn latest(snapshot: &WizardSnapshot) -> Self {
		Self {
			version: SNAPSHOT_VERSION,
			value: snapshot.value.clone(),
			context: snapshot.context.clone(),
		}
	}
}

/// Why a persisted snapshot was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum InvalidSnapshot {
	/// The payload was not JSON, or not the expected shape.
	Malformed(String),
	/// A required top-level field was absent.
	MissingField(&'static str),
	/// The record was written by a newer schema than this build understands.
	UnsupportedVersion(u32),
	/// The record belongs to a different journey than the one loading it.
	JourneyMismatch { expected: Journey, found: Journey },
}

impl fmt::Display for InvalidSnapshot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			InvalidSnapshot::Malformed(reason) => write!(f, "malformed snapshot: {}", reason),
			InvalidSnapshot::MissingField(field) => write!(f, "missing field: {}", field),
			InvalidSnapshot::UnsupportedVersion(version) => {
				write!(f, "unsupported snapshot version: {}", version)
			}
			InvalidSnapshot::JourneyMismatch { expected, found } => {
				write!(f, "journey mismatch: expected {}, found {}", expected, found)
			}
		}
	}
}

/// Outcome of validating a persisted payload.
#[derive(Debug)]
pub enum SnapshotValidation {
	Valid(WizardSnapshot),
	Invalid(InvalidSnapshot),
}

/// Validates raw persisted bytes into a usable snapshot for `journey`.
///
/// Absent-version records are accepted as version 0; versions newer than
/// [`SNAPSHOT_VERSION`] are rejected so an old build never misreads a new
/// record.
pub fn validate_snapshot_bytes(bytes: &[u8], journey: Journey) -> SnapshotValidation {
	let raw: serde_json::Value = match serde_json::from_slice(bytes) {
		Ok(value) => value,
		Err(e) => return SnapshotValidation::Invalid(InvalidSnapshot::Malformed(e.to_string())),
	};

	let Some(record) = raw.as_object() else {
		return SnapshotValidation::Invalid(InvalidSnapshot::Malformed(
			"not a JSON object".to_string(),
		));
	};
	if !record.contains_key("value") {
		return SnapshotValidation::Invalid(InvalidSnapshot::MissingField("value"));
	}
	if !record.contains_key("context") {
		return SnapshotValidation::Invalid(InvalidSnapshot::MissingField("context"));
	}

	let version = match record.get("version") {
		None => 0,
		Some(v) => match v.as_u64() {
			Some(n) if n <= SNAPSHOT_VERSION as u64 => n as u32,
			Some(n) => {
				return SnapshotValidation::Invalid(InvalidSnapshot::UnsupportedVersion(
					n.min(u32::MAX as u64) as u32,
				))
			}
			None => {
				return SnapshotValidation::Invalid(InvalidSnapshot::Malformed(
					"version is not an integer".to_string(),
				))
			}
		},
	};
	// Versions 0 and 1 share a shape; deserializing is the migration.
	let _ = version;

	let stored: StoredSnapshot = match serde_json::from_value(raw) {
		Ok(stored) => stored,
		Err(e) => return SnapshotValidation::Invalid(InvalidSnapshot::Malformed(e.to_string())),
	};

	if stored.value.as_str().is_empty() {
		return SnapshotValidation::Invalid(InvalidSnapshot::Malformed(
			"empty state value".to_string(),
		));
	}
	if stored.context.journey != journey {
		return SnapshotValidation::Invalid(InvalidSnapshot::JourneyMismatch {
			expected: journey,
			found: stored.context.journey,
		});
	}

	SnapshotValidation::Valid(WizardSnapshot {
		value: stored.value,
		context: stored.context,
	})
}
