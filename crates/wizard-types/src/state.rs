//! Dotted state path identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a single machine state by its dotted path, e.g.
/// `catering.otpEntry`. Paths are opaque to the persistence layer; the
/// machine definition decides whether a path is a known state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatePath(String);

impl StatePath {
	/// Creates a path from any string-like value.
	pub fn new(path: impl Into<String>) -> Self {
		StatePath(path.into())
	}

	/// Returns the path as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for StatePath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for StatePath {
	fn from(path: &str) -> Self {
		StatePath(path.to_string())
	}
}

impl From<String> for StatePath {
	fn from(path: String) -> Self {
		StatePath(path)
	}
}

impl PartialEq<str> for StatePath {
	fn eq(&self, other: &str) -> bool {
		self.0 == other
	}
}

impl PartialEq<&str> for StatePath {
	fn eq(&self, other: &&str) -> bool {
		self.0 == *other
	}
}
