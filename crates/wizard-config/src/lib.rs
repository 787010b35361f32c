//! Configuration module for the wizard engine.
//!
//! This module provides structures and utilities for managing wizard
//! configuration. It supports loading configuration from TOML files, resolving
//! `${VAR}` and `${VAR:-default}` environment variable references, and
//! validates the result so an unusable configuration never reaches the
//! running service.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use thiserror::Error;
use wizard_types::Journey;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Main configuration structure for the wizard engine.
///
/// This structure contains all configuration sections required for the
/// engine to operate: instance identity and journey selection, snapshot
/// storage, the commerce backend, and the optional HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Configuration specific to the wizard instance.
	pub wizard: WizardConfig,
	/// Configuration for snapshot storage.
	pub storage: StorageConfig,
	/// Configuration for the commerce backend.
	pub backend: BackendConfig,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Configuration specific to the wizard instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WizardConfig {
	/// Unique identifier for this wizard instance.
	pub id: String,
	/// Journeys this instance hosts. Each journey gets its own worker
	/// and its own storage slot.
	pub journeys: Vec<Journey>,
	/// Timeout in seconds for a single backend operation.
	/// Defaults to 30 seconds if not specified.
	#[serde(default = "default_invoke_timeout_seconds")]
	pub invoke_timeout_seconds: u64,
}

/// Returns the default backend operation timeout in seconds.
///
/// This provides a default value of 30 seconds for backend operations
/// when no explicit timeout is configured.
fn default_invoke_timeout_seconds() -> u64 {
	30
}

/// Configuration for snapshot storage.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the commerce backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of backend implementation names to their configurations.
	/// Each implementation has its own configuration format stored as raw TOML values.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Request timeout in seconds.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
	/// Maximum request size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
}

/// Returns the default API host.
///
/// This provides a default host address of 127.0.0.1 (localhost) for the API server
/// when no explicit host is configured.
fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

/// Returns the default API port.
///
/// This provides a default port of 3000 for the API server
/// when no explicit port is configured.
fn default_api_port() -> u16 {
	3000
}

/// Returns the default API timeout in seconds.
///
/// This provides a default timeout of 30 seconds for API requests
/// when no explicit timeout is configured.
fn default_api_timeout() -> u64 {
	30
}

/// Returns the default maximum request size in bytes.
///
/// This provides a default maximum request size of 1MB (1024 * 1024 bytes)
/// when no explicit limit is configured.
fn default_max_request_size() -> usize {
	1024 * 1024 // 1MB
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	// Limit input size to prevent ReDoS attacks
	const MAX_INPUT_SIZE: usize = 1024 * 1024; // 1MB
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let full_match = cap.get(0).unwrap();
		let var_name = cap.get(1).unwrap().as_str();
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name) {
			Ok(v) => v,
			Err(_) => {
				if let Some(default) = default_value {
					default.to_string()
				} else {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name
					)));
				}
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply replacements in reverse order to maintain positions
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a file with environment variable resolution.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let contents = tokio::fs::read_to_string(path).await?;
		contents.parse()
	}

	/// Validates the configuration to ensure all required fields are properly set.
	///
	/// This method performs validation across all configuration sections:
	/// - Ensures the wizard ID is not empty
	/// - Ensures at least one journey is enabled, with no duplicates
	/// - Checks the invoke timeout is within a usable range
	/// - Verifies the primary storage and backend implementations are configured
	fn validate(&self) -> Result<(), ConfigError> {
		// Validate wizard config
		if self.wizard.id.is_empty() {
			return Err(ConfigError::Validation("Wizard ID cannot be empty".into()));
		}
		if self.wizard.journeys.is_empty() {
			return Err(ConfigError::Validation(
				"At least one journey must be enabled".into(),
			));
		}
		let mut seen = HashSet::new();
		for journey in &self.wizard.journeys {
			if !seen.insert(journey) {
				return Err(ConfigError::Validation(format!(
					"Journey '{}' is listed more than once",
					journey
				)));
			}
		}
		if self.wizard.invoke_timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"Invoke timeout must be greater than zero".into(),
			));
		}
		if self.wizard.invoke_timeout_seconds > 300 {
			return Err(ConfigError::Validation(format!(
				"Invoke timeout of {} seconds is too long (max: 300)",
				self.wizard.invoke_timeout_seconds
			)));
		}

		// Validate storage config
		if self.storage.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Storage primary cannot be empty".into(),
			));
		}
		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage implementation '{}' not found in implementations",
				self.storage.primary
			)));
		}

		// Validate backend config
		if self.backend.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Backend primary cannot be empty".into(),
			));
		}
		if !self
			.backend
			.implementations
			.contains_key(&self.backend.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary backend implementation '{}' not found in implementations",
				self.backend.primary
			)));
		}

		Ok(())
	}
}

/// Implementation of FromStr trait for Config to enable parsing from string.
///
/// This allows configuration to be parsed from TOML strings using the standard
/// string parsing interface. Environment variables are resolved and the
/// configuration is automatically validated after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	const VALID_CONFIG: &str = r#"
[wizard]
id = "demo"
journeys = ["catering", "subscription", "events"]
invoke_timeout_seconds = 30

[storage]
primary = "memory"
[storage.implementations.memory]

[backend]
primary = "mock"
[backend.implementations.mock]
delay_ms = 0

[api]
enabled = true
port = 8080
"#;

	#[test]
	fn test_env_var_resolution() {
		// Set up test environment variables
		std::env::set_var("WIZARD_TEST_HOST", "localhost");
		std::env::set_var("WIZARD_TEST_PORT", "5432");

		let input = "host = \"${WIZARD_TEST_HOST}:${WIZARD_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "host = \"localhost:5432\"");

		// Clean up
		std::env::remove_var("WIZARD_TEST_HOST");
		std::env::remove_var("WIZARD_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${WIZARD_MISSING_VAR:-default_value}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"default_value\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${WIZARD_MISSING_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.is_err());
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("WIZARD_MISSING_VAR"));
	}

	#[test]
	fn test_full_config_parses() {
		let config: Config = VALID_CONFIG.parse().unwrap();

		assert_eq!(config.wizard.id, "demo");
		assert_eq!(config.wizard.journeys.len(), 3);
		assert_eq!(config.wizard.invoke_timeout_seconds, 30);
		assert_eq!(config.storage.primary, "memory");
		assert_eq!(config.backend.primary, "mock");

		let api = config.api.unwrap();
		assert!(api.enabled);
		assert_eq!(api.host, "127.0.0.1");
		assert_eq!(api.port, 8080);
		assert_eq!(api.timeout_seconds, 30);
	}

	#[test]
	fn test_config_with_env_vars() {
		// Set environment variable
		std::env::set_var("WIZARD_TEST_ID", "test-wizard");

		let config_str = r#"
[wizard]
id = "${WIZARD_TEST_ID}"
journeys = ["catering"]

[storage]
primary = "${WIZARD_TEST_STORAGE:-memory}"
[storage.implementations.memory]

[backend]
primary = "mock"
[backend.implementations.mock]
"#;

		let config: Config = config_str.parse().unwrap();
		assert_eq!(config.wizard.id, "test-wizard");
		assert_eq!(config.storage.primary, "memory");
		assert_eq!(config.wizard.invoke_timeout_seconds, 30);
		assert!(config.api.is_none());

		// Clean up
		std::env::remove_var("WIZARD_TEST_ID");
	}

	#[test]
	fn test_unknown_journey_rejected() {
		let config_str = VALID_CONFIG.replace("\"events\"", "\"florist\"");
		let result: Result<Config, ConfigError> = config_str.parse();
		assert!(matches!(result, Err(ConfigError::Parse(_))));
	}

	#[test]
	fn test_empty_journeys_rejected() {
		let config_str =
			VALID_CONFIG.replace("[\"catering\", \"subscription\", \"events\"]", "[]");
		let result: Result<Config, ConfigError> = config_str.parse();
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_duplicate_journeys_rejected() {
		let config_str = VALID_CONFIG.replace("\"subscription\"", "\"catering\"");
		let result: Result<Config, ConfigError> = config_str.parse();
		let err = result.unwrap_err().to_string();
		assert!(err.contains("more than once"), "unexpected error: {}", err);
	}

	#[test]
	fn test_zero_invoke_timeout_rejected() {
		let config_str = VALID_CONFIG.replace(
			"invoke_timeout_seconds = 30",
			"invoke_timeout_seconds = 0",
		);
		let result: Result<Config, ConfigError> = config_str.parse();
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_unknown_primary_storage_rejected() {
		let config_str = VALID_CONFIG.replace("primary = \"memory\"", "primary = \"redis\"");
		let result: Result<Config, ConfigError> = config_str.parse();
		let err = result.unwrap_err().to_string();
		assert!(err.contains("redis"), "unexpected error: {}", err);
	}

	#[test]
	fn test_unknown_primary_backend_rejected() {
		let config_str = VALID_CONFIG.replace("primary = \"mock\"", "primary = \"http\"");
		let result: Result<Config, ConfigError> = config_str.parse();
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}

	#[tokio::test]
	async fn test_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(VALID_CONFIG.as_bytes()).unwrap();

		let path = file.path().to_str().unwrap().to_string();
		let config = Config::from_file(&path).await.unwrap();
		assert_eq!(config.wizard.id, "demo");
	}

	#[tokio::test]
	async fn test_from_file_missing() {
		let result = Config::from_file("/nonexistent/wizard.toml").await;
		assert!(matches!(result, Err(ConfigError::Io(_))));
	}
}
