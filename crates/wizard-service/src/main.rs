//! Main entry point for the wizard service.
//!
//! This binary hosts the configured purchase journeys: it wires storage and
//! backend implementations to the journey workers and, when enabled, exposes
//! them over an HTTP API. Implementations are pluggable and selected by name
//! from the configuration file.

use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use wizard_backend::{BackendFactory, BackendService};
use wizard_config::Config;
use wizard_core::WizardHost;
use wizard_storage::{StorageFactory, StorageInterface};

mod server;

// Import implementations from individual crates
use wizard_backend::implementations::http::create_backend as create_http_backend;
use wizard_backend::implementations::mock::create_backend as create_mock_backend;
use wizard_storage::implementations::file::create_storage as create_file_storage;
use wizard_storage::implementations::memory::create_storage as create_memory_storage;

/// Command-line arguments for the wizard service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the wizard service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Starts a worker per configured journey
/// 5. Serves the API (if enabled) until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	// Create env filter with default from args
	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started wizard");

	// Load configuration
	let config = Config::from_file(args.config.to_str().unwrap()).await?;
	tracing::info!("Loaded configuration [{}]", config.wizard.id);

	// Start the journey workers with the configured implementations
	let host = build_host(&config).await?;
	let host = Arc::new(host);

	// Check if API server should be started
	let api_enabled = config.api.as_ref().is_some_and(|api| api.enabled);

	if api_enabled {
		let api_config = config.api.as_ref().unwrap().clone();
		let api_host = Arc::clone(&host);

		// Serve the API until it stops or the process is interrupted
		tokio::select! {
			result = server::start_server(api_config, api_host) => {
				tracing::info!("API server finished");
				result?;
			}
			_ = tokio::signal::ctrl_c() => {
				tracing::info!("Shutdown signal received");
			}
		}
	} else {
		// Headless mode: keep the journeys running until interrupted
		tracing::info!("API disabled, running journeys only");
		tokio::signal::ctrl_c().await?;
		tracing::info!("Shutdown signal received");
	}

	host.shutdown().await;
	tracing::info!("Stopped wizard");
	Ok(())
}

/// Builds the journey host with the configured implementations.
///
/// Storage and backend implementations are looked up by name in factory
/// registries, so a configuration typo fails here rather than deep inside
/// a running journey.
async fn build_host(config: &Config) -> Result<WizardHost, Box<dyn std::error::Error>> {
	let storage_factories: HashMap<&str, StorageFactory> = HashMap::from([
		("file", create_file_storage as StorageFactory),
		("memory", create_memory_storage as StorageFactory),
	]);

	let backend_factories: HashMap<&str, BackendFactory> = HashMap::from([
		("http", create_http_backend as BackendFactory),
		("mock", create_mock_backend as BackendFactory),
	]);

	let storage_factory = storage_factories
		.get(config.storage.primary.as_str())
		.ok_or_else(|| format!("Unknown storage implementation '{}'", config.storage.primary))?;
	let storage_config = config
		.storage
		.implementations
		.get(&config.storage.primary)
		.ok_or_else(|| {
			format!(
				"Storage implementation '{}' has no configuration",
				config.storage.primary
			)
		})?;
	let storage: Arc<dyn StorageInterface> = Arc::from(storage_factory(storage_config)?);
	tracing::info!("Loaded storage implementation: {}", config.storage.primary);

	let backend_factory = backend_factories
		.get(config.backend.primary.as_str())
		.ok_or_else(|| format!("Unknown backend implementation '{}'", config.backend.primary))?;
	let backend_config = config
		.backend
		.implementations
		.get(&config.backend.primary)
		.ok_or_else(|| {
			format!(
				"Backend implementation '{}' has no configuration",
				config.backend.primary
			)
		})?;
	let backend = Arc::new(BackendService::new(backend_factory(backend_config)?));
	tracing::info!("Loaded backend implementation: {}", config.backend.primary);

	let invoke_timeout = Duration::from_secs(config.wizard.invoke_timeout_seconds);
	let host = WizardHost::start(&config.wizard.journeys, storage, backend, invoke_timeout).await?;
	tracing::info!(journeys = config.wizard.journeys.len(), "Journeys running");

	Ok(host)
}

#[cfg(test)]
mod tests {
	use super::*;
	use wizard_config::{BackendConfig, StorageConfig, WizardConfig};
	use wizard_types::Journey;

	/// Creates a minimal test configuration for unit testing
	fn create_test_config() -> Config {
		Config {
			wizard: WizardConfig {
				id: "test-wizard".to_string(),
				journeys: vec![Journey::Catering, Journey::Events],
				invoke_timeout_seconds: 5,
			},
			storage: StorageConfig {
				primary: "memory".to_string(),
				implementations: HashMap::from([(
					"memory".to_string(),
					toml::Value::Table(toml::map::Map::new()),
				)]),
			},
			backend: BackendConfig {
				primary: "mock".to_string(),
				implementations: HashMap::from([(
					"mock".to_string(),
					toml::Value::Table(toml::map::Map::new()),
				)]),
			},
			api: None,
		}
	}

	#[test]
	fn test_args_default_values() {
		let args = Args {
			config: PathBuf::from("config.toml"),
			log_level: "info".to_string(),
		};

		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");
	}

	#[test]
	fn test_factory_registries() {
		let storage_factories: HashMap<&str, StorageFactory> = HashMap::from([
			("file", create_file_storage as StorageFactory),
			("memory", create_memory_storage as StorageFactory),
		]);
		let backend_factories: HashMap<&str, BackendFactory> = HashMap::from([
			("http", create_http_backend as BackendFactory),
			("mock", create_mock_backend as BackendFactory),
		]);

		assert!(storage_factories.contains_key("memory"));
		assert!(storage_factories.contains_key("file"));
		assert!(backend_factories.contains_key("mock"));
		assert!(backend_factories.contains_key("http"));
	}

	#[tokio::test]
	async fn test_build_host_with_minimal_config() {
		let config = create_test_config();

		let host = build_host(&config).await.unwrap();

		assert!(host.controller(Journey::Catering).is_some());
		assert!(host.controller(Journey::Events).is_some());
		assert!(host.controller(Journey::Subscription).is_none());

		host.shutdown().await;
	}

	#[tokio::test]
	async fn test_config_file_builds_a_running_host() {
		use std::io::Write;

		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(
			file,
			r#"
			[wizard]
			id = "wizard-test"
			journeys = ["subscription"]

			[storage]
			primary = "memory"
			[storage.implementations.memory]

			[backend]
			primary = "mock"
			[backend.implementations.mock]
			"#
		)
		.unwrap();

		let config = Config::from_file(file.path().to_str().unwrap()).await.unwrap();
		let host = build_host(&config).await.unwrap();

		assert!(host.controller(Journey::Subscription).is_some());
		assert!(host.controller(Journey::Catering).is_none());
		host.shutdown().await;
	}

	#[tokio::test]
	async fn test_build_host_rejects_unknown_storage() {
		let mut config = create_test_config();
		config.storage.primary = "redis".to_string();
		config.storage.implementations.insert(
			"redis".to_string(),
			toml::Value::Table(toml::map::Map::new()),
		);

		let result = build_host(&config).await;
		assert!(result.is_err());
		assert!(result.unwrap_err().to_string().contains("redis"));
	}

	#[tokio::test]
	async fn test_build_host_requires_implementation_config() {
		let mut config = create_test_config();
		config.backend.implementations.clear();

		let result = build_host(&config).await;
		assert!(result.is_err());
	}
}
