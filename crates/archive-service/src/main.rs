//! Main entry point for the archive request service.
//!
//! Serves the digitisation request API: customers submit archive items for
//! digitisation, follow their requests through review, quoting and payment,
//! and cancel or resubmit them. Requests live on the commerce platform as
//! tagged draft orders.

use archive_auth::{CustomerSession, HttpCustomerApi, HttpTokenEndpoint, StorageTokenStore};
use archive_config::Config;
use archive_core::{EngineBuilder, RequestEngine};
use archive_storage::{StorageError, StorageInterface, StorageService};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod apis;
mod server;

use archive_commerce::implementations::memory::create_commerce as create_memory_commerce;
use archive_commerce::implementations::shopify::create_commerce as create_shopify_commerce;
use archive_storage::implementations::file::create_storage as create_file_storage;
use archive_storage::implementations::memory::create_storage as create_memory_storage;

/// Command-line arguments for the archive request service.
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

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started archive request service");

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let engine = Arc::new(build_engine(config.clone())?);
	let storage = Arc::new(build_storage(&config)?);
	spawn_storage_cleanup(Arc::clone(&storage), config.storage.cleanup_interval_seconds);
	let session = build_session(&config, storage)?;

	let Some(api_config) = config.api.clone().filter(|api| api.enabled) else {
		tracing::warn!("API server is disabled; nothing to serve");
		return Ok(());
	};

	let state = server::AppState {
		engine,
		config,
		session,
	};
	server::start_server(api_config, state).await?;

	tracing::info!("Stopped archive request service");
	Ok(())
}

/// Macro to create a factory HashMap with the appropriate type aliases
macro_rules! create_factory_map {
    ($interface:path, $error:path, $( $name:literal => $factory:expr ),* $(,)?) => {{
        let mut factories = std::collections::HashMap::new();
        $(
            factories.insert(
                $name.to_string(),
                $factory as fn(&toml::Value) -> Result<Box<dyn $interface>, $error>
            );
        )*
        factories
    }};
}

/// Builds the request engine with the configured commerce platform.
fn build_engine(config: Config) -> Result<RequestEngine, Box<dyn std::error::Error>> {
	let commerce_factories = create_factory_map!(
		archive_commerce::CommerceInterface,
		archive_commerce::CommerceError,
		"shopify" => create_shopify_commerce,
		"memory" => create_memory_commerce,
	);

	Ok(EngineBuilder::new(config).build(commerce_factories)?)
}

/// Builds the primary storage backend.
fn build_storage(config: &Config) -> Result<StorageService, Box<dyn std::error::Error>> {
	let storage_factories = create_factory_map!(
		StorageInterface,
		StorageError,
		"file" => create_file_storage,
		"memory" => create_memory_storage,
	);

	let primary = &config.storage.primary;
	let settings = config
		.storage
		.implementations
		.get(primary)
		.ok_or_else(|| format!("Primary storage '{}' is not configured", primary))?;
	let factory = storage_factories
		.get(primary)
		.ok_or_else(|| format!("Unknown storage implementation '{}'", primary))?;

	let backend = factory(settings)?;
	tracing::info!(component = "storage", implementation = %primary, enabled = true, "Loaded");
	Ok(StorageService::new(backend))
}

/// Periodically removes expired login sessions and tokens.
fn spawn_storage_cleanup(storage: Arc<StorageService>, interval_seconds: u64) {
	tokio::spawn(async move {
		let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds.max(1)));
		loop {
			interval.tick().await;
			match storage.cleanup_expired().await {
				Ok(0) => {}
				Ok(count) => {
					tracing::debug!(removed = count, "Cleaned up expired storage entries");
				}
				Err(e) => {
					tracing::warn!(error = %e, "Storage cleanup failed");
				}
			}
		}
	});
}

/// Builds the customer login session when `[auth]` is configured.
fn build_session(
	config: &Config,
	storage: Arc<StorageService>,
) -> Result<Option<Arc<CustomerSession>>, Box<dyn std::error::Error>> {
	let Some(settings) = config.auth.clone() else {
		tracing::info!(component = "auth", "Customer accounts disabled");
		return Ok(None);
	};

	let endpoint =
		HttpTokenEndpoint::new(CustomerSession::token_url(&settings), store_origin(config))?;
	let customer_api =
		HttpCustomerApi::new(HttpCustomerApi::graphql_url(&settings), store_origin(config))?;
	let tokens = Arc::new(StorageTokenStore::new(Arc::clone(&storage)));
	let session = CustomerSession::new(
		settings,
		tokens,
		storage,
		Arc::new(endpoint),
		Arc::new(customer_api),
	);
	tracing::info!(component = "auth", "Customer accounts enabled");
	Ok(Some(Arc::new(session)))
}

/// `https://<store_domain>` of the configured store, if any.
fn store_origin(config: &Config) -> Option<String> {
	config
		.commerce
		.implementations
		.get("shopify")
		.and_then(|settings| settings.get("store_domain"))
		.and_then(|domain| domain.as_str())
		.map(|domain| format!("https://{}", domain.trim().trim_end_matches('/')))
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	const CONFIG: &str = r#"
[service]
id = "archive-test"

[commerce]
primary = "memory"

[commerce.implementations.memory]

[storage]
primary = "memory"
cleanup_interval_seconds = 60

[storage.implementations.memory]

[api]
enabled = true
port = 0
"#;

	#[test]
	fn test_args_defaults() {
		let args = Args::parse_from(["archive"]);
		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");

		let args = Args::parse_from(["archive", "-c", "prod.toml", "-l", "debug"]);
		assert_eq!(args.config, PathBuf::from("prod.toml"));
		assert_eq!(args.log_level, "debug");
	}

	#[test]
	fn test_factory_map_contains_both_storage_backends() {
		let factories = create_factory_map!(
			StorageInterface,
			StorageError,
			"file" => create_file_storage,
			"memory" => create_memory_storage,
		);
		assert_eq!(factories.len(), 2);
		assert!(factories.contains_key("file"));
		assert!(factories.contains_key("memory"));
	}

	#[tokio::test]
	async fn test_builds_from_config_file() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("config.toml");
		std::fs::write(&path, CONFIG).unwrap();

		let config = Config::from_file(path.to_str().unwrap()).await.unwrap();
		let engine = build_engine(config.clone()).unwrap();
		assert_eq!(engine.config().service.id, "archive-test");

		let storage = Arc::new(build_storage(&config).unwrap());
		assert!(build_session(&config, storage).unwrap().is_none());
	}

	#[test]
	fn test_unknown_storage_is_rejected() {
		let mut config = Config::in_memory();
		config.storage.primary = "redis".to_string();
		config
			.storage
			.implementations
			.insert("redis".to_string(), toml::Value::Table(Default::default()));
		assert!(build_storage(&config).is_err());
	}

	#[test]
	fn test_store_origin() {
		let mut config = Config::in_memory();
		assert_eq!(store_origin(&config), None);

		let shopify = toml::Value::Table(
			toml::from_str("store_domain = \"archive.myshopify.com\"\naccess_token = \"shpat_x\"")
				.unwrap(),
		);
		config
			.commerce
			.implementations
			.insert("shopify".to_string(), shopify);
		assert_eq!(
			store_origin(&config).as_deref(),
			Some("https://archive.myshopify.com")
		);
	}
}
