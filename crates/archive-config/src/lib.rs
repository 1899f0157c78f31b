//! Configuration module for the digitisation request service.
//!
//! Configuration is loaded from TOML. `${VAR}` and `${VAR:-default}`
//! references are resolved from the environment before parsing, so
//! credentials such as the admin access token never need to live in the file.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["commerce.toml", "auth.toml"]` to include other files
//! - Each top-level section must be unique across all files

mod loader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the echoed input.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this service instance.
	pub service: ServiceConfig,
	/// Commerce platform backends.
	pub commerce: CommerceConfig,
	/// Digitisation request behaviour.
	#[serde(default)]
	pub requests: RequestsConfig,
	/// Key/value storage for tokens and login sessions.
	pub storage: StorageConfig,
	/// Customer account login, if enabled.
	pub auth: Option<AuthConfig>,
	/// HTTP API server.
	pub api: Option<ApiConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	pub id: String,
}

/// Commerce platform backends.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommerceConfig {
	/// Which implementation is the system of record.
	pub primary: String,
	/// Raw TOML table per implementation name, validated by the implementation.
	pub implementations: HashMap<String, toml::Value>,
}

/// Settings for the request workflows.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RequestsConfig {
	/// Tag marking a draft order as a digitisation request.
	#[serde(default = "default_request_tag")]
	pub tag: String,
	/// How many open drafts to scan when looking for one to bundle into.
	#[serde(default = "default_bundle_search_limit")]
	pub bundle_search_limit: u32,
	/// How many drafts to fetch when listing a customer's requests.
	#[serde(default = "default_list_limit")]
	pub list_limit: u32,
	/// Line items fetched per draft when listing.
	#[serde(default = "default_line_items_limit")]
	pub line_items_limit: u32,
	/// How many past orders to fetch for order history.
	#[serde(default = "default_order_history_limit")]
	pub order_history_limit: u32,
}

impl Default for RequestsConfig {
	fn default() -> Self {
		Self {
			tag: default_request_tag(),
			bundle_search_limit: default_bundle_search_limit(),
			list_limit: default_list_limit(),
			line_items_limit: default_line_items_limit(),
			order_history_limit: default_order_history_limit(),
		}
	}
}

fn default_request_tag() -> String {
	"digitisation-request".to_string()
}

fn default_bundle_search_limit() -> u32 {
	10
}

fn default_list_limit() -> u32 {
	100
}

fn default_line_items_limit() -> u32 {
	20
}

fn default_order_history_limit() -> u32 {
	20
}

/// Upper bound the platform accepts for `first:` in connection queries.
const MAX_PAGE_SIZE: u32 = 250;

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	pub primary: String,
	pub implementations: HashMap<String, toml::Value>,
	/// Interval in seconds for cleaning up expired storage entries.
	pub cleanup_interval_seconds: u64,
}

/// Customer account (OAuth 2.0 + PKCE) settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
	pub client_id: String,
	pub shop_id: String,
	/// Where the platform redirects after login.
	pub redirect_uri: String,
	#[serde(default = "default_auth_scope")]
	pub scope: String,
	/// Lifetime of a pending PKCE login.
	#[serde(default = "default_session_ttl")]
	pub session_ttl_seconds: u64,
	/// Overrides `https://shopify.com/authentication/<shop_id>`.
	pub authentication_base_url: Option<String>,
}

fn default_auth_scope() -> String {
	"openid email customer-account-api:full".to_string()
}

fn default_session_ttl() -> u64 {
	600
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Request timeout in seconds.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
	/// Maximum request body size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
	pub cors: Option<CorsConfig>,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
	pub allowed_origins: Vec<String>,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

fn default_api_timeout() -> u64 {
	30
}

fn default_max_request_size() -> usize {
	1024 * 1024 // 1MB
}

/// Resolves environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of `VAR_NAME`, or with `default`
/// for `${VAR_NAME:-default}`. Input is limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		result.push_str(&input[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Minimal configuration backed by the in-memory commerce platform and
	/// memory storage.
	#[cfg(any(test, feature = "testing"))]
	pub fn in_memory() -> Self {
		let empty = || toml::Value::Table(toml::map::Map::new());
		Config {
			service: ServiceConfig {
				id: "archive-test".to_string(),
			},
			commerce: CommerceConfig {
				primary: "memory".to_string(),
				implementations: HashMap::from([("memory".to_string(), empty())]),
			},
			requests: RequestsConfig::default(),
			storage: StorageConfig {
				primary: "memory".to_string(),
				implementations: HashMap::from([("memory".to_string(), empty())]),
				cleanup_interval_seconds: 3600,
			},
			auth: None,
			api: None,
		}
	}

	/// Validates cross-section rules that serde cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.trim().is_empty() {
			return Err(ConfigError::Validation("Service ID cannot be empty".into()));
		}

		// Commerce
		if self.commerce.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one commerce implementation must be configured".into(),
			));
		}
		if !self
			.commerce
			.implementations
			.contains_key(&self.commerce.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary commerce '{}' not found in implementations",
				self.commerce.primary
			)));
		}

		// Requests
		if self.requests.tag.trim().is_empty() || self.requests.tag.contains(',') {
			return Err(ConfigError::Validation(
				"Request tag must be a single non-empty tag".into(),
			));
		}
		for (name, value) in [
			("bundle_search_limit", self.requests.bundle_search_limit),
			("list_limit", self.requests.list_limit),
			("line_items_limit", self.requests.line_items_limit),
			("order_history_limit", self.requests.order_history_limit),
		] {
			if value == 0 || value > MAX_PAGE_SIZE {
				return Err(ConfigError::Validation(format!(
					"requests.{} must be between 1 and {}",
					name, MAX_PAGE_SIZE
				)));
			}
		}

		// Storage
		if !self.storage.implementations.contains_key(&self.storage.primary) {
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}
		if self.storage.cleanup_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds must be greater than 0".into(),
			));
		}
		if self.storage.cleanup_interval_seconds > 86400 {
			return Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds cannot exceed 86400 (24 hours)".into(),
			));
		}

		// Auth
		if let Some(auth) = &self.auth {
			if auth.client_id.trim().is_empty() || auth.shop_id.trim().is_empty() {
				return Err(ConfigError::Validation(
					"auth.client_id and auth.shop_id are required when [auth] is present".into(),
				));
			}
			if auth.session_ttl_seconds == 0 {
				return Err(ConfigError::Validation(
					"auth.session_ttl_seconds must be greater than 0".into(),
				));
			}
		}

		Ok(())
	}
}

/// Parses a TOML string, resolving env vars and validating the result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
