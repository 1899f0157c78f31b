//! Builder for constructing request engines.
//!
//! Commerce implementations are pluggable: the service passes a factory per
//! implementation name and the builder instantiates every configured one,
//! keeping the primary.

use crate::engine::RequestEngine;
use archive_commerce::{CommerceError, CommerceInterface, CommerceService};
use archive_config::Config;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
}

/// Builder for constructing a RequestEngine from configuration.
pub struct EngineBuilder {
	config: Config,
}

impl EngineBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the engine using the commerce factories keyed by
	/// implementation name.
	pub fn build<CF>(
		self,
		commerce_factories: HashMap<String, CF>,
	) -> Result<RequestEngine, BuilderError>
	where
		CF: Fn(&toml::Value) -> Result<Box<dyn CommerceInterface>, CommerceError>,
	{
		let mut commerce_impls = HashMap::new();
		for (name, config) in &self.config.commerce.implementations {
			let Some(factory) = commerce_factories.get(name) else {
				tracing::warn!(
					component = "commerce",
					implementation = %name,
					"No factory registered, skipping"
				);
				continue;
			};
			match factory(config) {
				Ok(implementation) => {
					// Validation already happened in the factory
					commerce_impls.insert(name.clone(), implementation);
					let is_primary = &self.config.commerce.primary == name;
					tracing::info!(component = "commerce", implementation = %name, enabled = %is_primary, "Loaded");
				}
				Err(e) => {
					tracing::error!(
						component = "commerce",
						implementation = %name,
						error = %e,
						"Failed to create commerce implementation"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create commerce implementation '{}': {}",
						name, e
					)));
				}
			}
		}

		let primary = &self.config.commerce.primary;
		let backend = commerce_impls.remove(primary).ok_or_else(|| {
			BuilderError::Config(format!(
				"Primary commerce '{}' failed to load or has invalid configuration",
				primary
			))
		})?;

		let commerce = Arc::new(CommerceService::new(backend));
		Ok(RequestEngine::new(self.config, commerce))
	}
}
