//! Commerce platform module for the digitisation request system.
//!
//! The commerce platform is the system of record: requests are draft orders,
//! customers are platform customers and paid requests become orders. This
//! module defines the interface the rest of the workspace talks to, plus a
//! live Admin API client and an in-memory platform for tests and demos.

use archive_types::{
	AdminOrder, ConfigSchema, Customer, DraftOrder, DraftOrderInput, DraftOrderQuery,
	DraftOrderUpdate, ImplementationRegistry, NewCustomer,
};
use async_trait::async_trait;
use thiserror::Error;

pub mod implementations {
	pub mod memory;
	pub mod shopify;
}

/// Errors that can occur while talking to the commerce platform.
#[derive(Debug, Error)]
pub enum CommerceError {
	/// Missing or invalid credentials or settings.
	#[error("Configuration error: {0}")]
	Configuration(String),
	/// The platform answered with a non-success status.
	#[error("Commerce API {status}: {body}")]
	Upstream { status: u16, body: String },
	/// The GraphQL endpoint returned an `errors` array.
	#[error("Commerce GraphQL errors: {0}")]
	GraphQl(String),
	/// The request never got an answer.
	#[error("Network error: {0}")]
	Network(String),
	#[error("Not found: {0}")]
	NotFound(String),
	/// The platform answered with a body that could not be understood.
	#[error("Serialization error: {0}")]
	Serialization(String),
}

impl CommerceError {
	/// Whether the platform reported the resource as missing.
	pub fn is_not_found(&self) -> bool {
		matches!(
			self,
			CommerceError::NotFound(_) | CommerceError::Upstream { status: 404, .. }
		)
	}
}

/// Operations the workspace needs from a commerce platform.
///
/// Implementations return records already normalised into the types of
/// `archive_types::commerce`; callers never see wire formats.
#[async_trait]
pub trait CommerceInterface: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Customers whose email matches exactly, in platform order.
	async fn search_customers(&self, email: &str) -> Result<Vec<Customer>, CommerceError>;

	async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer, CommerceError>;

	/// Draft orders matching the query, in platform order.
	async fn search_draft_orders(
		&self,
		query: &DraftOrderQuery,
	) -> Result<Vec<DraftOrder>, CommerceError>;

	/// A single draft order with all its line items.
	async fn get_draft_order(&self, id: u64) -> Result<DraftOrder, CommerceError>;

	async fn create_draft_order(&self, input: &DraftOrderInput)
		-> Result<DraftOrder, CommerceError>;

	/// Applies `update` without any version check.
	async fn update_draft_order(
		&self,
		id: u64,
		update: &DraftOrderUpdate,
	) -> Result<DraftOrder, CommerceError>;

	async fn delete_draft_order(&self, id: u64) -> Result<(), CommerceError>;

	/// Finalised orders placed with `email`, newest first.
	async fn list_orders(&self, email: &str, limit: u32)
		-> Result<Vec<AdminOrder>, CommerceError>;
}

/// Type alias for commerce factory functions.
pub type CommerceFactory = fn(&toml::Value) -> Result<Box<dyn CommerceInterface>, CommerceError>;

/// Registry trait for commerce implementations.
pub trait CommerceRegistry: ImplementationRegistry<Factory = CommerceFactory> {}

/// Get all registered commerce implementations.
pub fn get_all_implementations() -> Vec<(&'static str, CommerceFactory)> {
	use implementations::{memory, shopify};

	vec![
		(shopify::Registry::NAME, shopify::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Service wrapping the configured commerce implementation.
pub struct CommerceService {
	implementation: Box<dyn CommerceInterface>,
}

impl CommerceService {
	pub fn new(implementation: Box<dyn CommerceInterface>) -> Self {
		Self { implementation }
	}

	/// Returns the first customer with this email, creating one if none exists.
	///
	/// New customers are created verified and without the platform welcome
	/// email. The flag is `true` when the customer was created.
	pub async fn find_or_create_customer(
		&self,
		email: &str,
		first_name: Option<&str>,
		last_name: Option<&str>,
	) -> Result<(Customer, bool), CommerceError> {
		if let Some(existing) = self
			.implementation
			.search_customers(email)
			.await?
			.into_iter()
			.next()
		{
			return Ok((existing, false));
		}

		let created = self
			.implementation
			.create_customer(&NewCustomer::verified(email, first_name, last_name))
			.await?;
		tracing::info!(customer_id = created.id, "Created customer");
		Ok((created, true))
	}

	pub async fn search_draft_orders(
		&self,
		query: &DraftOrderQuery,
	) -> Result<Vec<DraftOrder>, CommerceError> {
		self.implementation.search_draft_orders(query).await
	}

	pub async fn get_draft_order(&self, id: u64) -> Result<DraftOrder, CommerceError> {
		self.implementation.get_draft_order(id).await
	}

	pub async fn create_draft_order(
		&self,
		input: &DraftOrderInput,
	) -> Result<DraftOrder, CommerceError> {
		self.implementation.create_draft_order(input).await
	}

	pub async fn update_draft_order(
		&self,
		id: u64,
		update: &DraftOrderUpdate,
	) -> Result<DraftOrder, CommerceError> {
		self.implementation.update_draft_order(id, update).await
	}

	pub async fn delete_draft_order(&self, id: u64) -> Result<(), CommerceError> {
		self.implementation.delete_draft_order(id).await
	}

	pub async fn list_orders(
		&self,
		email: &str,
		limit: u32,
	) -> Result<Vec<AdminOrder>, CommerceError> {
		self.implementation.list_orders(email, limit).await
	}
}
