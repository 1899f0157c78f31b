//! Shopify Admin API implementation.
//!
//! Draft orders are listed through GraphQL (one round trip brings the linked
//! order's tags, fulfillment and cancellation) and read or written through
//! REST. Every call carries the admin access token header.

mod wire;

use crate::{CommerceError, CommerceFactory, CommerceInterface, CommerceRegistry};
use archive_types::{
	AdminOrder, ConfigSchema, Customer, DraftOrder, DraftOrderInput, DraftOrderQuery,
	DraftOrderUpdate, Field, FieldType, ImplementationRegistry, NewCustomer, Schema,
	SecretString, ValidationError,
};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use wire::*;

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";
const DEFAULT_API_VERSION: &str = "2025-01";
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Admin API client for one store.
pub struct ShopifyCommerce {
	client: reqwest::Client,
	/// `https://<store>/admin/api/<version>`
	base_url: String,
	access_token: SecretString,
}

impl ShopifyCommerce {
	pub fn new(
		store_domain: &str,
		access_token: SecretString,
		api_version: &str,
		timeout: Duration,
	) -> Result<Self, CommerceError> {
		if store_domain.trim().is_empty() {
			return Err(CommerceError::Configuration(
				"store_domain is not configured".into(),
			));
		}
		if access_token.is_empty() {
			return Err(CommerceError::Configuration(
				"access_token is not configured".into(),
			));
		}

		let client = reqwest::Client::builder()
			.timeout(timeout)
			.pool_idle_timeout(Duration::from_secs(90))
			.build()
			.map_err(|e| CommerceError::Configuration(e.to_string()))?;

		Ok(Self {
			client,
			base_url: format!(
				"https://{}/admin/api/{}",
				store_domain.trim().trim_end_matches('/'),
				api_version
			),
			access_token,
		})
	}

	fn request(&self, method: Method, path: &str) -> RequestBuilder {
		self.client
			.request(method, format!("{}{}", self.base_url, path))
			.header(ACCESS_TOKEN_HEADER, self.access_token.expose_secret())
	}

	/// Sends a request, turning non-success statuses into `Upstream` errors
	/// that carry the raw response body.
	async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, CommerceError> {
		let response = builder
			.send()
			.await
			.map_err(|e| CommerceError::Network(e.to_string()))?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			tracing::debug!(status = status.as_u16(), "Commerce API call failed");
			return Err(CommerceError::Upstream {
				status: status.as_u16(),
				body,
			});
		}
		Ok(response)
	}

	async fn send_json<T: DeserializeOwned>(
		&self,
		builder: RequestBuilder,
	) -> Result<T, CommerceError> {
		self.send(builder)
			.await?
			.json::<T>()
			.await
			.map_err(|e| CommerceError::Serialization(e.to_string()))
	}

	async fn graphql<T: DeserializeOwned>(
		&self,
		query: &str,
		variables: serde_json::Value,
	) -> Result<T, CommerceError> {
		let builder = self
			.request(Method::POST, "/graphql.json")
			.json(&json!({ "query": query, "variables": variables }));
		let response: GraphQlResponse<T> = self.send_json(builder).await?;

		if let Some(errors) = response.errors.filter(|e| !e.is_empty()) {
			let rendered = serde_json::to_string(&errors).unwrap_or_else(|_| format!("{:?}", errors));
			return Err(CommerceError::GraphQl(rendered));
		}
		response
			.data
			.ok_or_else(|| CommerceError::GraphQl("response contained no data".into()))
	}

	/// Completes a REST draft with its linked order's status, which REST
	/// only reports by id.
	async fn hydrate(&self, draft: RestDraftOrder) -> Result<DraftOrder, CommerceError> {
		let linked = match draft.order_id {
			Some(order_id) => {
				let envelope: OrderStatusEnvelope = self
					.send_json(
						self.request(Method::GET, &format!("/orders/{}.json", order_id))
							.query(&[("fields", "id,tags,fulfillment_status,cancelled_at")]),
					)
					.await?;
				Some(envelope.order.into())
			},
			None => None,
		};
		Ok(draft.into_draft(linked))
	}
}

#[async_trait]
impl CommerceInterface for ShopifyCommerce {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(ShopifySchema)
	}

	async fn search_customers(&self, email: &str) -> Result<Vec<Customer>, CommerceError> {
		let query = format!("email:{}", email);
		let envelope: CustomerSearchEnvelope = self
			.send_json(self.request(Method::GET, "/customers/search.json").query(&[
				("query", query.as_str()),
				("fields", "id,email,first_name,last_name"),
			]))
			.await?;
		Ok(envelope.customers.into_iter().map(Into::into).collect())
	}

	async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer, CommerceError> {
		let envelope: CustomerEnvelope = self
			.send_json(
				self.request(Method::POST, "/customers.json")
					.json(&CustomerPayload { customer }),
			)
			.await?;
		Ok(envelope.customer.into())
	}

	async fn search_draft_orders(
		&self,
		query: &DraftOrderQuery,
	) -> Result<Vec<DraftOrder>, CommerceError> {
		tracing::debug!(query = %query.search_string(), limit = query.limit, "Searching draft orders");
		let data: DraftOrdersData = self
			.graphql(
				DRAFT_ORDERS_QUERY,
				json!({
					"first": query.limit,
					"query": query.search_string(),
					"reverse": query.reverse,
					"lineItems": query.line_items_limit,
				}),
			)
			.await?;

		Ok(draft_orders_from_nodes(data.draft_orders.nodes))
	}

	async fn get_draft_order(&self, id: u64) -> Result<DraftOrder, CommerceError> {
		let result: Result<DraftOrderEnvelope, _> = self
			.send_json(self.request(Method::GET, &format!("/draft_orders/{}.json", id)))
			.await;
		match result {
			Ok(envelope) => self.hydrate(envelope.draft_order).await,
			Err(e) if e.is_not_found() => Err(CommerceError::NotFound(format!("draft order {}", id))),
			Err(e) => Err(e),
		}
	}

	async fn create_draft_order(
		&self,
		input: &DraftOrderInput,
	) -> Result<DraftOrder, CommerceError> {
		let envelope: DraftOrderEnvelope = self
			.send_json(
				self.request(Method::POST, "/draft_orders.json")
					.json(&DraftOrderPayload {
						draft_order: input.into(),
					}),
			)
			.await?;
		self.hydrate(envelope.draft_order).await
	}

	async fn update_draft_order(
		&self,
		id: u64,
		update: &DraftOrderUpdate,
	) -> Result<DraftOrder, CommerceError> {
		let envelope: DraftOrderEnvelope = self
			.send_json(
				self.request(Method::PUT, &format!("/draft_orders/{}.json", id))
					.json(&DraftOrderPayload {
						draft_order: update.into(),
					}),
			)
			.await?;
		self.hydrate(envelope.draft_order).await
	}

	async fn delete_draft_order(&self, id: u64) -> Result<(), CommerceError> {
		self.send(self.request(Method::DELETE, &format!("/draft_orders/{}.json", id)))
			.await
			.map(|_| ())
	}

	async fn list_orders(
		&self,
		email: &str,
		limit: u32,
	) -> Result<Vec<AdminOrder>, CommerceError> {
		let limit = limit.to_string();
		let envelope: OrdersEnvelope = self
			.send_json(self.request(Method::GET, "/orders.json").query(&[
				("status", "any"),
				("email", email),
				("limit", limit.as_str()),
			]))
			.await?;
		Ok(envelope.orders.into_iter().map(Into::into).collect())
	}
}

/// Configuration schema for the Shopify implementation.
pub struct ShopifySchema;

impl ConfigSchema for ShopifySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("store_domain", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(domain) if domain.trim().is_empty() => {
							Err("store_domain cannot be empty".into())
						},
						Some(domain) if domain.contains("://") => {
							Err("store_domain must be a host name without scheme".into())
						},
						_ => Ok(()),
					}
				}),
				Field::new("access_token", FieldType::String),
			],
			vec![
				Field::new("api_version", FieldType::String),
				Field::new(
					"timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(300),
					},
				),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create the Shopify implementation.
///
/// Configuration parameters:
/// - `store_domain`: store host, e.g. `archive.myshopify.com`
/// - `access_token`: Admin API access token
/// - `api_version`: Admin API version (default: "2025-01")
/// - `timeout_seconds`: per-request timeout (default: 30)
pub fn create_commerce(config: &toml::Value) -> Result<Box<dyn CommerceInterface>, CommerceError> {
	ShopifySchema
		.validate(config)
		.map_err(|e| CommerceError::Configuration(e.to_string()))?;

	let store_domain = config
		.get("store_domain")
		.and_then(|v| v.as_str())
		.unwrap_or_default();
	let access_token = config
		.get("access_token")
		.and_then(|v| v.as_str())
		.map(SecretString::from)
		.unwrap_or_else(|| SecretString::from(""));
	let api_version = config
		.get("api_version")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_API_VERSION);
	let timeout = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.and_then(|secs| u64::try_from(secs).ok())
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	Ok(Box::new(ShopifyCommerce::new(
		store_domain,
		access_token,
		api_version,
		Duration::from_secs(timeout),
	)?))
}

/// Registry for the Shopify implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "shopify";
	type Factory = CommerceFactory;

	fn factory() -> Self::Factory {
		create_commerce
	}
}

impl CommerceRegistry for Registry {}
