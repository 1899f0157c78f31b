//! Request engine facade.
//!
//! The engine is what the HTTP layer talks to. It owns the commerce service
//! and the two workflows, and reads requests back through the projector.

use crate::bundler::BundlingResolver;
use crate::cancellation::CancellationWorkflow;
use crate::orders::project_order;
use crate::projector::project_request;
use crate::{require_email, RequestError};
use archive_commerce::CommerceService;
use archive_config::Config;
use archive_types::{
	emails_match, CancelledRequestData, CreateOutcome, Customer, CustomerOrderSummary,
	DigitisationRequest, DraftOrderQuery, NewRequest,
};
use std::sync::Arc;
use tracing::instrument;

/// Entry point for every digitisation request operation.
pub struct RequestEngine {
	config: Config,
	commerce: Arc<CommerceService>,
	bundler: BundlingResolver,
	cancellation: CancellationWorkflow,
}

impl RequestEngine {
	pub fn new(config: Config, commerce: Arc<CommerceService>) -> Self {
		let bundler = BundlingResolver::new(commerce.clone(), config.requests.clone());
		let cancellation = CancellationWorkflow::new(commerce.clone(), config.requests.clone());
		Self {
			config,
			commerce,
			bundler,
			cancellation,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Workflow used by request cards to cancel and recreate.
	pub fn cancellation(&self) -> &CancellationWorkflow {
		&self.cancellation
	}

	/// Submits a new item, bundling it into the customer's open request
	/// when there is one.
	pub async fn create_request(&self, request: NewRequest) -> Result<CreateOutcome, RequestError> {
		self.bundler.submit(request).await
	}

	/// All requests owned by `email`, newest first.
	#[instrument(skip(self))]
	pub async fn get_requests(&self, email: &str) -> Result<Vec<DigitisationRequest>, RequestError> {
		let email = require_email(email)?;
		let settings = &self.config.requests;
		let query = DraftOrderQuery {
			tag: settings.tag.clone(),
			status: None,
			limit: settings.list_limit,
			line_items_limit: settings.line_items_limit,
			reverse: true,
		};

		let drafts = self.commerce.search_draft_orders(&query).await?;
		let requests: Vec<_> = drafts
			.iter()
			.filter(|d| d.owner_email().is_some_and(|owner| emails_match(owner, email)))
			.map(project_request)
			.collect();
		tracing::debug!(scanned = drafts.len(), matched = requests.len(), "Listed requests");
		Ok(requests)
	}

	pub async fn cancel_request(&self, id: u64) -> Result<CancelledRequestData, RequestError> {
		self.cancellation.cancel(id).await
	}

	pub async fn recreate_request(
		&self,
		data: &CancelledRequestData,
	) -> Result<DigitisationRequest, RequestError> {
		self.cancellation.recreate(data).await
	}

	/// Finds or creates the platform customer for `email`. The flag is
	/// `true` when the customer was created.
	#[instrument(skip(self, first_name, last_name))]
	pub async fn sync_customer(
		&self,
		email: &str,
		first_name: Option<&str>,
		last_name: Option<&str>,
	) -> Result<(Customer, bool), RequestError> {
		let email = require_email(email)?;
		Ok(self
			.commerce
			.find_or_create_customer(email, first_name, last_name)
			.await?)
	}

	/// Finalised orders placed by `email`, newest first.
	#[instrument(skip(self))]
	pub async fn get_orders(&self, email: &str) -> Result<Vec<CustomerOrderSummary>, RequestError> {
		let email = require_email(email)?;
		let orders = self
			.commerce
			.list_orders(email, self.config.requests.order_history_limit)
			.await?;
		Ok(orders.iter().map(project_order).collect())
	}
}
