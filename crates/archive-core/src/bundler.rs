//! Bundling resolver for new submissions.
//!
//! A customer has at most one open request at a time. A new item is merged
//! into that request when it exists, otherwise it starts a fresh one.
//!
//! The lookup and the following update are separate platform calls and the
//! update carries no version token. Two submissions racing onto the same
//! draft both read the old line items and the later write wins; two first
//! submissions racing for the same email can each create a request.

use crate::items::line_item_for;
use crate::projector::project_request;
use crate::{require_email, RequestError};
use archive_commerce::{CommerceError, CommerceService};
use archive_config::RequestsConfig;
use archive_types::{
	emails_match, CreateOutcome, Customer, DraftOrder, DraftOrderInput, DraftOrderQuery,
	DraftOrderStatus, DraftOrderUpdate, LineItem, NewRequest, TagSet,
};
use std::sync::Arc;
use tracing::instrument;

/// Separator placed between the notes of bundled submissions.
pub const NOTE_SEPARATOR: &str = "\n---\n";

/// Appends `addition` to an existing request note.
pub fn append_note(existing: Option<&str>, addition: &str) -> String {
	match existing.filter(|n| !n.is_empty()) {
		Some(existing) => format!("{}{}{}", existing, NOTE_SEPARATOR, addition),
		None => addition.to_string(),
	}
}

/// Finds the customer for `email`, creating one when none exists.
///
/// Any failure is logged and yields `None`; the caller then keys the draft
/// by email alone.
pub(crate) async fn resolve_customer(
	commerce: &CommerceService,
	email: &str,
	first_name: Option<&str>,
	last_name: Option<&str>,
) -> Option<Customer> {
	match commerce
		.find_or_create_customer(email, first_name, last_name)
		.await
	{
		Ok((customer, _)) => Some(customer),
		Err(e) => {
			tracing::warn!(error = %e, "Customer lookup failed, continuing without customer");
			None
		}
	}
}

/// Builds the payload for a new tagged request draft.
pub(crate) fn draft_input(
	settings: &RequestsConfig,
	customer: Option<&Customer>,
	email: &str,
	line_items: Vec<LineItem>,
	note: String,
) -> DraftOrderInput {
	DraftOrderInput {
		line_items,
		customer_id: customer.map(|c| c.id),
		email: match customer {
			Some(_) => None,
			None => Some(email.to_string()),
		},
		tags: TagSet::single(&settings.tag),
		note,
	}
}

/// Merges new submissions into the customer's open request.
pub struct BundlingResolver {
	commerce: Arc<CommerceService>,
	settings: RequestsConfig,
}

impl BundlingResolver {
	pub fn new(commerce: Arc<CommerceService>, settings: RequestsConfig) -> Self {
		Self { commerce, settings }
	}

	/// Submits `request`, bundling it into an open request when one exists.
	#[instrument(skip_all, fields(email = %request.email))]
	pub async fn submit(&self, request: NewRequest) -> Result<CreateOutcome, RequestError> {
		let email = require_email(&request.email)?;
		let customer = resolve_customer(
			&self.commerce,
			email,
			request.first_name.as_deref(),
			request.last_name.as_deref(),
		)
		.await;

		let line_item = line_item_for(&request.item);

		if let Some(existing) = self.find_open_request(email).await {
			let mut line_items = existing.line_items;
			line_items.push(line_item);
			let update = DraftOrderUpdate {
				line_items: Some(line_items),
				note: Some(append_note(existing.note.as_deref(), &request.notes)),
			};
			let updated = self
				.commerce
				.update_draft_order(existing.id, &update)
				.await?;
			tracing::info!(
				request = %updated.name,
				items = updated.line_items.len(),
				"Bundled item into request"
			);
			return Ok(CreateOutcome {
				bundled: true,
				request: project_request(&updated),
			});
		}

		let input = draft_input(
			&self.settings,
			customer.as_ref(),
			email,
			vec![line_item],
			request.notes.clone(),
		);
		let created = self.commerce.create_draft_order(&input).await?;
		tracing::info!(request = %created.name, "Created request");
		Ok(CreateOutcome {
			bundled: false,
			request: project_request(&created),
		})
	}

	/// The full draft of the first open request owned by `email`.
	///
	/// Lookup failures are logged and treated as "no open request".
	async fn find_open_request(&self, email: &str) -> Option<DraftOrder> {
		match self.lookup_open_request(email).await {
			Ok(found) => found,
			Err(e) => {
				tracing::warn!(error = %e, "Open request lookup failed, creating a new request");
				None
			}
		}
	}

	async fn lookup_open_request(&self, email: &str) -> Result<Option<DraftOrder>, CommerceError> {
		let query = DraftOrderQuery {
			tag: self.settings.tag.clone(),
			status: Some(DraftOrderStatus::Open),
			limit: self.settings.bundle_search_limit,
			line_items_limit: self.settings.line_items_limit,
			reverse: false,
		};
		let candidates = self.commerce.search_draft_orders(&query).await?;
		let Some(matched) = candidates
			.iter()
			.find(|d| d.owner_email().is_some_and(|owner| emails_match(owner, email)))
		else {
			return Ok(None);
		};

		tracing::debug!(request = %matched.name, "Found open request");
		// Search results may hold a truncated item list.
		self.commerce.get_draft_order(matched.id).await.map(Some)
	}
}
