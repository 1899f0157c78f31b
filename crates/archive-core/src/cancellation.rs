//! Cancellation and recreation of requests.
//!
//! Cancelling deletes the backing draft order outright. Before it goes, the
//! items, contact details and notes are captured into a
//! [`CancelledRequestData`] so the customer can resubmit the same request
//! later. Recreation always produces a brand-new draft.

use crate::bundler::{draft_input, resolve_customer};
use crate::items::{captured_item, line_item_for};
use crate::projector::{project_request, project_status, RequestSignals};
use crate::{require_email, RequestError};
use archive_commerce::CommerceService;
use archive_config::RequestsConfig;
use archive_types::{CancelledRequestData, DigitisationRequest, DraftOrder};
use std::sync::Arc;
use tracing::instrument;

/// Note of a recreated request, recording where it came from.
pub fn recreation_note(original_name: &str, notes: &str) -> String {
	let source = if original_name.trim().is_empty() {
		"cancelled request"
	} else {
		original_name
	};
	format!("Recreated from {}.\n{}", source, notes)
		.trim()
		.to_string()
}

/// Captures everything needed to recreate `draft`.
pub fn capture(draft: &DraftOrder) -> CancelledRequestData {
	let (first_name, last_name) = draft
		.customer
		.as_ref()
		.map(|c| (c.first_name.clone(), c.last_name.clone()))
		.unwrap_or_default();

	CancelledRequestData {
		original_name: draft.name.clone(),
		email: draft.owner_email().unwrap_or_default().to_string(),
		first_name,
		last_name,
		items: draft.line_items.iter().map(captured_item).collect(),
		notes: draft.note.clone().unwrap_or_default(),
	}
}

/// Cancels requests and recreates them from captured data.
pub struct CancellationWorkflow {
	commerce: Arc<CommerceService>,
	settings: RequestsConfig,
}

impl CancellationWorkflow {
	pub fn new(commerce: Arc<CommerceService>, settings: RequestsConfig) -> Self {
		Self { commerce, settings }
	}

	/// Deletes the request, returning the data needed to recreate it.
	///
	/// Requests that have been paid for are rejected.
	#[instrument(skip(self))]
	pub async fn cancel(&self, id: u64) -> Result<CancelledRequestData, RequestError> {
		let draft = match self.commerce.get_draft_order(id).await {
			Ok(draft) => draft,
			Err(e) if e.is_not_found() => {
				return Err(RequestError::NotFound(format!("draft order {}", id)))
			}
			Err(e) => return Err(e.into()),
		};

		if !draft.tags.contains(&self.settings.tag) {
			return Err(RequestError::NotFound(format!("draft order {}", id)));
		}

		let status = project_status(&RequestSignals::from_draft(&draft));
		if !status.is_cancellable() {
			return Err(RequestError::NotCancellable {
				name: draft.name,
				status,
			});
		}

		let captured = capture(&draft);
		self.commerce.delete_draft_order(id).await?;
		tracing::info!(
			request = %draft.name,
			items = captured.items.len(),
			"Cancelled request"
		);
		Ok(captured)
	}

	/// Creates a new request holding exactly the captured items.
	///
	/// Never bundles into another open request.
	#[instrument(skip_all, fields(original = %data.original_name))]
	pub async fn recreate(
		&self,
		data: &CancelledRequestData,
	) -> Result<DigitisationRequest, RequestError> {
		let email = require_email(&data.email)?;
		if data.items.is_empty() {
			return Err(RequestError::Validation(
				"A recreated request needs at least one item".into(),
			));
		}

		let customer = resolve_customer(
			&self.commerce,
			email,
			Some(data.first_name.as_str()).filter(|n| !n.is_empty()),
			Some(data.last_name.as_str()).filter(|n| !n.is_empty()),
		)
		.await;

		let input = draft_input(
			&self.settings,
			customer.as_ref(),
			email,
			data.items.iter().map(line_item_for).collect(),
			recreation_note(&data.original_name, &data.notes),
		);
		let created = self.commerce.create_draft_order(&input).await?;
		tracing::info!(request = %created.name, "Recreated request");
		Ok(project_request(&created))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::bundler::BundlingResolver;
	use archive_commerce::implementations::memory::InMemoryCommerce;
	use archive_types::{ArchiveItem, DigitisationStatus, NewRequest};
	use rust_decimal::Decimal;

	struct Fixture {
		platform: InMemoryCommerce,
		resolver: BundlingResolver,
		workflow: CancellationWorkflow,
	}

	fn fixture() -> Fixture {
		let platform = InMemoryCommerce::new();
		let commerce = Arc::new(CommerceService::new(Box::new(platform.clone())));
		Fixture {
			platform,
			resolver: BundlingResolver::new(commerce.clone(), RequestsConfig::default()),
			workflow: CancellationWorkflow::new(commerce, RequestsConfig::default()),
		}
	}

	fn submission(title: &str) -> NewRequest {
		NewRequest {
			email: "a@example.com".into(),
			first_name: Some("Ada".into()),
			last_name: None,
			notes: "fragile".into(),
			item: ArchiveItem {
				id: format!("id-{}", title),
				title: title.into(),
				item_type: "photo".into(),
				..Default::default()
			},
		}
	}

	#[test]
	fn test_recreation_note() {
		assert_eq!(
			recreation_note("#D1001", "fragile"),
			"Recreated from #D1001.\nfragile"
		);
		assert_eq!(recreation_note("", ""), "Recreated from cancelled request.");
	}

	#[tokio::test]
	async fn test_cancel_then_recreate_keeps_items() {
		let f = fixture();
		f.resolver.submit(submission("Map 1900")).await.unwrap();
		let created = f.resolver.submit(submission("Photo 1910")).await.unwrap();

		let data = f.workflow.cancel(created.request.id).await.unwrap();
		assert_eq!(data.original_name, created.request.name);
		assert_eq!(data.email, "a@example.com");
		assert_eq!(data.first_name, "Ada");
		assert_eq!(data.items.len(), 2);
		assert_eq!(data.notes, "fragile\n---\nfragile");
		assert_eq!(f.platform.draft_count().await, 0);

		let recreated = f.workflow.recreate(&data).await.unwrap();
		assert_ne!(recreated.name, data.original_name);
		assert_eq!(recreated.status, DigitisationStatus::PendingReview);
		let titles: Vec<_> = recreated.items.iter().map(|i| i.title.as_str()).collect();
		assert_eq!(titles, ["Map 1900", "Photo 1910"]);
		assert!(recreated
			.notes
			.starts_with(&format!("Recreated from {}.", data.original_name)));
	}

	#[tokio::test]
	async fn test_recreate_never_bundles() {
		let f = fixture();
		let first = f.resolver.submit(submission("Map 1900")).await.unwrap();
		let data = f.workflow.cancel(first.request.id).await.unwrap();

		let open = f.resolver.submit(submission("Letter 1920")).await.unwrap();
		let recreated = f.workflow.recreate(&data).await.unwrap();

		assert_ne!(recreated.id, open.request.id);
		assert_eq!(recreated.items.len(), 1);
		assert_eq!(f.platform.draft_count().await, 2);
	}

	#[tokio::test]
	async fn test_paid_request_cannot_be_cancelled() {
		let f = fixture();
		let created = f.resolver.submit(submission("Map 1900")).await.unwrap();
		let id = created.request.id;
		f.platform.send_invoice(id, Decimal::TEN).await.unwrap();
		f.platform.complete_draft(id).await.unwrap();

		let err = f.workflow.cancel(id).await.unwrap_err();
		assert!(matches!(
			err,
			RequestError::NotCancellable {
				status: DigitisationStatus::PaymentReceived,
				..
			}
		));
		assert_eq!(f.platform.draft_count().await, 1);
	}

	#[tokio::test]
	async fn test_quoted_request_can_be_cancelled() {
		let f = fixture();
		let created = f.resolver.submit(submission("Map 1900")).await.unwrap();
		f.platform
			.send_invoice(created.request.id, Decimal::TEN)
			.await
			.unwrap();

		assert!(f.workflow.cancel(created.request.id).await.is_ok());
	}

	#[tokio::test]
	async fn test_cancel_unknown_request() {
		let f = fixture();
		let err = f.workflow.cancel(404).await.unwrap_err();
		assert!(matches!(err, RequestError::NotFound(_)));
	}

	#[tokio::test]
	async fn test_recreate_requires_items() {
		let f = fixture();
		let data = CancelledRequestData {
			original_name: "#D1001".into(),
			email: "a@example.com".into(),
			..Default::default()
		};
		let err = f.workflow.recreate(&data).await.unwrap_err();
		assert!(matches!(err, RequestError::Validation(_)));
	}
}
