//! Status projection for digitisation requests.
//!
//! A request's status is never stored. It is recomputed from the draft order
//! and its linked order every time the request is read, so it always agrees
//! with what staff have done on the platform.

use crate::items::request_item;
use archive_types::{
	DigitisationRequest, DigitisationStatus, DraftOrder, DraftOrderStatus, FulfillmentStatus,
	TagSet,
};

/// Order tag staff set once scanning has started.
pub const DIGITISING_TAG: &str = "digitising";

/// The inputs the status depends on, gathered from a draft order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSignals {
	/// The linked order was cancelled.
	pub cancelled: bool,
	pub fulfillment: FulfillmentStatus,
	/// Tags of the linked order.
	pub tags: TagSet,
	pub draft_status: DraftOrderStatus,
	pub linked_order_id: Option<u64>,
}

impl RequestSignals {
	pub fn from_draft(draft: &DraftOrder) -> Self {
		match &draft.linked_order {
			Some(order) => Self {
				cancelled: order.cancelled,
				fulfillment: order.fulfillment,
				tags: order.tags.clone(),
				draft_status: draft.status,
				linked_order_id: Some(order.id),
			},
			None => Self {
				cancelled: false,
				fulfillment: FulfillmentStatus::Unfulfilled,
				tags: TagSet::new(),
				draft_status: draft.status,
				linked_order_id: None,
			},
		}
	}
}

/// Maps the signals onto a status. The first matching rule wins.
pub fn project_status(signals: &RequestSignals) -> DigitisationStatus {
	if signals.cancelled {
		return DigitisationStatus::Cancelled;
	}
	if signals.fulfillment == FulfillmentStatus::Fulfilled {
		return DigitisationStatus::Complete;
	}
	if signals.tags.contains(DIGITISING_TAG) {
		return DigitisationStatus::Digitising;
	}
	if signals.draft_status == DraftOrderStatus::Completed && signals.linked_order_id.is_some() {
		return DigitisationStatus::PaymentReceived;
	}
	if signals.draft_status == DraftOrderStatus::InvoiceSent {
		return DigitisationStatus::QuoteReady;
	}
	DigitisationStatus::PendingReview
}

/// Projects a draft order into the request shown to the customer.
pub fn project_request(draft: &DraftOrder) -> DigitisationRequest {
	let status = project_status(&RequestSignals::from_draft(draft));
	DigitisationRequest {
		id: draft.id,
		name: draft.name.clone(),
		status,
		requested_at: draft.created_at,
		items: draft.line_items.iter().map(request_item).collect(),
		notes: draft.note.clone().unwrap_or_default(),
		quote_amount: Some(draft.total_price.clone()).filter(|m| m.is_positive()),
		invoice_url: draft.invoice_url.clone(),
		order_id: draft.linked_order.as_ref().map(|o| o.id),
		current_step: status.step(),
	}
}
