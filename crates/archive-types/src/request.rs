//! Digitisation request domain types.
//!
//! A digitisation request is never stored as its own entity: it is a tagged
//! draft order on the commerce platform, projected into the types below
//! whenever it is read.

use crate::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Custom property names written onto request line items.
///
/// These are the stable keys used to recover item data from a draft order.
pub mod property_keys {
	pub const ITEM_ID: &str = "item_id";
	pub const ITEM_TYPE: &str = "item_type";
	pub const ITEM_TITLE: &str = "item_title";
	pub const CONTROL_SYMBOL: &str = "control_symbol";
	pub const BARCODE: &str = "barcode";
	pub const SERIES_NUMBER: &str = "series_number";
	pub const ITEM_IMAGE: &str = "item_image";
}

/// Labels of the six progress steps shown for a request, in order.
pub const DIGITISATION_STEPS: [&str; 6] = [
	"Submitted",
	"Under Review",
	"Quote Ready",
	"Payment",
	"Digitising",
	"Complete",
];

/// User-facing status of a digitisation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigitisationStatus {
	PendingReview,
	QuoteReady,
	PaymentReceived,
	Digitising,
	Complete,
	Cancelled,
}

impl DigitisationStatus {
	/// Progress step for this status. Step 1 ("Submitted") is never current;
	/// a cancelled request sits at step 0.
	pub fn step(&self) -> u8 {
		match self {
			Self::Cancelled => 0,
			Self::PendingReview => 2,
			Self::QuoteReady => 3,
			Self::PaymentReceived => 4,
			Self::Digitising => 5,
			Self::Complete => 6,
		}
	}

	pub fn label(&self) -> &'static str {
		match self {
			Self::PendingReview => "Under Review",
			Self::QuoteReady => "Quote Ready",
			Self::PaymentReceived => "Payment Received",
			Self::Digitising => "Digitising",
			Self::Complete => "Complete",
			Self::Cancelled => "Cancelled",
		}
	}

	/// Only requests that have not been paid for can be cancelled.
	pub fn is_cancellable(&self) -> bool {
		matches!(self, Self::PendingReview | Self::QuoteReady)
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::PendingReview => "pending_review",
			Self::QuoteReady => "quote_ready",
			Self::PaymentReceived => "payment_received",
			Self::Digitising => "digitising",
			Self::Complete => "complete",
			Self::Cancelled => "cancelled",
		}
	}
}

impl fmt::Display for DigitisationStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Item as displayed on a request card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestItem {
	pub title: String,
	#[serde(rename = "type")]
	pub item_type: String,
	pub image: String,
}

/// A digitisation request projected from its backing draft order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigitisationRequest {
	pub id: u64,
	pub name: String,
	pub status: DigitisationStatus,
	pub requested_at: DateTime<Utc>,
	pub items: Vec<RequestItem>,
	pub notes: String,
	pub quote_amount: Option<Money>,
	pub invoice_url: Option<String>,
	pub order_id: Option<u64>,
	pub current_step: u8,
}

/// Archive item submitted for digitisation.
///
/// The same shape is captured from a cancelled request so it can be
/// resubmitted unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArchiveItem {
	pub id: String,
	pub title: String,
	pub item_type: String,
	pub control_symbol: String,
	pub barcode: String,
	pub series: String,
	pub image: String,
}

/// A new submission from the request form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRequest {
	pub email: String,
	#[serde(default)]
	pub first_name: Option<String>,
	#[serde(default)]
	pub last_name: Option<String>,
	#[serde(default)]
	pub notes: String,
	pub item: ArchiveItem,
}

/// Result of submitting a new request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOutcome {
	/// True when the item was merged into an existing open request.
	pub bundled: bool,
	pub request: DigitisationRequest,
}

/// Everything remembered about a request after it has been cancelled.
///
/// The backing draft order is deleted on cancellation; this value is the
/// only remaining copy of its contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelledRequestData {
	pub original_name: String,
	pub email: String,
	#[serde(default)]
	pub first_name: String,
	#[serde(default)]
	pub last_name: String,
	#[serde(default)]
	pub items: Vec<ArchiveItem>,
	#[serde(default)]
	pub notes: String,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_steps_match_labels() {
		assert_eq!(DigitisationStatus::Cancelled.step(), 0);
		assert_eq!(DigitisationStatus::Complete.step() as usize, DIGITISATION_STEPS.len());
		assert_eq!(
			DIGITISATION_STEPS[DigitisationStatus::PendingReview.step() as usize - 1],
			"Under Review"
		);
	}

	#[test]
	fn test_status_wire_format() {
		let json = serde_json::to_string(&DigitisationStatus::PaymentReceived).unwrap();
		assert_eq!(json, "\"payment_received\"");
	}

	#[test]
	fn test_cancellable_statuses() {
		assert!(DigitisationStatus::PendingReview.is_cancellable());
		assert!(DigitisationStatus::QuoteReady.is_cancellable());
		assert!(!DigitisationStatus::PaymentReceived.is_cancellable());
		assert!(!DigitisationStatus::Cancelled.is_cancellable());
	}

	#[test]
	fn test_item_accepts_partial_payload() {
		let item: ArchiveItem =
			serde_json::from_str(r#"{"title":"Map 1900","itemType":"map"}"#).unwrap();
		assert_eq!(item.title, "Map 1900");
		assert_eq!(item.item_type, "map");
		assert!(item.barcode.is_empty());
	}
}
