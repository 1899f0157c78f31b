//! Cancellation state of a single request card.
//!
//! Cards move through `Idle -> Confirming -> Cancelling -> Cancelled`. The
//! customer can back out while confirming, a failed cancellation returns the
//! card to `Idle` so it can be retried, and once cancelled the only action
//! left is recreating the request.

use crate::cancellation::CancellationWorkflow;
use crate::RequestError;
use archive_types::{CancelledRequestData, DigitisationRequest};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors raised by card transitions.
#[derive(Debug, Error)]
pub enum CardError {
	#[error("Invalid card transition from {from:?} to {to:?}")]
	InvalidTransition { from: CardState, to: CardState },
	/// The card is cancelled but holds nothing to recreate from.
	#[error("No cancelled request data to recreate from")]
	NothingToRecreate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardState {
	Idle,
	Confirming,
	Cancelling,
	Cancelled,
}

/// Checks if a card transition is valid.
fn is_valid_transition(from: CardState, to: CardState) -> bool {
	// Static transition table - each state maps to allowed next states
	static TRANSITIONS: Lazy<HashMap<CardState, HashSet<CardState>>> = Lazy::new(|| {
		let mut m = HashMap::new();
		m.insert(CardState::Idle, HashSet::from([CardState::Confirming]));
		m.insert(
			CardState::Confirming,
			HashSet::from([CardState::Idle, CardState::Cancelling]),
		);
		m.insert(
			CardState::Cancelling,
			HashSet::from([CardState::Cancelled, CardState::Idle]),
		);
		// terminal; recreation keeps the card cancelled
		m.insert(CardState::Cancelled, HashSet::from([CardState::Cancelled]));
		m
	});

	TRANSITIONS
		.get(&from)
		.is_some_and(|allowed| allowed.contains(&to))
}

/// Client-side view of one request while it is being cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestCard {
	pub request_id: u64,
	pub state: CardState,
	/// Message of the last failed action.
	pub error: Option<String>,
	/// Data captured by a successful cancellation.
	pub cancelled: Option<CancelledRequestData>,
	/// The request created by a successful recreation.
	pub recreated: Option<DigitisationRequest>,
}

impl RequestCard {
	pub fn new(request_id: u64) -> Self {
		Self {
			request_id,
			state: CardState::Idle,
			error: None,
			cancelled: None,
			recreated: None,
		}
	}

	fn transition(&mut self, to: CardState) -> Result<(), CardError> {
		if !is_valid_transition(self.state, to) {
			return Err(CardError::InvalidTransition {
				from: self.state,
				to,
			});
		}
		self.state = to;
		Ok(())
	}

	/// Asks the customer to confirm cancellation.
	pub fn begin_cancel(&mut self) -> Result<(), CardError> {
		self.transition(CardState::Confirming)?;
		self.error = None;
		Ok(())
	}

	/// Backs out of the confirmation prompt.
	pub fn abort(&mut self) -> Result<(), CardError> {
		self.transition(CardState::Idle)
	}

	/// Confirms, cancels the request and records the outcome.
	///
	/// A failed cancellation puts the card back to `Idle` with the error kept
	/// for display; it is also returned to the caller.
	pub async fn confirm_cancel(
		&mut self,
		workflow: &CancellationWorkflow,
	) -> Result<Result<(), RequestError>, CardError> {
		self.transition(CardState::Cancelling)?;

		match workflow.cancel(self.request_id).await {
			Ok(data) => {
				self.transition(CardState::Cancelled)?;
				self.cancelled = Some(data);
				self.error = None;
				Ok(Ok(()))
			}
			Err(e) => {
				self.transition(CardState::Idle)?;
				self.error = Some(e.to_string());
				Ok(Err(e))
			}
		}
	}

	/// Recreates the cancelled request.
	///
	/// The card stays cancelled either way. On failure the error is recorded
	/// and recreation may be tried again.
	pub async fn recreate(
		&mut self,
		workflow: &CancellationWorkflow,
	) -> Result<Result<&DigitisationRequest, RequestError>, CardError> {
		self.transition(CardState::Cancelled)?;
		let Some(data) = &self.cancelled else {
			return Err(CardError::NothingToRecreate);
		};

		match workflow.recreate(data).await {
			Ok(request) => {
				self.error = None;
				Ok(Ok(self.recreated.insert(request)))
			}
			Err(e) => {
				self.error = Some(e.to_string());
				Ok(Err(e))
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::bundler::BundlingResolver;
	use archive_commerce::implementations::memory::InMemoryCommerce;
	use archive_commerce::CommerceService;
	use archive_config::RequestsConfig;
	use archive_types::{ArchiveItem, NewRequest};
	use std::sync::Arc;

	#[test]
	fn test_transition_table() {
		use CardState::*;
		assert!(is_valid_transition(Idle, Confirming));
		assert!(is_valid_transition(Confirming, Idle));
		assert!(is_valid_transition(Confirming, Cancelling));
		assert!(is_valid_transition(Cancelling, Idle));
		assert!(is_valid_transition(Cancelling, Cancelled));
		assert!(!is_valid_transition(Idle, Cancelling));
		assert!(!is_valid_transition(Idle, Cancelled));
		assert!(!is_valid_transition(Cancelled, Idle));
		assert!(!is_valid_transition(Cancelled, Confirming));
	}

	#[test]
	fn test_confirm_then_abort() {
		let mut card = RequestCard::new(1);
		card.begin_cancel().unwrap();
		assert_eq!(card.state, CardState::Confirming);
		card.abort().unwrap();
		assert_eq!(card.state, CardState::Idle);

		let err = card.abort().unwrap_err();
		assert!(matches!(
			err,
			CardError::InvalidTransition {
				from: CardState::Idle,
				to: CardState::Idle
			}
		));
	}

	async fn setup() -> (CancellationWorkflow, u64) {
		let platform = InMemoryCommerce::new();
		let commerce = Arc::new(CommerceService::new(Box::new(platform)));
		let resolver = BundlingResolver::new(commerce.clone(), RequestsConfig::default());
		let outcome = resolver
			.submit(NewRequest {
				email: "a@example.com".into(),
				first_name: None,
				last_name: None,
				notes: String::new(),
				item: ArchiveItem {
					title: "Map 1900".into(),
					..Default::default()
				},
			})
			.await
			.unwrap();
		(
			CancellationWorkflow::new(commerce, RequestsConfig::default()),
			outcome.request.id,
		)
	}

	#[tokio::test]
	async fn test_cancel_and_recreate_through_card() {
		let (workflow, id) = setup().await;
		let mut card = RequestCard::new(id);

		// Must confirm first
		assert!(card.confirm_cancel(&workflow).await.is_err());

		card.begin_cancel().unwrap();
		card.confirm_cancel(&workflow).await.unwrap().unwrap();
		assert_eq!(card.state, CardState::Cancelled);
		assert_eq!(card.cancelled.as_ref().map(|d| d.items.len()), Some(1));
		assert!(card.begin_cancel().is_err());

		let recreated = card.recreate(&workflow).await.unwrap().unwrap();
		assert_ne!(recreated.id, id);
		assert_eq!(card.state, CardState::Cancelled);
		assert!(card.recreated.is_some());
	}

	#[tokio::test]
	async fn test_failed_cancel_returns_to_idle() {
		let (workflow, _) = setup().await;
		let mut card = RequestCard::new(9999);

		card.begin_cancel().unwrap();
		let outcome = card.confirm_cancel(&workflow).await.unwrap();
		assert!(matches!(outcome, Err(RequestError::NotFound(_))));
		assert_eq!(card.state, CardState::Idle);
		assert!(card.error.is_some());

		// Retry is allowed
		card.begin_cancel().unwrap();
		assert!(card.error.is_none());
	}

	#[tokio::test]
	async fn test_failed_recreate_stays_cancelled() {
		let (workflow, _) = setup().await;
		let mut card = RequestCard::new(1);
		card.state = CardState::Cancelled;
		card.cancelled = Some(CancelledRequestData {
			original_name: "#D1001".into(),
			email: String::new(),
			..Default::default()
		});

		let outcome = card.recreate(&workflow).await.unwrap();
		assert!(matches!(outcome, Err(RequestError::Validation(_))));
		assert_eq!(card.state, CardState::Cancelled);
		assert!(card.error.is_some());
	}

	#[tokio::test]
	async fn test_recreate_needs_cancelled_card() {
		let (workflow, _) = setup().await;
		let mut card = RequestCard::new(1);
		assert!(matches!(
			card.recreate(&workflow).await,
			Err(CardError::InvalidTransition { .. })
		));
	}
}
