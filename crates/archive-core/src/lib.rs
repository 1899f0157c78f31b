//! Core request engine for the digitisation request system.
//!
//! A digitisation request lives on the commerce platform as a tagged draft
//! order. This crate turns those drafts into user-facing requests and runs
//! the three workflows that change them:
//!
//! - the status projector, which maps raw draft state onto a request status
//! - the bundling resolver, which merges new submissions into the customer's
//!   open request or creates a new one
//! - cancellation and recreation, which capture a request's items before
//!   deleting it and can later resubmit them
//!
//! [`RequestEngine`] ties these together behind one facade and is built from
//! configuration by [`EngineBuilder`].

use archive_commerce::CommerceError;
use archive_types::{APIError, DigitisationStatus};
use thiserror::Error;

pub mod builder;
pub mod bundler;
pub mod cancellation;
pub mod card;
pub mod engine;
pub mod items;
pub mod orders;
pub mod projector;

pub use builder::{BuilderError, EngineBuilder};
pub use bundler::BundlingResolver;
pub use cancellation::CancellationWorkflow;
pub use card::{CardError, CardState, RequestCard};
pub use engine::RequestEngine;

/// Errors that can occur while working on digitisation requests.
#[derive(Debug, Error)]
pub enum RequestError {
	/// The caller supplied unusable input.
	#[error("Validation error: {0}")]
	Validation(String),
	#[error("Request not found: {0}")]
	NotFound(String),
	/// Only requests that have not been paid for can be cancelled.
	#[error("Request {name} cannot be cancelled while {status}")]
	NotCancellable {
		name: String,
		status: DigitisationStatus,
	},
	#[error("Commerce error: {0}")]
	Commerce(#[from] CommerceError),
}

impl From<RequestError> for APIError {
	fn from(err: RequestError) -> Self {
		let message = err.to_string();
		match err {
			RequestError::Validation(_) => APIError::BadRequest {
				error_type: "INVALID_REQUEST".to_string(),
				message,
			},
			RequestError::NotFound(_) => APIError::NotFound {
				error_type: "REQUEST_NOT_FOUND".to_string(),
				message,
			},
			RequestError::NotCancellable { .. } => APIError::Conflict {
				error_type: "NOT_CANCELLABLE".to_string(),
				message,
			},
			RequestError::Commerce(CommerceError::Configuration(_)) => {
				APIError::InternalServerError {
					error_type: "CONFIGURATION_ERROR".to_string(),
					message,
				}
			}
			RequestError::Commerce(_) => APIError::BadGateway {
				error_type: "COMMERCE_ERROR".to_string(),
				message,
			},
		}
	}
}

/// Rejects blank emails, returning the trimmed address.
pub(crate) fn require_email(email: &str) -> Result<&str, RequestError> {
	let email = email.trim();
	if email.is_empty() {
		return Err(RequestError::Validation("Email is required".into()));
	}
	Ok(email)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_api_error_mapping() {
		let not_cancellable = RequestError::NotCancellable {
			name: "#D1001".into(),
			status: DigitisationStatus::Complete,
		};
		let api = APIError::from(not_cancellable);
		assert_eq!(api.status_code(), 409);
		assert_eq!(
			api.to_error_response().message,
			"Request #D1001 cannot be cancelled while complete"
		);

		let upstream = RequestError::Commerce(CommerceError::Upstream {
			status: 422,
			body: "{\"errors\":\"bad\"}".into(),
		});
		assert_eq!(APIError::from(upstream).status_code(), 502);
		assert_eq!(
			APIError::from(RequestError::Validation("Email is required".into())).status_code(),
			400
		);
	}

	#[test]
	fn test_require_email_trims() {
		assert_eq!(require_email(" a@example.com ").unwrap(), "a@example.com");
		assert!(require_email("").is_err());
	}
}
