//! API types for the digitisation request HTTP API.
//!
//! Request and response bodies use camelCase field names so the storefront
//! can consume them without remapping.

use crate::{CustomerOrderSummary, Customer, DigitisationRequest};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Response for `POST /api/requests`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestResponse {
	pub bundled: bool,
	pub request: DigitisationRequest,
}

/// Response for `GET /api/requests`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRequestsResponse {
	pub requests: Vec<DigitisationRequest>,
}

/// Query string carrying the customer's email.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailQuery {
	pub email: Option<String>,
}

/// Body of `POST /api/customers/sync`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncCustomerRequest {
	pub email: String,
	#[serde(default)]
	pub first_name: Option<String>,
	#[serde(default)]
	pub last_name: Option<String>,
}

/// Response of `POST /api/customers/sync`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncCustomerResponse {
	pub customer: Customer,
	pub created: bool,
}

/// Response for `GET /api/orders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListOrdersResponse {
	pub orders: Vec<CustomerOrderSummary>,
}

/// API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
	/// Additional error context
	pub details: Option<serde_json::Value>,
	/// Suggested retry delay in seconds
	#[serde(rename = "retryAfter")]
	pub retry_after: Option<u64>,
}

/// Structured API error type with appropriate HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Missing or malformed input (400)
	BadRequest { error_type: String, message: String },
	/// No logged-in customer for this caller (401)
	Unauthorized { error_type: String, message: String },
	/// Referenced request does not exist (404)
	NotFound { error_type: String, message: String },
	/// Operation not allowed in the request's current state (409)
	Conflict { error_type: String, message: String },
	/// The commerce platform rejected or failed the call (502)
	BadGateway { error_type: String, message: String },
	/// Service unavailable with optional retry information (503)
	ServiceUnavailable {
		error_type: String,
		message: String,
		retry_after: Option<u64>,
	},
	/// Internal server error (500)
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	pub fn bad_request(error_type: &str, message: impl Into<String>) -> Self {
		Self::BadRequest {
			error_type: error_type.to_string(),
			message: message.into(),
		}
	}

	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::Unauthorized { .. } => 401,
			APIError::NotFound { .. } => 404,
			APIError::Conflict { .. } => 409,
			APIError::BadGateway { .. } => 502,
			APIError::ServiceUnavailable { .. } => 503,
			APIError::InternalServerError { .. } => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		let (error_type, message, retry_after) = match self {
			APIError::BadRequest { error_type, message }
			| APIError::Unauthorized { error_type, message }
			| APIError::NotFound { error_type, message }
			| APIError::Conflict { error_type, message }
			| APIError::BadGateway { error_type, message }
			| APIError::InternalServerError { error_type, message } => (error_type, message, None),
			APIError::ServiceUnavailable {
				error_type,
				message,
				retry_after,
			} => (error_type, message, *retry_after),
		};
		ErrorResponse {
			error: error_type.clone(),
			message: message.clone(),
			details: None,
			retry_after,
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			APIError::Unauthorized { message, .. } => write!(f, "Unauthorized: {}", message),
			APIError::NotFound { message, .. } => write!(f, "Not Found: {}", message),
			APIError::Conflict { message, .. } => write!(f, "Conflict: {}", message),
			APIError::BadGateway { message, .. } => write!(f, "Bad Gateway: {}", message),
			APIError::ServiceUnavailable { message, .. } => {
				write!(f, "Service Unavailable: {}", message)
			},
			APIError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_status_codes() {
		assert_eq!(APIError::bad_request("MISSING_EMAIL", "email").status_code(), 400);
		let conflict = APIError::Conflict {
			error_type: "NOT_CANCELLABLE".into(),
			message: "paid".into(),
		};
		assert_eq!(conflict.status_code(), 409);
		assert_eq!(conflict.to_error_response().error, "NOT_CANCELLABLE");

		let unauthorized = APIError::Unauthorized {
			error_type: "NOT_LOGGED_IN".into(),
			message: "log in first".into(),
		};
		assert_eq!(unauthorized.status_code(), 401);
	}

	#[test]
	fn test_retry_after_serialized_in_camel_case() {
		let err = APIError::ServiceUnavailable {
			error_type: "UPSTREAM_DOWN".into(),
			message: "try later".into(),
			retry_after: Some(30),
		};
		let json = serde_json::to_value(err.to_error_response()).unwrap();
		assert_eq!(json["retryAfter"], 30);
	}
}
