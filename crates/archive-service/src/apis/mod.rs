//! Handlers for the digitisation request HTTP API.
//!
//! Each module turns validated request bodies into engine calls and engine
//! results into response bodies. Routing lives in `server`.

use archive_types::APIError;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum::Json;

pub mod auth;
pub mod customers;
pub mod orders;
pub mod requests;

/// Unwraps a JSON body, reporting malformed input as a 400.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, APIError> {
	payload
		.map(|Json(body)| body)
		.map_err(|e| APIError::bad_request("INVALID_BODY", e.body_text()))
}

/// Unwraps a query string, reporting malformed input as a 400.
pub fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, APIError> {
	query
		.map(|Query(params)| params)
		.map_err(|e| APIError::bad_request("INVALID_QUERY", e.body_text()))
}

/// Unwraps a path parameter, reporting malformed input as a 400.
pub fn path_param<T>(path: Result<Path<T>, PathRejection>) -> Result<T, APIError> {
	path.map(|Path(value)| value)
		.map_err(|e| APIError::bad_request("INVALID_PATH", e.body_text()))
}

/// The `email` query parameter, which every customer-scoped read requires.
pub fn required_email(email: Option<String>) -> Result<String, APIError> {
	email
		.map(|e| e.trim().to_string())
		.filter(|e| !e.is_empty())
		.ok_or_else(|| APIError::bad_request("MISSING_EMAIL", "Email query parameter is required"))
}
