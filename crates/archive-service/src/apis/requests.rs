//! Digitisation request endpoints.

use archive_core::RequestEngine;
use archive_types::{
	APIError, CancelledRequestData, CreateRequestResponse, DigitisationRequest,
	ListRequestsResponse, NewRequest,
};
use tracing::info;

/// Handles POST /api/requests.
pub async fn create_request(
	engine: &RequestEngine,
	request: NewRequest,
) -> Result<CreateRequestResponse, APIError> {
	let outcome = engine.create_request(request).await?;
	info!(
		request = %outcome.request.name,
		bundled = outcome.bundled,
		"Request submitted"
	);
	Ok(CreateRequestResponse {
		bundled: outcome.bundled,
		request: outcome.request,
	})
}

/// Handles GET /api/requests?email=.
pub async fn list_requests(
	engine: &RequestEngine,
	email: &str,
) -> Result<ListRequestsResponse, APIError> {
	let requests = engine.get_requests(email).await?;
	Ok(ListRequestsResponse { requests })
}

/// Handles DELETE /api/requests/{id}.
pub async fn cancel_request(
	engine: &RequestEngine,
	id: u64,
) -> Result<CancelledRequestData, APIError> {
	Ok(engine.cancel_request(id).await?)
}

/// Handles POST /api/requests/recreate.
pub async fn recreate_request(
	engine: &RequestEngine,
	data: CancelledRequestData,
) -> Result<DigitisationRequest, APIError> {
	Ok(engine.recreate_request(&data).await?)
}
