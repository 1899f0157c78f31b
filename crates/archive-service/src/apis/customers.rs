//! Customer sync endpoint.

use archive_core::RequestEngine;
use archive_types::{APIError, SyncCustomerRequest, SyncCustomerResponse};

/// Handles POST /api/customers/sync.
pub async fn sync_customer(
	engine: &RequestEngine,
	request: SyncCustomerRequest,
) -> Result<SyncCustomerResponse, APIError> {
	let (customer, created) = engine
		.sync_customer(
			&request.email,
			request.first_name.as_deref(),
			request.last_name.as_deref(),
		)
		.await?;
	Ok(SyncCustomerResponse { customer, created })
}
