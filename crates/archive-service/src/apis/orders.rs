//! Order history endpoint.

use archive_core::RequestEngine;
use archive_types::{APIError, ListOrdersResponse};

/// Handles GET /api/orders?email=.
pub async fn list_orders(
	engine: &RequestEngine,
	email: &str,
) -> Result<ListOrdersResponse, APIError> {
	let orders = engine.get_orders(email).await?;
	Ok(ListOrdersResponse { orders })
}
