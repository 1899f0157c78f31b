//! HTTP server for the digitisation request API.
//!
//! All routes live under `/api`. The customer account routes are only
//! mounted when an `[auth]` section is configured.

use crate::apis::{self, auth as auth_api, json_body, path_param, query_params, required_email};
use archive_auth::{CustomerQuery, CustomerSession};
use archive_config::{ApiConfig, Config};
use archive_core::RequestEngine;
use archive_types::{
	APIError, CancelledRequestData, CreateRequestResponse, DigitisationRequest, EmailQuery,
	ListOrdersResponse, ListRequestsResponse, NewRequest, SyncCustomerRequest,
	SyncCustomerResponse,
};
use axum::{
	extract::{
		rejection::{JsonRejection, PathRejection, QueryRejection},
		DefaultBodyLimit, Path, Query, State,
	},
	http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
	response::Json,
	routing::{delete, get, post},
	Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Engine serving every request operation.
	pub engine: Arc<RequestEngine>,
	/// Complete configuration.
	pub config: Config,
	/// Customer login state, when customer accounts are configured.
	pub session: Option<Arc<CustomerSession>>,
}

/// Builds the router with all routes and middleware.
pub fn router(state: AppState, api_config: &ApiConfig) -> Router {
	let mut api = Router::new()
		.route("/health", get(handle_health))
		.route("/requests", post(handle_create_request).get(handle_list_requests))
		.route("/requests/recreate", post(handle_recreate_request))
		.route("/requests/{id}", delete(handle_cancel_request))
		.route("/customers/sync", post(handle_sync_customer))
		.route("/orders", get(handle_list_orders));

	if state.session.is_some() {
		api = api
			.route("/auth/login", get(handle_login))
			.route("/auth/callback", post(handle_callback))
			.route("/auth/session", get(handle_session))
			.route("/auth/logout", post(handle_logout))
			.route("/auth/customer-graphql", post(handle_customer_graphql));
	}

	Router::new()
		.nest("/api", api)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(cors_layer(api_config))
				.layer(TimeoutLayer::new(Duration::from_secs(api_config.timeout_seconds)))
				.layer(DefaultBodyLimit::max(api_config.max_request_size)),
		)
		.with_state(state)
}

/// Permissive unless specific origins are configured.
fn cors_layer(api_config: &ApiConfig) -> CorsLayer {
	let Some(cors) = api_config
		.cors
		.as_ref()
		.filter(|c| !c.allowed_origins.is_empty())
	else {
		return CorsLayer::permissive();
	};

	let origins: Vec<HeaderValue> = cors
		.allowed_origins
		.iter()
		.filter_map(|origin| match HeaderValue::from_str(origin) {
			Ok(value) => Some(value),
			Err(_) => {
				tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
				None
			}
		})
		.collect();

	CorsLayer::new()
		.allow_origin(AllowOrigin::list(origins))
		.allow_methods(Any)
		.allow_headers(Any)
}

/// Starts the HTTP server for the API.
pub async fn start_server(
	api_config: ApiConfig,
	state: AppState,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(state, &api_config);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Archive request API server starting on {}", bind_address);

	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown_signal())
		.await?;

	Ok(())
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!("Failed to listen for shutdown signal: {}", e);
	}
}

/// Handles GET /api/health.
async fn handle_health(State(state): State<AppState>) -> Json<Value> {
	Json(json!({
		"status": "ok",
		"service": state.config.service.id,
	}))
}

/// Handles POST /api/requests.
///
/// Answers 201 when a new request was created and 200 when the item was
/// bundled into an existing one.
async fn handle_create_request(
	State(state): State<AppState>,
	payload: Result<Json<NewRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateRequestResponse>), APIError> {
	let request = json_body(payload)?;
	match apis::requests::create_request(&state.engine, request).await {
		Ok(response) => {
			let status = if response.bundled {
				StatusCode::OK
			} else {
				StatusCode::CREATED
			};
			Ok((status, Json(response)))
		}
		Err(e) => {
			tracing::warn!("Request submission failed: {}", e);
			Err(e)
		}
	}
}

/// Handles GET /api/requests?email=.
async fn handle_list_requests(
	State(state): State<AppState>,
	query: Result<Query<EmailQuery>, QueryRejection>,
) -> Result<Json<ListRequestsResponse>, APIError> {
	let email = required_email(query_params(query)?.email)?;
	match apis::requests::list_requests(&state.engine, &email).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Request listing failed: {}", e);
			Err(e)
		}
	}
}

/// Handles DELETE /api/requests/{id}.
async fn handle_cancel_request(
	State(state): State<AppState>,
	id: Result<Path<u64>, PathRejection>,
) -> Result<Json<CancelledRequestData>, APIError> {
	let id = path_param(id)?;
	match apis::requests::cancel_request(&state.engine, id).await {
		Ok(data) => Ok(Json(data)),
		Err(e) => {
			tracing::warn!("Request cancellation failed: {}", e);
			Err(e)
		}
	}
}

/// Handles POST /api/requests/recreate.
async fn handle_recreate_request(
	State(state): State<AppState>,
	payload: Result<Json<CancelledRequestData>, JsonRejection>,
) -> Result<(StatusCode, Json<DigitisationRequest>), APIError> {
	let data = json_body(payload)?;
	match apis::requests::recreate_request(&state.engine, data).await {
		Ok(request) => Ok((StatusCode::CREATED, Json(request))),
		Err(e) => {
			tracing::warn!("Request recreation failed: {}", e);
			Err(e)
		}
	}
}

/// Handles POST /api/customers/sync.
async fn handle_sync_customer(
	State(state): State<AppState>,
	payload: Result<Json<SyncCustomerRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SyncCustomerResponse>), APIError> {
	let request = json_body(payload)?;
	match apis::customers::sync_customer(&state.engine, request).await {
		Ok(response) => {
			let status = if response.created {
				StatusCode::CREATED
			} else {
				StatusCode::OK
			};
			Ok((status, Json(response)))
		}
		Err(e) => {
			tracing::warn!("Customer sync failed: {}", e);
			Err(e)
		}
	}
}

/// Handles GET /api/orders?email=.
async fn handle_list_orders(
	State(state): State<AppState>,
	query: Result<Query<EmailQuery>, QueryRejection>,
) -> Result<Json<ListOrdersResponse>, APIError> {
	let email = required_email(query_params(query)?.email)?;
	match apis::orders::list_orders(&state.engine, &email).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Order history failed: {}", e);
			Err(e)
		}
	}
}

fn session(state: &AppState) -> Result<&CustomerSession, APIError> {
	state
		.session
		.as_deref()
		.ok_or_else(|| APIError::ServiceUnavailable {
			error_type: "AUTH_NOT_CONFIGURED".to_string(),
			message: "Customer accounts are not configured".to_string(),
			retry_after: None,
		})
}

/// Handles GET /api/auth/login?loginId=.
async fn handle_login(
	State(state): State<AppState>,
	query: Result<Query<auth_api::LoginQuery>, QueryRejection>,
) -> Result<Json<auth_api::LoginResponse>, APIError> {
	let query = query_params(query)?;
	Ok(Json(auth_api::login(session(&state)?, query).await?))
}

/// Handles POST /api/auth/callback.
///
/// Sets the session cookie for the login it completes.
async fn handle_callback(
	State(state): State<AppState>,
	payload: Result<Json<auth_api::CallbackRequest>, JsonRejection>,
) -> Result<([(HeaderName, String); 1], Json<auth_api::SessionResponse>), APIError> {
	let request = json_body(payload)?;
	match auth_api::callback(session(&state)?, request).await {
		Ok((session_id, response)) => Ok((
			[(header::SET_COOKIE, auth_api::session_cookie(&session_id))],
			Json(response),
		)),
		Err(e) => {
			tracing::warn!("Login callback failed: {}", e);
			Err(e)
		}
	}
}

/// Handles GET /api/auth/session.
async fn handle_session(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<auth_api::SessionResponse>, APIError> {
	let session_id = auth_api::session_id(&headers).unwrap_or_default();
	Ok(Json(
		auth_api::current_session(session(&state)?, &session_id).await?,
	))
}

/// Handles POST /api/auth/logout.
async fn handle_logout(
	State(state): State<AppState>,
	headers: HeaderMap,
	payload: Option<Json<auth_api::LogoutRequest>>,
) -> Result<([(HeaderName, String); 1], Json<auth_api::LogoutResponse>), APIError> {
	let request = payload.map(|Json(body)| body).unwrap_or_default();
	let session_id = auth_api::session_id(&headers).unwrap_or_default();
	let response = auth_api::logout(session(&state)?, &session_id, request).await?;
	Ok((
		[(header::SET_COOKIE, auth_api::cleared_session_cookie())],
		Json(response),
	))
}

/// Handles POST /api/auth/customer-graphql.
async fn handle_customer_graphql(
	State(state): State<AppState>,
	headers: HeaderMap,
	payload: Result<Json<CustomerQuery>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), APIError> {
	let request = json_body(payload)?;
	let session_id = auth_api::session_id(&headers).unwrap_or_default();
	match auth_api::customer_graphql(session(&state)?, &session_id, request).await {
		Ok((status, body)) => Ok((status, Json(body))),
		Err(e) => {
			tracing::warn!("Customer API query failed: {}", e);
			Err(e)
		}
	}
}
