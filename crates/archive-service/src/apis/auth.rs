//! Customer account login endpoints.
//!
//! The browser keeps an opaque login id between the redirect to the platform
//! and the callback; the PKCE verifier for that login stays server-side.
//! A completed login is tracked by an HttpOnly session cookie, and every
//! later call only sees the tokens of the session it presents.

use archive_auth::{CustomerIdentity, CustomerQuery, CustomerSession};
use archive_types::APIError;
use axum::http::{header, HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cookie carrying the customer session id.
pub const SESSION_COOKIE: &str = "archive_session";

/// Session id from the request's cookies, if one was sent.
pub fn session_id(headers: &HeaderMap) -> Option<String> {
	headers
		.get_all(header::COOKIE)
		.iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(|cookies| cookies.split(';'))
		.filter_map(|pair| pair.trim().split_once('='))
		.find(|(name, _)| *name == SESSION_COOKIE)
		.map(|(_, value)| value.trim().to_string())
		.filter(|value| !value.is_empty())
}

/// `Set-Cookie` value handing `session_id` to the browser.
pub fn session_cookie(session_id: &str) -> String {
	format!(
		"{}={}; Path=/api; HttpOnly; Secure; SameSite=Lax",
		SESSION_COOKIE, session_id
	)
}

/// `Set-Cookie` value removing the session cookie.
pub fn cleared_session_cookie() -> String {
	format!(
		"{}=; Path=/api; HttpOnly; Secure; SameSite=Lax; Max-Age=0",
		SESSION_COOKIE
	)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginQuery {
	pub login_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
	pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackRequest {
	pub login_id: String,
	pub code: String,
	pub state: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
	pub authenticated: bool,
	pub user: Option<CustomerIdentity>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
	#[serde(default)]
	pub post_logout_redirect_uri: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutResponse {
	pub logout_url: Option<String>,
}

/// Handles GET /api/auth/login?loginId=.
pub async fn login(
	session: &CustomerSession,
	query: LoginQuery,
) -> Result<LoginResponse, APIError> {
	let login_id = query
		.login_id
		.filter(|id| !id.trim().is_empty())
		.ok_or_else(|| APIError::bad_request("MISSING_LOGIN_ID", "loginId is required"))?;
	let url = session.authorization_url(&login_id).await?;
	Ok(LoginResponse { url })
}

/// Handles POST /api/auth/callback. Returns the new session id with the
/// session it opened.
pub async fn callback(
	session: &CustomerSession,
	request: CallbackRequest,
) -> Result<(String, SessionResponse), APIError> {
	let session_id = session
		.handle_callback(&request.login_id, &request.code, &request.state)
		.await?;
	let user = session.user(&session_id).await?;
	Ok((
		session_id,
		SessionResponse {
			authenticated: true,
			user,
		},
	))
}

/// Handles GET /api/auth/session. Refreshes the access token when due.
pub async fn current_session(
	session: &CustomerSession,
	session_id: &str,
) -> Result<SessionResponse, APIError> {
	if session.access_token(session_id).await?.is_none() {
		return Ok(SessionResponse {
			authenticated: false,
			user: None,
		});
	}
	Ok(SessionResponse {
		authenticated: true,
		user: session.user(session_id).await?,
	})
}

/// Handles POST /api/auth/logout.
pub async fn logout(
	session: &CustomerSession,
	session_id: &str,
	request: LogoutRequest,
) -> Result<LogoutResponse, APIError> {
	let logout_url = session
		.logout(session_id, &request.post_logout_redirect_uri)
		.await?;
	Ok(LogoutResponse { logout_url })
}

/// Handles POST /api/auth/customer-graphql.
///
/// Answers with the upstream status and body, including upstream errors.
pub async fn customer_graphql(
	session: &CustomerSession,
	session_id: &str,
	request: CustomerQuery,
) -> Result<(StatusCode, Value), APIError> {
	if request.query.trim().is_empty() {
		return Err(APIError::bad_request("MISSING_QUERY", "query is required"));
	}
	let response = session
		.customer_query(session_id, &request)
		.await?
		.ok_or_else(|| APIError::Unauthorized {
			error_type: "NOT_LOGGED_IN".to_string(),
			message: "Missing access token".to_string(),
		})?;
	let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
	Ok((status, response.body))
}
