//! Customer session: login round trip, token refresh and logout.

use crate::customer_api::{CustomerApi, CustomerApiResponse, CustomerQuery};
use crate::pkce::random_hex;
use crate::{
	AuthError, PkceSession, StoredTokens, TokenEndpoint, TokenGrant, TokenResponse, TokenStore,
};
use archive_config::AuthConfig;
use archive_storage::StorageService;
use archive_types::{current_timestamp_millis, StorageKey};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Access tokens this close to expiry are refreshed before use.
const REFRESH_MARGIN_MS: i64 = 5 * 60 * 1000;

/// Random bytes in a session id; the id is their hex encoding.
const SESSION_ID_BYTES: usize = 32;

/// Whether `id` has the shape of an id issued by [`CustomerSession::handle_callback`].
fn is_session_id(id: &str) -> bool {
	id.len() == SESSION_ID_BYTES * 2 && id.chars().all(|c| c.is_ascii_hexdigit())
}

/// Who is logged in, as stated by the ID token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerIdentity {
	pub email: Option<String>,
	pub name: Option<String>,
	pub sub: Option<String>,
}

#[derive(Deserialize)]
struct IdTokenClaims {
	email: Option<String>,
	name: Option<String>,
	given_name: Option<String>,
	family_name: Option<String>,
	sub: Option<String>,
}

/// Reads the payload of a JWT without verifying it. The token came straight
/// from the token endpoint over TLS.
fn decode_id_token(token: &str) -> Result<CustomerIdentity, AuthError> {
	let payload = token
		.split('.')
		.nth(1)
		.ok_or_else(|| AuthError::InvalidToken("not a JWT".into()))?;
	let bytes = URL_SAFE_NO_PAD
		.decode(payload.trim_end_matches('='))
		.map_err(|e| AuthError::InvalidToken(e.to_string()))?;
	let claims: IdTokenClaims =
		serde_json::from_slice(&bytes).map_err(|e| AuthError::InvalidToken(e.to_string()))?;

	let name = claims.name.or_else(|| {
		let joined = [claims.given_name, claims.family_name]
			.into_iter()
			.flatten()
			.filter(|part| !part.is_empty())
			.collect::<Vec<_>>()
			.join(" ");
		Some(joined).filter(|n| !n.is_empty())
	});

	Ok(CustomerIdentity {
		email: claims.email,
		name,
		sub: claims.sub,
	})
}

fn tokens_from(response: TokenResponse) -> StoredTokens {
	StoredTokens {
		access_token: response.access_token,
		refresh_token: response.refresh_token,
		id_token: response.id_token,
		expires_at: current_timestamp_millis()
			.saturating_add(response.expires_in.saturating_mul(1000)),
	}
}

/// Customer logins against the platform's customer accounts.
///
/// Each completed login gets its own session id; every token operation is
/// scoped to the id the caller presents.
pub struct CustomerSession {
	settings: AuthConfig,
	tokens: Arc<dyn TokenStore>,
	/// Pending PKCE logins, keyed by the caller's login id.
	pending: Arc<StorageService>,
	endpoint: Arc<dyn TokenEndpoint>,
	customer_api: Arc<dyn CustomerApi>,
}

impl CustomerSession {
	pub fn new(
		settings: AuthConfig,
		tokens: Arc<dyn TokenStore>,
		pending: Arc<StorageService>,
		endpoint: Arc<dyn TokenEndpoint>,
		customer_api: Arc<dyn CustomerApi>,
	) -> Self {
		Self {
			settings,
			tokens,
			pending,
			endpoint,
			customer_api,
		}
	}

	async fn stored_tokens(&self, session_id: &str) -> Result<Option<StoredTokens>, AuthError> {
		if !is_session_id(session_id) {
			return Ok(None);
		}
		self.tokens.get(session_id).await
	}

	/// `https://shopify.com/authentication/<shop_id>` unless overridden.
	pub fn authentication_base_url(settings: &AuthConfig) -> String {
		settings
			.authentication_base_url
			.clone()
			.unwrap_or_else(|| format!("https://shopify.com/authentication/{}", settings.shop_id))
			.trim_end_matches('/')
			.to_string()
	}

	/// Token endpoint URL for `settings`.
	pub fn token_url(settings: &AuthConfig) -> String {
		format!("{}/oauth/token", Self::authentication_base_url(settings))
	}

	/// Starts a login for `login_id` and returns the URL to send the customer to.
	///
	/// The verifier, state and nonce are kept for `session_ttl_seconds`.
	pub async fn authorization_url(&self, login_id: &str) -> Result<String, AuthError> {
		let pkce = PkceSession::generate();
		let url = reqwest::Url::parse_with_params(
			&format!("{}/oauth/authorize", Self::authentication_base_url(&self.settings)),
			&[
				("client_id", self.settings.client_id.as_str()),
				("response_type", "code"),
				("redirect_uri", self.settings.redirect_uri.as_str()),
				("scope", self.settings.scope.as_str()),
				("state", pkce.state.as_str()),
				("nonce", pkce.nonce.as_str()),
				("code_challenge", pkce.challenge().as_str()),
				("code_challenge_method", "S256"),
			],
		)
		.map_err(|e| AuthError::Configuration(e.to_string()))?;

		self.pending
			.store_with_ttl(
				StorageKey::PkceSessions,
				login_id,
				&pkce,
				Some(Duration::from_secs(self.settings.session_ttl_seconds)),
			)
			.await?;
		Ok(url.into())
	}

	/// Completes a login: checks `state`, exchanges `code` and stores the
	/// tokens under a new session id, which is returned.
	///
	/// The pending login is consumed whether or not the exchange succeeds.
	pub async fn handle_callback(
		&self,
		login_id: &str,
		code: &str,
		state: &str,
	) -> Result<String, AuthError> {
		let pkce: PkceSession = self
			.pending
			.take(StorageKey::PkceSessions, login_id)
			.await?
			.ok_or(AuthError::MissingVerifier)?;
		if pkce.state != state {
			tracing::warn!("OAuth callback state did not match the pending login");
			return Err(AuthError::StateMismatch);
		}
		if pkce.verifier.is_empty() {
			return Err(AuthError::MissingVerifier);
		}

		let response = self
			.endpoint
			.exchange(&TokenGrant::AuthorizationCode {
				client_id: self.settings.client_id.clone(),
				code: code.to_string(),
				redirect_uri: self.settings.redirect_uri.clone(),
				code_verifier: pkce.verifier,
			})
			.await?;
		let session_id = random_hex(SESSION_ID_BYTES);
		self.tokens.set(&session_id, &tokens_from(response)).await?;
		tracing::info!("Customer logged in");
		Ok(session_id)
	}

	/// Returns a usable access token, refreshing it once if it is close to
	/// expiry. A failed refresh logs the customer out and yields `None`.
	pub async fn access_token(&self, session_id: &str) -> Result<Option<String>, AuthError> {
		let Some(tokens) = self.stored_tokens(session_id).await? else {
			return Ok(None);
		};
		if tokens.expires_at - current_timestamp_millis() > REFRESH_MARGIN_MS {
			return Ok(Some(tokens.access_token));
		}

		let refreshed = self
			.endpoint
			.exchange(&TokenGrant::RefreshToken {
				client_id: self.settings.client_id.clone(),
				refresh_token: tokens.refresh_token,
			})
			.await;
		match refreshed {
			Ok(response) => {
				let tokens = tokens_from(response);
				self.tokens.set(session_id, &tokens).await?;
				tracing::debug!("Refreshed customer access token");
				Ok(Some(tokens.access_token))
			}
			Err(e) => {
				tracing::warn!(error = %e, "Token refresh failed, clearing session");
				self.tokens.clear(session_id).await?;
				Ok(None)
			}
		}
	}

	/// Identity claims of the logged-in customer, if any can be read.
	pub async fn user(&self, session_id: &str) -> Result<Option<CustomerIdentity>, AuthError> {
		let Some(tokens) = self.stored_tokens(session_id).await? else {
			return Ok(None);
		};
		if tokens.id_token.is_empty() {
			return Ok(None);
		}
		Ok(decode_id_token(&tokens.id_token).ok())
	}

	/// Whether unexpired tokens are stored. Does not refresh.
	pub async fn is_authenticated(&self, session_id: &str) -> Result<bool, AuthError> {
		Ok(self
			.stored_tokens(session_id)
			.await?
			.is_some_and(|t| t.expires_at > current_timestamp_millis()))
	}

	/// Runs a Customer Account API query for the session's customer.
	///
	/// `None` when the session has no usable access token.
	pub async fn customer_query(
		&self,
		session_id: &str,
		request: &CustomerQuery,
	) -> Result<Option<CustomerApiResponse>, AuthError> {
		let Some(access_token) = self.access_token(session_id).await? else {
			return Ok(None);
		};
		Ok(Some(self.customer_api.query(&access_token, request).await?))
	}

	/// Clears the tokens. Returns the platform logout URL when an ID token
	/// was held, so the platform session ends too.
	pub async fn logout(
		&self,
		session_id: &str,
		post_logout_redirect_uri: &str,
	) -> Result<Option<String>, AuthError> {
		let Some(tokens) = self.stored_tokens(session_id).await? else {
			return Ok(None);
		};
		self.tokens.clear(session_id).await?;

		let Some(id_token) = Some(tokens.id_token).filter(|t| !t.is_empty()) else {
			return Ok(None);
		};
		let url = reqwest::Url::parse_with_params(
			&format!("{}/logout", Self::authentication_base_url(&self.settings)),
			&[
				("id_token_hint", id_token.as_str()),
				("post_logout_redirect_uri", post_logout_redirect_uri),
			],
		)
		.map_err(|e| AuthError::Configuration(e.to_string()))?;
		Ok(Some(url.into()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::MemoryTokenStore;
	use archive_storage::implementations::memory::MemoryStorage;
	use async_trait::async_trait;
	use std::sync::Mutex;

	/// Records grants and answers with fixed tokens, or fails.
	struct FakeEndpoint {
		fail: bool,
		grants: Mutex<Vec<TokenGrant>>,
	}

	impl FakeEndpoint {
		fn new(fail: bool) -> Arc<Self> {
			Arc::new(Self {
				fail,
				grants: Mutex::new(Vec::new()),
			})
		}

		fn grants(&self) -> Vec<TokenGrant> {
			self.grants.lock().unwrap().clone()
		}
	}

	#[async_trait]
	impl TokenEndpoint for FakeEndpoint {
		async fn exchange(&self, grant: &TokenGrant) -> Result<TokenResponse, AuthError> {
			self.grants.lock().unwrap().push(grant.clone());
			if self.fail {
				return Err(AuthError::TokenExchange("400: invalid_grant".into()));
			}
			Ok(TokenResponse {
				access_token: "fresh-access".into(),
				refresh_token: "fresh-refresh".into(),
				id_token: id_token(),
				expires_in: 3600,
			})
		}
	}

	/// Echoes the access token it was called with.
	struct EchoCustomerApi;

	#[async_trait]
	impl CustomerApi for EchoCustomerApi {
		async fn query(
			&self,
			access_token: &str,
			request: &CustomerQuery,
		) -> Result<CustomerApiResponse, AuthError> {
			Ok(CustomerApiResponse {
				status: 200,
				body: serde_json::json!({ "token": access_token, "query": request.query }),
			})
		}
	}

	fn id_token() -> String {
		let payload = URL_SAFE_NO_PAD
			.encode(r#"{"email":"a@example.com","given_name":"Ada","family_name":"Lovelace","sub":"gid://customer/1"}"#);
		format!("eyJhbGciOiJub25lIn0.{}.sig", payload)
	}

	fn settings() -> AuthConfig {
		AuthConfig {
			client_id: "client-1".into(),
			shop_id: "4242".into(),
			redirect_uri: "https://archive.example/account/callback".into(),
			scope: "openid email customer-account-api:full".into(),
			session_ttl_seconds: 600,
			authentication_base_url: None,
		}
	}

	fn session(endpoint: Arc<FakeEndpoint>) -> (CustomerSession, Arc<MemoryTokenStore>) {
		let tokens = Arc::new(MemoryTokenStore::new());
		let pending = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		(
			CustomerSession::new(
				settings(),
				tokens.clone(),
				pending,
				endpoint,
				Arc::new(EchoCustomerApi),
			),
			tokens,
		)
	}

	/// A well-formed session id for tokens placed directly in the store.
	fn sid(n: u8) -> String {
		format!("{:02x}", n).repeat(SESSION_ID_BYTES)
	}

	fn stored(expires_in_ms: i64) -> StoredTokens {
		StoredTokens {
			access_token: "old-access".into(),
			refresh_token: "old-refresh".into(),
			id_token: id_token(),
			expires_at: current_timestamp_millis() + expires_in_ms,
		}
	}

	fn query_param(url: &str, name: &str) -> Option<String> {
		reqwest::Url::parse(url)
			.unwrap()
			.query_pairs()
			.find(|(k, _)| k == name)
			.map(|(_, v)| v.into_owned())
	}

	#[tokio::test]
	async fn test_login_round_trip() {
		let endpoint = FakeEndpoint::new(false);
		let (session, tokens) = session(endpoint.clone());

		let url = session.authorization_url("login-1").await.unwrap();
		assert!(url.starts_with("https://shopify.com/authentication/4242/oauth/authorize?"));
		assert_eq!(query_param(&url, "code_challenge_method").as_deref(), Some("S256"));
		assert_eq!(
			query_param(&url, "scope").as_deref(),
			Some("openid email customer-account-api:full")
		);
		let state = query_param(&url, "state").unwrap();

		let session_id = session
			.handle_callback("login-1", "auth-code", &state)
			.await
			.unwrap();
		assert!(is_session_id(&session_id));
		assert_eq!(
			tokens.get(&session_id).await.unwrap().unwrap().access_token,
			"fresh-access"
		);
		assert!(session.is_authenticated(&session_id).await.unwrap());

		match &endpoint.grants()[0] {
			TokenGrant::AuthorizationCode {
				code,
				code_verifier,
				..
			} => {
				assert_eq!(code, "auth-code");
				assert_eq!(code_verifier.len(), 128);
			}
			other => panic!("unexpected grant {:?}", other),
		}

		// The pending login is single use.
		assert!(matches!(
			session.handle_callback("login-1", "auth-code", &state).await,
			Err(AuthError::MissingVerifier)
		));
	}

	#[tokio::test]
	async fn test_logins_are_isolated() {
		let (session, _) = session(FakeEndpoint::new(false));

		let url = session.authorization_url("alice-login").await.unwrap();
		let state = query_param(&url, "state").unwrap();
		let alice = session
			.handle_callback("alice-login", "code", &state)
			.await
			.unwrap();

		let url = session.authorization_url("bob-login").await.unwrap();
		let state = query_param(&url, "state").unwrap();
		let bob = session
			.handle_callback("bob-login", "code", &state)
			.await
			.unwrap();
		assert_ne!(alice, bob);

		// A caller without a session id, or with a made-up one, sees nobody.
		let unknown = sid(9);
		for anonymous in ["", "current", "alice-login", unknown.as_str()] {
			assert!(!session.is_authenticated(anonymous).await.unwrap());
			assert!(session.user(anonymous).await.unwrap().is_none());
			assert!(session.access_token(anonymous).await.unwrap().is_none());
			assert!(session
				.logout(anonymous, "https://archive.example")
				.await
				.unwrap()
				.is_none());
		}
		assert!(session.is_authenticated(&alice).await.unwrap());

		// Logging one customer out leaves the other logged in.
		assert!(session
			.logout(&bob, "https://archive.example")
			.await
			.unwrap()
			.is_some());
		assert!(!session.is_authenticated(&bob).await.unwrap());
		assert!(session.is_authenticated(&alice).await.unwrap());
	}

	#[tokio::test]
	async fn test_state_mismatch_rejected() {
		let (session, _) = session(FakeEndpoint::new(false));
		session.authorization_url("login-1").await.unwrap();

		assert!(matches!(
			session.handle_callback("login-1", "code", "forged").await,
			Err(AuthError::StateMismatch)
		));
	}

	#[tokio::test]
	async fn test_fresh_token_not_refreshed() {
		let endpoint = FakeEndpoint::new(false);
		let (session, tokens) = session(endpoint.clone());
		tokens.set(&sid(1), &stored(60 * 60 * 1000)).await.unwrap();

		assert_eq!(
			session.access_token(&sid(1)).await.unwrap().as_deref(),
			Some("old-access")
		);
		assert!(endpoint.grants().is_empty());
	}

	#[tokio::test]
	async fn test_near_expiry_refreshed_once() {
		let endpoint = FakeEndpoint::new(false);
		let (session, tokens) = session(endpoint.clone());
		tokens.set(&sid(1), &stored(60 * 1000)).await.unwrap();

		assert_eq!(
			session.access_token(&sid(1)).await.unwrap().as_deref(),
			Some("fresh-access")
		);
		assert_eq!(
			endpoint.grants(),
			vec![TokenGrant::RefreshToken {
				client_id: "client-1".into(),
				refresh_token: "old-refresh".into(),
			}]
		);
		assert_eq!(
			tokens.get(&sid(1)).await.unwrap().unwrap().refresh_token,
			"fresh-refresh"
		);
	}

	#[tokio::test]
	async fn test_failed_refresh_clears_tokens() {
		let endpoint = FakeEndpoint::new(true);
		let (session, tokens) = session(endpoint.clone());
		tokens.set(&sid(1), &stored(-1000)).await.unwrap();

		assert!(session.access_token(&sid(1)).await.unwrap().is_none());
		assert!(tokens.get(&sid(1)).await.unwrap().is_none());
		assert_eq!(endpoint.grants().len(), 1);
		assert!(!session.is_authenticated(&sid(1)).await.unwrap());
	}

	#[tokio::test]
	async fn test_user_from_id_token() {
		let (session, tokens) = session(FakeEndpoint::new(false));
		assert!(session.user(&sid(1)).await.unwrap().is_none());

		tokens.set(&sid(1), &stored(60 * 60 * 1000)).await.unwrap();
		let user = session.user(&sid(1)).await.unwrap().unwrap();
		assert_eq!(user.email.as_deref(), Some("a@example.com"));
		assert_eq!(user.name.as_deref(), Some("Ada Lovelace"));
		assert_eq!(user.sub.as_deref(), Some("gid://customer/1"));
	}

	#[tokio::test]
	async fn test_logout_url_carries_id_token() {
		let (session, tokens) = session(FakeEndpoint::new(false));
		tokens.set(&sid(1), &stored(60 * 60 * 1000)).await.unwrap();

		let url = session
			.logout(&sid(1), "https://archive.example")
			.await
			.unwrap()
			.unwrap();
		assert!(url.starts_with("https://shopify.com/authentication/4242/logout?"));
		assert_eq!(query_param(&url, "id_token_hint"), Some(id_token()));
		assert!(tokens.get(&sid(1)).await.unwrap().is_none());

		assert!(session
			.logout(&sid(1), "https://archive.example")
			.await
			.unwrap()
			.is_none());
	}

	#[tokio::test]
	async fn test_customer_query_uses_session_token() {
		let endpoint = FakeEndpoint::new(false);
		let (session, tokens) = session(endpoint.clone());
		let request = CustomerQuery {
			query: "{ customer { id } }".into(),
			variables: None,
		};

		assert!(session
			.customer_query(&sid(1), &request)
			.await
			.unwrap()
			.is_none());

		tokens.set(&sid(1), &stored(60 * 1000)).await.unwrap();
		let response = session
			.customer_query(&sid(1), &request)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(response.status, 200);
		assert_eq!(response.body["token"], "fresh-access");
		assert_eq!(response.body["query"], "{ customer { id } }");
		assert_eq!(endpoint.grants().len(), 1);
	}

	#[test]
	fn test_malformed_id_token() {
		assert!(decode_id_token("not-a-jwt").is_err());
		assert!(decode_id_token("a.!!!.c").is_err());
	}
}
