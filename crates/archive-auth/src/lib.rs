//! Customer account authentication for the digitisation request system.
//!
//! Customers log in with the commerce platform's customer accounts
//! (OAuth 2.0 authorization code flow with PKCE). This crate builds the
//! authorization URL, completes the callback and keeps the resulting tokens
//! in an injectable [`TokenStore`], one record per login session. Access
//! tokens are refreshed when about to expire and used for Customer Account
//! API queries. The platform remains the identity provider.

use archive_storage::StorageError;
use archive_types::APIError;
use thiserror::Error;

pub mod customer_api;
pub mod endpoint;
pub mod pkce;
pub mod session;
pub mod store;

pub use customer_api::{
	CustomerApi, CustomerApiResponse, CustomerQuery, HttpCustomerApi, CUSTOMER_API_VERSION,
};
pub use endpoint::{HttpTokenEndpoint, TokenEndpoint, TokenGrant, TokenResponse};
pub use pkce::PkceSession;
pub use session::{CustomerIdentity, CustomerSession};
pub use store::{MemoryTokenStore, StorageTokenStore, StoredTokens, TokenStore};

/// Errors that can occur during customer authentication.
#[derive(Debug, Error)]
pub enum AuthError {
	/// The `state` returned to the callback is not the one we issued.
	#[error("OAuth state mismatch")]
	StateMismatch,
	/// No PKCE verifier is pending for this login; it expired or was used.
	#[error("Missing PKCE verifier, please log in again")]
	MissingVerifier,
	/// The token endpoint rejected the grant.
	#[error("Token exchange failed: {0}")]
	TokenExchange(String),
	#[error("Network error: {0}")]
	Network(String),
	#[error("Invalid token: {0}")]
	InvalidToken(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
}

impl From<AuthError> for APIError {
	fn from(err: AuthError) -> Self {
		let message = err.to_string();
		match err {
			AuthError::StateMismatch | AuthError::MissingVerifier => APIError::BadRequest {
				error_type: "INVALID_LOGIN".to_string(),
				message,
			},
			AuthError::TokenExchange(_) | AuthError::Network(_) | AuthError::InvalidToken(_) => {
				APIError::BadGateway {
					error_type: "AUTH_PROVIDER_ERROR".to_string(),
					message,
				}
			}
			AuthError::Configuration(_) | AuthError::Storage(_) => APIError::InternalServerError {
				error_type: "AUTH_ERROR".to_string(),
				message,
			},
		}
	}
}
