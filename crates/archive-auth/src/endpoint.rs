//! OAuth token endpoint.

use crate::AuthError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// A grant presented to the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenGrant {
	AuthorizationCode {
		client_id: String,
		code: String,
		redirect_uri: String,
		code_verifier: String,
	},
	RefreshToken {
		client_id: String,
		refresh_token: String,
	},
}

impl TokenGrant {
	/// Form fields of the grant.
	pub fn form(&self) -> Vec<(&'static str, &str)> {
		match self {
			TokenGrant::AuthorizationCode {
				client_id,
				code,
				redirect_uri,
				code_verifier,
			} => vec![
				("grant_type", "authorization_code"),
				("client_id", client_id.as_str()),
				("code", code.as_str()),
				("redirect_uri", redirect_uri.as_str()),
				("code_verifier", code_verifier.as_str()),
			],
			TokenGrant::RefreshToken {
				client_id,
				refresh_token,
			} => vec![
				("grant_type", "refresh_token"),
				("client_id", client_id.as_str()),
				("refresh_token", refresh_token.as_str()),
			],
		}
	}
}

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
	pub access_token: String,
	pub refresh_token: String,
	#[serde(default)]
	pub id_token: String,
	/// Lifetime of the access token in seconds.
	pub expires_in: i64,
}

impl std::fmt::Debug for TokenResponse {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TokenResponse")
			.field("expires_in", &self.expires_in)
			.finish_non_exhaustive()
	}
}

/// Exchanges grants for tokens.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
	async fn exchange(&self, grant: &TokenGrant) -> Result<TokenResponse, AuthError>;
}

/// Token endpoint reached over HTTP with a form-encoded body.
pub struct HttpTokenEndpoint {
	client: reqwest::Client,
	url: String,
	/// Sent as `Origin`; the platform checks it against the store domain.
	origin: Option<String>,
}

impl HttpTokenEndpoint {
	pub fn new(url: impl Into<String>, origin: Option<String>) -> Result<Self, AuthError> {
		let client = reqwest::Client::builder()
			.timeout(Duration::from_secs(30))
			.build()
			.map_err(|e| AuthError::Configuration(e.to_string()))?;
		Ok(Self {
			client,
			url: url.into(),
			origin,
		})
	}
}

#[async_trait]
impl TokenEndpoint for HttpTokenEndpoint {
	async fn exchange(&self, grant: &TokenGrant) -> Result<TokenResponse, AuthError> {
		let mut request = self.client.post(&self.url).form(&grant.form());
		if let Some(origin) = &self.origin {
			request = request.header(reqwest::header::ORIGIN, origin);
		}

		let response = request
			.send()
			.await
			.map_err(|e| AuthError::Network(e.to_string()))?;
		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(AuthError::TokenExchange(format!("{}: {}", status.as_u16(), body)));
		}

		response
			.json::<TokenResponse>()
			.await
			.map_err(|e| AuthError::TokenExchange(e.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_refresh_form() {
		let grant = TokenGrant::RefreshToken {
			client_id: "client".into(),
			refresh_token: "r1".into(),
		};
		assert_eq!(
			grant.form(),
			vec![
				("grant_type", "refresh_token"),
				("client_id", "client"),
				("refresh_token", "r1"),
			]
		);
	}

	#[test]
	fn test_token_response_without_id_token() {
		let response: TokenResponse = serde_json::from_str(
			r#"{"access_token":"a","refresh_token":"r","expires_in":3600}"#,
		)
		.unwrap();
		assert_eq!(response.id_token, "");
		assert_eq!(response.expires_in, 3600);
	}
}
