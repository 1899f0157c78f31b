//! Customer Account API GraphQL client.
//!
//! Queries run with the logged-in customer's access token. Upstream answers,
//! including non-2xx ones, are handed back with their status so callers can
//! relay them unchanged.

use crate::AuthError;
use archive_config::AuthConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Customer Account API version queried.
pub const CUSTOMER_API_VERSION: &str = "2025-01";

/// A GraphQL document with its variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerQuery {
	pub query: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub variables: Option<Value>,
}

/// Status and JSON body returned by the Customer Account API.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerApiResponse {
	pub status: u16,
	pub body: Value,
}

/// Runs customer-scoped GraphQL queries.
#[async_trait]
pub trait CustomerApi: Send + Sync {
	async fn query(
		&self,
		access_token: &str,
		request: &CustomerQuery,
	) -> Result<CustomerApiResponse, AuthError>;
}

/// Customer Account API reached over HTTP.
pub struct HttpCustomerApi {
	client: reqwest::Client,
	url: String,
	/// Sent as `Origin`; the platform checks it against the store domain.
	origin: Option<String>,
}

impl HttpCustomerApi {
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

	/// `https://shopify.com/<shop_id>/account/customer/api/<version>/graphql`.
	pub fn graphql_url(settings: &AuthConfig) -> String {
		format!(
			"https://shopify.com/{}/account/customer/api/{}/graphql",
			settings.shop_id, CUSTOMER_API_VERSION
		)
	}
}

#[async_trait]
impl CustomerApi for HttpCustomerApi {
	async fn query(
		&self,
		access_token: &str,
		request: &CustomerQuery,
	) -> Result<CustomerApiResponse, AuthError> {
		let mut builder = self
			.client
			.post(&self.url)
			.header(reqwest::header::AUTHORIZATION, access_token)
			.json(request);
		if let Some(origin) = &self.origin {
			builder = builder.header(reqwest::header::ORIGIN, origin);
		}

		let response = builder
			.send()
			.await
			.map_err(|e| AuthError::Network(e.to_string()))?;
		let status = response.status().as_u16();
		let text = response
			.text()
			.await
			.map_err(|e| AuthError::Network(e.to_string()))?;
		tracing::debug!(status, "Customer API answered");

		let body: Value =
			serde_json::from_str(&text).unwrap_or_else(|_| serde_json::json!({ "error": text }));
		Ok(CustomerApiResponse { status, body })
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tokio::io::{AsyncReadExt, AsyncWriteExt};
	use tokio::net::TcpListener;

	/// Serves one canned HTTP response and returns the raw request it saw.
	async fn serve_once(
		status_line: &str,
		body: &str,
	) -> (String, tokio::task::JoinHandle<String>) {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let url = format!("http://{}/graphql", listener.local_addr().unwrap());
		let response = format!(
			"HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
			status_line,
			body.len(),
			body
		);
		let handle = tokio::spawn(async move {
			let (mut socket, _) = listener.accept().await.unwrap();
			let mut seen = Vec::new();
			let mut buf = [0u8; 4096];
			loop {
				let n = socket.read(&mut buf).await.unwrap();
				seen.extend_from_slice(&buf[..n]);
				let text = String::from_utf8_lossy(&seen);
				if let Some(end) = text.find("\r\n\r\n") {
					let length = text[..end]
						.lines()
						.find_map(|l| {
							l.to_ascii_lowercase()
								.strip_prefix("content-length:")
								.map(|v| v.trim().parse::<usize>().unwrap())
						})
						.unwrap_or(0);
					if seen.len() >= end + 4 + length {
						break;
					}
				}
				if n == 0 {
					break;
				}
			}
			socket.write_all(response.as_bytes()).await.unwrap();
			String::from_utf8_lossy(&seen).into_owned()
		});
		(url, handle)
	}

	fn query() -> CustomerQuery {
		CustomerQuery {
			query: "{ customer { emailAddress { emailAddress } } }".into(),
			variables: Some(serde_json::json!({ "first": 5 })),
		}
	}

	#[tokio::test]
	async fn test_query_sends_token_and_origin() {
		let (url, server) = serve_once("200 OK", r#"{"data":{"customer":null}}"#).await;
		let api = HttpCustomerApi::new(url, Some("https://archive.myshopify.com".into())).unwrap();

		let response = api.query("shcat_token", &query()).await.unwrap();
		assert_eq!(response.status, 200);
		assert_eq!(response.body["data"]["customer"], Value::Null);

		let request = server.await.unwrap().to_ascii_lowercase();
		assert!(request.contains("authorization: shcat_token"));
		assert!(request.contains("origin: https://archive.myshopify.com"));
		assert!(request.contains("\"variables\":{\"first\":5}"));
	}

	#[tokio::test]
	async fn test_upstream_error_passed_back() {
		let (url, server) =
			serve_once("401 Unauthorized", r#"{"errors":[{"message":"expired"}]}"#).await;
		let api = HttpCustomerApi::new(url, None).unwrap();

		let response = api.query("shcat_token", &query()).await.unwrap();
		assert_eq!(response.status, 401);
		assert_eq!(response.body["errors"][0]["message"], "expired");
		server.await.unwrap();
	}

	#[test]
	fn test_graphql_url() {
		let settings = AuthConfig {
			client_id: "client".into(),
			shop_id: "4242".into(),
			redirect_uri: "https://archive.example/cb".into(),
			scope: "openid".into(),
			session_ttl_seconds: 600,
			authentication_base_url: None,
		};
		assert_eq!(
			HttpCustomerApi::graphql_url(&settings),
			"https://shopify.com/4242/account/customer/api/2025-01/graphql"
		);
	}
}
