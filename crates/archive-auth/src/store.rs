//! Token persistence.

use crate::AuthError;
use archive_storage::StorageService;
use archive_types::StorageKey;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Tokens issued by the customer account token endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTokens {
	pub access_token: String,
	pub refresh_token: String,
	#[serde(default)]
	pub id_token: String,
	/// Expiry of the access token, Unix milliseconds.
	pub expires_at: i64,
}

impl std::fmt::Debug for StoredTokens {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("StoredTokens")
			.field("access_token", &"***")
			.field("refresh_token", &"***")
			.field("id_token", &"***")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Where customer tokens are kept, one record per client session.
#[async_trait]
pub trait TokenStore: Send + Sync {
	async fn get(&self, session_id: &str) -> Result<Option<StoredTokens>, AuthError>;
	async fn set(&self, session_id: &str, tokens: &StoredTokens) -> Result<(), AuthError>;
	async fn clear(&self, session_id: &str) -> Result<(), AuthError>;
}

/// Tokens held in process memory.
#[derive(Default)]
pub struct MemoryTokenStore {
	tokens: RwLock<HashMap<String, StoredTokens>>,
}

impl MemoryTokenStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
	async fn get(&self, session_id: &str) -> Result<Option<StoredTokens>, AuthError> {
		Ok(self.tokens.read().await.get(session_id).cloned())
	}

	async fn set(&self, session_id: &str, tokens: &StoredTokens) -> Result<(), AuthError> {
		self.tokens
			.write()
			.await
			.insert(session_id.to_string(), tokens.clone());
		Ok(())
	}

	async fn clear(&self, session_id: &str) -> Result<(), AuthError> {
		self.tokens.write().await.remove(session_id);
		Ok(())
	}
}

/// Tokens kept in the `customer_tokens` namespace of the storage service,
/// keyed by session id.
pub struct StorageTokenStore {
	storage: Arc<StorageService>,
}

impl StorageTokenStore {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}
}

#[async_trait]
impl TokenStore for StorageTokenStore {
	async fn get(&self, session_id: &str) -> Result<Option<StoredTokens>, AuthError> {
		Ok(self
			.storage
			.retrieve_optional(StorageKey::CustomerTokens, session_id)
			.await?)
	}

	async fn set(&self, session_id: &str, tokens: &StoredTokens) -> Result<(), AuthError> {
		self.storage
			.store(StorageKey::CustomerTokens, session_id, tokens)
			.await?;
		Ok(())
	}

	async fn clear(&self, session_id: &str) -> Result<(), AuthError> {
		self.storage
			.remove(StorageKey::CustomerTokens, session_id)
			.await?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use archive_storage::implementations::memory::MemoryStorage;

	fn tokens() -> StoredTokens {
		StoredTokens {
			access_token: "shcat_access".into(),
			refresh_token: "shcrt_refresh".into(),
			id_token: "a.b.c".into(),
			expires_at: 1_700_000_000_000,
		}
	}

	async fn exercise(store: &dyn TokenStore) {
		assert!(store.get("alice").await.unwrap().is_none());
		store.set("alice", &tokens()).await.unwrap();
		assert_eq!(store.get("alice").await.unwrap(), Some(tokens()));
		assert!(store.get("bob").await.unwrap().is_none());

		store.clear("bob").await.unwrap();
		assert!(store.get("alice").await.unwrap().is_some());
		store.clear("alice").await.unwrap();
		assert!(store.get("alice").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_memory_store() {
		exercise(&MemoryTokenStore::new()).await;
	}

	#[tokio::test]
	async fn test_storage_store_keys_by_session() {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let store = StorageTokenStore::new(storage.clone());
		exercise(&store).await;

		store.set("alice", &tokens()).await.unwrap();
		assert!(storage
			.exists(StorageKey::CustomerTokens, "alice")
			.await
			.unwrap());
		assert!(!storage
			.exists(StorageKey::CustomerTokens, "current")
			.await
			.unwrap());
	}

	#[test]
	fn test_debug_redacts() {
		let rendered = format!("{:?}", tokens());
		assert!(!rendered.contains("shcat_access"));
		assert!(rendered.contains("1700000000000"));
	}
}
