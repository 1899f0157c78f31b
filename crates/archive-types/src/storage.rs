//! Storage namespaces used by the workspace.

use std::str::FromStr;

/// Namespaces for values kept in the storage service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Customer account tokens, kept under a single fixed id.
	CustomerTokens,
	/// PKCE verifier/state/nonce for a login round trip in progress.
	PkceSessions,
}

impl StorageKey {
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::CustomerTokens => "customer_tokens",
			StorageKey::PkceSessions => "pkce_sessions",
		}
	}

	pub fn all() -> impl Iterator<Item = Self> {
		[Self::CustomerTokens, Self::PkceSessions].into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all().find(|key| key.as_str() == s).ok_or(())
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}
