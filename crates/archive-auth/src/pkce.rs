//! PKCE parameters (RFC 7636) for the authorization code flow.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const VERIFIER_BYTES: usize = 64;
const STATE_BYTES: usize = 32;
const NONCE_BYTES: usize = 32;

/// Hex string of `len` random bytes.
pub fn random_hex(len: usize) -> String {
	let mut bytes = vec![0u8; len];
	rand::rng().fill_bytes(&mut bytes);
	bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// S256 code challenge: unpadded base64url of SHA-256 over the verifier.
pub fn code_challenge(verifier: &str) -> String {
	URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Values that must survive from the authorization redirect to the callback.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkceSession {
	pub verifier: String,
	pub state: String,
	pub nonce: String,
}

impl PkceSession {
	pub fn generate() -> Self {
		Self {
			verifier: random_hex(VERIFIER_BYTES),
			state: random_hex(STATE_BYTES),
			nonce: random_hex(NONCE_BYTES),
		}
	}

	pub fn challenge(&self) -> String {
		code_challenge(&self.verifier)
	}
}

impl std::fmt::Debug for PkceSession {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("PkceSession")
			.field("verifier", &"***")
			.field("state", &self.state)
			.field("nonce", &self.nonce)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_rfc7636_challenge() {
		assert_eq!(
			code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
			"E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
		);
	}

	#[test]
	fn test_generated_lengths() {
		let session = PkceSession::generate();
		assert_eq!(session.verifier.len(), 128);
		assert_eq!(session.state.len(), 64);
		assert_eq!(session.nonce.len(), 64);
		assert!(session.verifier.chars().all(|c| c.is_ascii_hexdigit()));
		assert_ne!(session.state, PkceSession::generate().state);
	}

	#[test]
	fn test_debug_hides_verifier() {
		let session = PkceSession::generate();
		assert!(!format!("{:?}", session).contains(&session.verifier));
	}
}
