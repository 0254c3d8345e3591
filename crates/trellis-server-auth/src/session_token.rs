// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session token generation and hashing.
//!
//! Tokens are opaque 32-byte random values, hex-encoded with a `ts_` prefix
//! so they are recognizable in logs that accidentally capture one. Only the
//! SHA-256 hash of a token is stored; the plaintext exists once, in the
//! Set-Cookie response that issued it.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Prefix for session token values.
pub const SESSION_TOKEN_PREFIX: &str = "ts_";

/// Number of random bytes in a session token.
const TOKEN_BYTES: usize = 32;

/// Generate a new session token.
///
/// Returns the plaintext token, `ts_` followed by 64 hex characters.
pub fn generate_session_token() -> String {
	let mut bytes = [0u8; TOKEN_BYTES];
	OsRng.fill_bytes(&mut bytes);
	format!("{SESSION_TOKEN_PREFIX}{}", hex::encode(bytes))
}

/// Hash a session token for storage and lookup.
///
/// SHA-256 over the full token string (prefix included), hex-encoded.
pub fn hash_session_token(token: &str) -> String {
	let mut hasher = Sha256::new();
	hasher.update(token.as_bytes());
	hex::encode(hasher.finalize())
}

/// Check if a value looks like a session token.
pub fn is_session_token(token: &str) -> bool {
	token.starts_with(SESSION_TOKEN_PREFIX)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn generated_tokens_have_expected_shape() {
		let token = generate_session_token();
		assert!(token.starts_with(SESSION_TOKEN_PREFIX));
		assert_eq!(token.len(), SESSION_TOKEN_PREFIX.len() + TOKEN_BYTES * 2);
		assert!(is_session_token(&token));
	}

	#[test]
	fn generated_tokens_are_unique() {
		let a = generate_session_token();
		let b = generate_session_token();
		assert_ne!(a, b);
	}

	#[test]
	fn hash_is_deterministic_and_distinct_from_token() {
		let token = generate_session_token();
		let hash = hash_session_token(&token);
		assert_eq!(hash, hash_session_token(&token));
		assert_ne!(hash, token);
		assert_eq!(hash.len(), 64);
	}

	#[test]
	fn different_tokens_hash_differently() {
		assert_ne!(
			hash_session_token("ts_aaaa"),
			hash_session_token("ts_aaab")
		);
	}

	#[test]
	fn non_token_values_are_rejected() {
		assert!(!is_session_token("lt_0123"));
		assert!(!is_session_token("random"));
	}
}
