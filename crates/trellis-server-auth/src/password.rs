// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Password hashing with Argon2id.
//!
//! Production builds use the argon2 crate defaults (Argon2id, ~19 MiB
//! memory, 2 iterations). Tests use reduced-cost parameters; those are
//! intentionally weak and MUST NOT be used in production.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
#[cfg(test)]
use argon2::{Algorithm, Params, Version};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Error hashing or verifying a password.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PasswordError {
	#[error("password must be at least {MIN_PASSWORD_LENGTH} characters")]
	TooShort,

	#[error("password hashing failed: {0}")]
	Hash(String),
}

/// Returns an Argon2 instance configured appropriately for the build context.
#[inline]
fn argon2_instance() -> Argon2<'static> {
	#[cfg(test)]
	{
		// Fast, insecure parameters for tests ONLY.
		let params = Params::new(
			1024, // memory_kib: 1 MiB
			1,    // iterations
			1,    // parallelism
			None, // output length = default
		)
		.expect("valid Argon2 params for tests");
		Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
	}

	#[cfg(not(test))]
	{
		Argon2::default()
	}
}

/// Hash a password for storage.
///
/// Rejects passwords shorter than [`MIN_PASSWORD_LENGTH`] before hashing.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
	if password.chars().count() < MIN_PASSWORD_LENGTH {
		return Err(PasswordError::TooShort);
	}
	let salt = SaltString::generate(&mut OsRng);
	argon2_instance()
		.hash_password(password.as_bytes(), &salt)
		.map(|hash| hash.to_string())
		.map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Verify a password against a stored hash.
///
/// Returns `Ok(false)` for a wrong password; `Err` only for a malformed
/// stored hash.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
	let parsed = PasswordHash::new(stored_hash).map_err(|e| PasswordError::Hash(e.to_string()))?;
	Ok(
		argon2_instance()
			.verify_password(password.as_bytes(), &parsed)
			.is_ok(),
	)
}
