// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authentication middleware helpers: token extraction and auth configuration.
//!
//! This module provides:
//! - [`CurrentUser`] - authenticated user context extracted from requests
//! - [`AuthConfig`] - configuration for authentication behavior
//! - Helper functions for extracting session cookies and bearer tokens
//!
//! # Authentication Flow
//!
//! ```text
//! Request → Extract Cookie/Bearer → Session lookup → GuardContext
//! ```
//!
//! # Security Notes
//!
//! - Session tokens are extracted from cookies (HttpOnly, Secure recommended)
//! - Bearer tokens are extracted from the Authorization header
//! - Token values are never logged

use crate::types::{SessionId, SystemRole, User, UserId};
use http::header::{AUTHORIZATION, COOKIE};
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Default name for the session cookie.
pub const SESSION_COOKIE_NAME: &str = "trellis_session";

/// Environment variable to enable dev mode (bypass authentication).
pub const DEV_MODE_ENV_VAR: &str = "TRELLIS_SERVER_AUTH_DEV_MODE";
pub const TRELLIS_ENV_VAR: &str = "TRELLIS_SERVER_ENV";

/// The currently authenticated user, extracted from request context.
///
/// Carries the authenticated account, the session that produced it, and
/// whether an admin is currently impersonating another user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
	/// The authenticated user (always the real account holder).
	pub user: User,
	/// The session the request authenticated with.
	pub session_id: SessionId,
	/// User ID being impersonated (if admin is impersonating).
	pub impersonating_as: Option<UserId>,
}

impl CurrentUser {
	/// Create a new CurrentUser from a session-based authentication.
	pub fn from_session(user: User, session_id: SessionId) -> Self {
		Self {
			user,
			session_id,
			impersonating_as: None,
		}
	}

	/// Set the user being impersonated.
	pub fn with_impersonation(mut self, impersonated_user_id: UserId) -> Self {
		self.impersonating_as = Some(impersonated_user_id);
		self
	}

	/// Returns true if the current user is impersonating another user.
	pub fn is_impersonating(&self) -> bool {
		self.impersonating_as.is_some()
	}

	/// The effective user ID (the one being impersonated, or self).
	///
	/// Use this when checking permissions for resource access.
	pub fn effective_user_id(&self) -> &UserId {
		self.impersonating_as.as_ref().unwrap_or(&self.user.id)
	}

	/// The real actor (admin doing the impersonation, or self).
	///
	/// Use this for audit logging to track who actually performed an action.
	pub fn actor_user_id(&self) -> &UserId {
		&self.user.id
	}

	/// Returns true if the real account holds the platform admin role.
	pub fn is_system_admin(&self) -> bool {
		self.user.system_role == SystemRole::Admin
	}
}

/// Configuration for authentication middleware.
#[derive(Debug, Clone)]
pub struct AuthConfig {
	/// Enable dev mode (bypass authentication when TRELLIS_SERVER_AUTH_DEV_MODE=1).
	pub dev_mode: bool,
	/// Name of the session cookie.
	pub session_cookie_name: String,
	/// Disable new user signups (existing users can still log in).
	pub signups_disabled: bool,
}

impl Default for AuthConfig {
	fn default() -> Self {
		Self {
			dev_mode: false,
			session_cookie_name: SESSION_COOKIE_NAME.to_string(),
			signups_disabled: false,
		}
	}
}

impl AuthConfig {
	/// Create a new AuthConfig with default settings.
	pub fn new() -> Self {
		Self::default()
	}

	/// Create AuthConfig from environment variables.
	///
	/// Reads `TRELLIS_SERVER_AUTH_DEV_MODE` to determine if dev mode should be
	/// enabled.
	///
	/// # Panics
	///
	/// Panics if both `TRELLIS_SERVER_AUTH_DEV_MODE=1` and
	/// `TRELLIS_SERVER_ENV=production` are set, as dev mode must never be
	/// enabled in production environments.
	pub fn from_env() -> Self {
		let dev_mode = std::env::var(DEV_MODE_ENV_VAR)
			.map(|v| v == "1" || v.to_lowercase() == "true")
			.unwrap_or(false);

		let trellis_env = std::env::var(TRELLIS_ENV_VAR).unwrap_or_default();

		if dev_mode && trellis_env.to_lowercase() == "production" {
			panic!(
                "FATAL: TRELLIS_SERVER_AUTH_DEV_MODE=1 is set while TRELLIS_SERVER_ENV=production. \
                 Dev mode authentication bypass MUST NOT be enabled in production. \
                 Remove TRELLIS_SERVER_AUTH_DEV_MODE or set TRELLIS_SERVER_ENV to a non-production value."
            );
		}

		Self {
			dev_mode,
			..Default::default()
		}
	}

	/// Set dev mode.
	pub fn with_dev_mode(mut self, enabled: bool) -> Self {
		self.dev_mode = enabled;
		self
	}

	/// Set the session cookie name.
	pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
		self.session_cookie_name = name.into();
		self
	}

	/// Set signups disabled.
	pub fn with_signups_disabled(mut self, disabled: bool) -> Self {
		self.signups_disabled = disabled;
		self
	}
}

/// Extract the session token from the Cookie header.
///
/// Parses the Cookie header to find the session cookie (default:
/// `trellis_session`). Returns the token value if found.
pub fn extract_session_cookie(headers: &HeaderMap) -> Option<String> {
	extract_session_cookie_with_name(headers, SESSION_COOKIE_NAME)
}

/// Extract the session token from the Cookie header with a custom cookie name.
pub fn extract_session_cookie_with_name(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
	headers
		.get(COOKIE)?
		.to_str()
		.ok()?
		.split(';')
		.find_map(|cookie| {
			let cookie = cookie.trim();
			let (name, value) = cookie.split_once('=')?;

			if name == cookie_name {
				Some(value.to_string())
			} else {
				None
			}
		})
}

/// Extract bearer token from the Authorization header.
///
/// Expects the format: `Authorization: Bearer <token>`. Returns `None` if
/// not present or malformed. The returned value should be treated as a
/// secret and never logged.
#[instrument(level = "trace", skip_all, fields(has_auth_header))]
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
	let auth_header = headers.get(AUTHORIZATION)?;
	let auth_str = auth_header.to_str().ok()?;
	auth_str
		.strip_prefix("Bearer ")
		.map(|token| token.to_string())
}
