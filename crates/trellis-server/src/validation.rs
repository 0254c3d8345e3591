// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared validation utilities for API handlers.
//!
//! This module provides common validation functions for slugs, emails, IDs,
//! role names and permission maps. Use these utilities to ensure consistent
//! validation across all handlers.

use regex::Regex;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::LazyLock;
use trellis_server_auth::{
	is_builtin_role_name, Action, InvitationId, OrgId, PermissionRequest, Resource, RoleId,
	SessionId, TeamId, UserId,
};
use uuid::Uuid;

static SLUG_REGEX: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*[a-z0-9]$|^[a-z0-9]$").unwrap());

static ROLE_NAME_REGEX: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]{0,31}$").unwrap());

/// Validate a slug against format and length constraints.
///
/// Slugs must:
/// - Be between `min_len` and `max_len` characters
/// - Start and end with alphanumeric characters
/// - Contain only lowercase letters, numbers, and hyphens
pub fn validate_slug(slug: &str, min_len: usize, max_len: usize) -> bool {
	slug.len() >= min_len && slug.len() <= max_len && SLUG_REGEX.is_match(slug)
}

/// Sanitize an email address by trimming whitespace and lowercasing.
pub fn sanitize_email(email: &str) -> String {
	email.trim().to_lowercase()
}

/// Minimal email shape check: one `@` with something on both sides.
pub fn looks_like_email(email: &str) -> bool {
	let mut parts = email.splitn(2, '@');
	matches!(
		(parts.next(), parts.next()),
		(Some(local), Some(domain)) if !local.is_empty() && domain.contains('.')
	)
}

/// Validate a custom role name: lowercase kebab, max 32 chars, and not one
/// of the built-in role names.
pub fn validate_custom_role_name(name: &str) -> bool {
	ROLE_NAME_REGEX.is_match(name) && !is_builtin_role_name(name)
}

/// Error type for ID parsing failures.
#[derive(Debug, Clone)]
pub struct IdParseError {
	pub error: String,
	pub message: String,
}

impl IdParseError {
	fn invalid(message: impl Into<String>) -> Self {
		Self {
			error: "invalid_id".to_string(),
			message: message.into(),
		}
	}
}

/// Parse a string as an OrgId.
pub fn parse_org_id(id_str: &str) -> Result<OrgId, IdParseError> {
	Uuid::parse_str(id_str)
		.map(OrgId::new)
		.map_err(|_| IdParseError::invalid("Invalid organization ID"))
}

/// Parse a string as a TeamId.
pub fn parse_team_id(id_str: &str) -> Result<TeamId, IdParseError> {
	Uuid::parse_str(id_str)
		.map(TeamId::new)
		.map_err(|_| IdParseError::invalid("Invalid team ID"))
}

/// Parse a string as a UserId.
pub fn parse_user_id(id_str: &str) -> Result<UserId, IdParseError> {
	Uuid::parse_str(id_str)
		.map(UserId::new)
		.map_err(|_| IdParseError::invalid("Invalid user ID"))
}

/// Parse a string as an InvitationId.
pub fn parse_invitation_id(id_str: &str) -> Result<InvitationId, IdParseError> {
	Uuid::parse_str(id_str)
		.map(InvitationId::new)
		.map_err(|_| IdParseError::invalid("Invalid invitation ID"))
}

/// Parse a string as a RoleId.
pub fn parse_role_id(id_str: &str) -> Result<RoleId, IdParseError> {
	Uuid::parse_str(id_str)
		.map(RoleId::new)
		.map_err(|_| IdParseError::invalid("Invalid role ID"))
}

/// Parse a string as a SessionId.
pub fn parse_session_id(id_str: &str) -> Result<SessionId, IdParseError> {
	Uuid::parse_str(id_str)
		.map(SessionId::new)
		.map_err(|_| IdParseError::invalid("Invalid session ID"))
}

/// Error type for permission-map parsing failures. Always a denial of the
/// request, never a partial parse.
#[derive(Debug, Clone)]
pub struct PermissionParseError {
	pub error: String,
	pub message: String,
}

/// Parse a client-supplied `{resource: [actions]}` map into a typed
/// [`PermissionRequest`], failing closed on anything outside the statement.
pub fn parse_permission_request(
	raw: &BTreeMap<String, Vec<String>>,
) -> Result<PermissionRequest, PermissionParseError> {
	let mut request = PermissionRequest::new();
	for (resource_name, action_names) in raw {
		let resource = Resource::from_str(resource_name).map_err(|e| PermissionParseError {
			error: "invalid_permission".to_string(),
			message: e.to_string(),
		})?;
		let mut actions = Vec::with_capacity(action_names.len());
		for action_name in action_names {
			let action = Action::from_str(action_name).map_err(|e| PermissionParseError {
				error: "invalid_permission".to_string(),
				message: e.to_string(),
			})?;
			if !resource.declares(action) {
				return Err(PermissionParseError {
					error: "invalid_permission".to_string(),
					message: format!("action '{action}' is not declared for resource '{resource}'"),
				});
			}
			actions.push(action);
		}
		request = request.require(resource, &actions);
	}
	Ok(request)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_validate_slug() {
		assert!(validate_slug("a", 1, 50));
		assert!(validate_slug("abc", 1, 50));
		assert!(validate_slug("abc-def", 1, 50));
		assert!(validate_slug("a1b2c3", 1, 50));

		assert!(!validate_slug("", 1, 50));
		assert!(!validate_slug("-abc", 1, 50));
		assert!(!validate_slug("abc-", 1, 50));
		assert!(!validate_slug("ABC", 1, 50));
		assert!(!validate_slug("ab", 3, 50));
	}

	#[test]
	fn test_sanitize_email() {
		assert_eq!(sanitize_email("  Test@Example.COM  "), "test@example.com");
	}

	#[test]
	fn test_looks_like_email() {
		assert!(looks_like_email("a@example.com"));
		assert!(!looks_like_email("nope"));
		assert!(!looks_like_email("@example.com"));
		assert!(!looks_like_email("a@nodot"));
	}

	#[test]
	fn test_validate_custom_role_name() {
		assert!(validate_custom_role_name("support"));
		assert!(validate_custom_role_name("tier-2"));

		// Built-in names are reserved.
		assert!(!validate_custom_role_name("owner"));
		assert!(!validate_custom_role_name("moderator"));
		assert!(!validate_custom_role_name("member"));

		assert!(!validate_custom_role_name(""));
		assert!(!validate_custom_role_name("Support"));
		assert!(!validate_custom_role_name("-dash"));
	}

	#[test]
	fn test_parse_org_id() {
		let valid = "550e8400-e29b-41d4-a716-446655440000";
		assert!(parse_org_id(valid).is_ok());

		let result = parse_org_id("not-a-uuid");
		assert!(result.is_err());
		assert_eq!(result.unwrap_err().error, "invalid_id");
	}

	#[test]
	fn test_parse_permission_request() {
		let mut raw = BTreeMap::new();
		raw.insert("tickets".to_string(), vec!["view".to_string()]);
		let request = parse_permission_request(&raw).unwrap();
		assert!(!request.is_empty());

		let mut bad_resource = BTreeMap::new();
		bad_resource.insert("spaceships".to_string(), vec!["view".to_string()]);
		assert!(parse_permission_request(&bad_resource).is_err());

		let mut bad_action = BTreeMap::new();
		bad_action.insert("member".to_string(), vec!["archive".to_string()]);
		assert!(parse_permission_request(&bad_action).is_err());

		// Action exists in the vocabulary but not for this resource.
		let mut undeclared = BTreeMap::new();
		undeclared.insert("billing".to_string(), vec!["assign".to_string()]);
		assert!(parse_permission_request(&undeclared).is_err());
	}
}
