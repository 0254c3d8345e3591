// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core type definitions for authentication and authorization.
//!
//! This module defines the foundational types used throughout the auth system:
//!
//! - **ID newtypes**: Type-safe wrappers around UUIDs for different entity types
//!   ([`UserId`], [`SessionId`], [`OrgId`], etc.) preventing accidental mixing
//! - **System roles**: Platform-wide roles from the admin surface ([`SystemRole`])
//! - **Invitation lifecycle**: [`InvitationStatus`] state machine
//! - **User record**: [`User`] as stored and threaded through request handling
//!
//! All ID types implement transparent serde serialization (as UUID strings) and
//! provide conversion to/from [`uuid::Uuid`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// =============================================================================
// ID Newtypes
// =============================================================================

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			/// Create a new ID from a UUID.
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			/// Generate a new random ID.
			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}

			/// Get the inner UUID value.
			pub fn into_inner(self) -> Uuid {
				self.0
			}

			/// Get a reference to the inner UUID.
			pub fn as_uuid(&self) -> &Uuid {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}

		impl From<$name> for Uuid {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(UserId, "Unique identifier for a user.");
define_id_type!(SessionId, "Unique identifier for a session.");
define_id_type!(OrgId, "Unique identifier for an organization.");
define_id_type!(MemberId, "Unique identifier for an organization membership.");
define_id_type!(TeamId, "Unique identifier for a team.");
define_id_type!(InvitationId, "Unique identifier for an invitation.");
define_id_type!(RoleId, "Unique identifier for a custom organization role.");

// =============================================================================
// System Roles
// =============================================================================

/// Platform-wide role attached to a user account.
///
/// `Admin` grants access to the admin surface (user management,
/// cross-organization operations, impersonation). `User` is the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemRole {
	/// Full platform access, can manage any user or organization.
	Admin,
	/// Standard account with no elevated platform access.
	#[default]
	User,
}

impl SystemRole {
	/// Returns all available system roles.
	pub fn all() -> &'static [SystemRole] {
		&[SystemRole::Admin, SystemRole::User]
	}

	/// Returns true if this role satisfies a requirement for `other`.
	///
	/// `Admin` satisfies any requested system role.
	pub fn satisfies(&self, other: SystemRole) -> bool {
		matches!(
			(self, other),
			(SystemRole::Admin, _) | (SystemRole::User, SystemRole::User)
		)
	}
}

impl fmt::Display for SystemRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SystemRole::Admin => write!(f, "admin"),
			SystemRole::User => write!(f, "user"),
		}
	}
}

impl FromStr for SystemRole {
	type Err = UnknownRole;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"admin" => Ok(SystemRole::Admin),
			"user" => Ok(SystemRole::User),
			other => Err(UnknownRole(other.to_string())),
		}
	}
}

/// Error returned when a role name does not match any known role.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

// =============================================================================
// Invitation Status
// =============================================================================

/// Lifecycle state of an organization invitation.
///
/// Transitions: `Pending` → `Accepted` | `Cancelled` | `Expired`.
/// Terminal states never transition again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
	/// Created and awaiting acceptance.
	#[default]
	Pending,
	/// The invited email accepted and a membership was created.
	Accepted,
	/// Revoked by an organization member before acceptance.
	Cancelled,
	/// The expiry deadline passed before acceptance.
	Expired,
}

impl InvitationStatus {
	/// Returns true if the invitation can still be accepted or cancelled.
	pub fn is_pending(&self) -> bool {
		matches!(self, InvitationStatus::Pending)
	}
}

impl fmt::Display for InvitationStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			InvitationStatus::Pending => write!(f, "pending"),
			InvitationStatus::Accepted => write!(f, "accepted"),
			InvitationStatus::Cancelled => write!(f, "cancelled"),
			InvitationStatus::Expired => write!(f, "expired"),
		}
	}
}

impl FromStr for InvitationStatus {
	type Err = UnknownRole;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"pending" => Ok(InvitationStatus::Pending),
			"accepted" => Ok(InvitationStatus::Accepted),
			"cancelled" => Ok(InvitationStatus::Cancelled),
			"expired" => Ok(InvitationStatus::Expired),
			other => Err(UnknownRole(other.to_string())),
		}
	}
}

// =============================================================================
// User
// =============================================================================

/// A user account.
///
/// The password hash lives only in the database layer; it is never loaded
/// into this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
	pub id: UserId,
	pub display_name: String,
	pub email: String,
	pub system_role: SystemRole,
	pub banned: bool,
	pub ban_reason: Option<String>,
	pub ban_expires_at: Option<DateTime<Utc>>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
	/// Returns true if the user is currently banned.
	///
	/// A ban with an expiry in the past no longer applies.
	pub fn is_banned(&self, now: DateTime<Utc>) -> bool {
		if !self.banned {
			return false;
		}
		match self.ban_expires_at {
			Some(expires) => expires > now,
			None => true,
		}
	}

	/// Returns true if the user holds the platform admin role.
	pub fn is_system_admin(&self) -> bool {
		self.system_role == SystemRole::Admin
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	mod id_types {
		use super::*;

		#[test]
		fn user_id_roundtrips() {
			let uuid = Uuid::new_v4();
			let user_id = UserId::new(uuid);
			assert_eq!(user_id.into_inner(), uuid);
		}

		#[test]
		fn user_id_generates_unique() {
			let id1 = UserId::generate();
			let id2 = UserId::generate();
			assert_ne!(id1, id2);
		}

		#[test]
		fn user_id_serializes_as_uuid() {
			let uuid = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
			let user_id = UserId::new(uuid);
			let json = serde_json::to_string(&user_id).unwrap();
			assert_eq!(json, "\"550e8400-e29b-41d4-a716-446655440000\"");
		}

		proptest! {
				#[test]
				fn user_id_roundtrip_any_uuid(
						a: u128
				) {
						let uuid = Uuid::from_u128(a);
						let user_id = UserId::new(uuid);
						prop_assert_eq!(user_id.into_inner(), uuid);
						prop_assert_eq!(Uuid::from(user_id), uuid);
				}

				#[test]
				fn org_id_roundtrip_any_uuid(
						a: u128
				) {
						let uuid = Uuid::from_u128(a);
						let org_id = OrgId::new(uuid);
						prop_assert_eq!(org_id.into_inner(), uuid);
				}

				#[test]
				fn user_id_display_matches_uuid(
						a: u128
				) {
						let uuid = Uuid::from_u128(a);
						let user_id = UserId::new(uuid);
						prop_assert_eq!(user_id.to_string(), uuid.to_string());
				}
		}
	}

	mod system_role {
		use super::*;

		#[test]
		fn admin_satisfies_everything() {
			assert!(SystemRole::Admin.satisfies(SystemRole::Admin));
			assert!(SystemRole::Admin.satisfies(SystemRole::User));
		}

		#[test]
		fn user_only_satisfies_user() {
			assert!(!SystemRole::User.satisfies(SystemRole::Admin));
			assert!(SystemRole::User.satisfies(SystemRole::User));
		}

		#[test]
		fn parses_and_displays() {
			assert_eq!("admin".parse::<SystemRole>().unwrap(), SystemRole::Admin);
			assert_eq!("user".parse::<SystemRole>().unwrap(), SystemRole::User);
			assert!("moderator".parse::<SystemRole>().is_err());
			assert_eq!(SystemRole::Admin.to_string(), "admin");
		}

		#[test]
		fn serializes_snake_case() {
			let json = serde_json::to_string(&SystemRole::Admin).unwrap();
			assert_eq!(json, "\"admin\"");
		}
	}

	mod invitation_status {
		use super::*;

		#[test]
		fn pending_is_default() {
			assert_eq!(InvitationStatus::default(), InvitationStatus::Pending);
			assert!(InvitationStatus::Pending.is_pending());
		}

		#[test]
		fn terminal_states_are_not_pending() {
			assert!(!InvitationStatus::Accepted.is_pending());
			assert!(!InvitationStatus::Cancelled.is_pending());
			assert!(!InvitationStatus::Expired.is_pending());
		}

		#[test]
		fn roundtrips_through_strings() {
			for status in [
				InvitationStatus::Pending,
				InvitationStatus::Accepted,
				InvitationStatus::Cancelled,
				InvitationStatus::Expired,
			] {
				assert_eq!(status.to_string().parse::<InvitationStatus>().unwrap(), status);
			}
		}
	}

	mod user {
		use super::*;

		fn test_user() -> User {
			let now = Utc::now();
			User {
				id: UserId::generate(),
				display_name: "Test User".to_string(),
				email: "test@example.com".to_string(),
				system_role: SystemRole::User,
				banned: false,
				ban_reason: None,
				ban_expires_at: None,
				created_at: now,
				updated_at: now,
				deleted_at: None,
			}
		}

		#[test]
		fn unbanned_user_is_not_banned() {
			let user = test_user();
			assert!(!user.is_banned(Utc::now()));
		}

		#[test]
		fn permanent_ban_applies() {
			let mut user = test_user();
			user.banned = true;
			assert!(user.is_banned(Utc::now()));
		}

		#[test]
		fn expired_ban_no_longer_applies() {
			let mut user = test_user();
			user.banned = true;
			user.ban_expires_at = Some(Utc::now() - chrono::Duration::hours(1));
			assert!(!user.is_banned(Utc::now()));
		}

		#[test]
		fn future_ban_expiry_still_applies() {
			let mut user = test_user();
			user.banned = true;
			user.ban_expires_at = Some(Utc::now() + chrono::Duration::hours(1));
			assert!(user.is_banned(Utc::now()));
		}
	}
}
