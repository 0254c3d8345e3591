// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Organization domain types: organizations, memberships, invitations, teams.

use crate::types::{InvitationId, InvitationStatus, MemberId, OrgId, TeamId, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How long an invitation stays acceptable after creation.
pub const INVITATION_EXPIRY_HOURS: i64 = 48;

/// A tenant organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
	pub id: OrgId,
	pub name: String,
	/// URL-safe unique identifier.
	pub slug: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub deleted_at: Option<DateTime<Utc>>,
}

impl Organization {
	/// Create a new organization with the given name and slug.
	pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
		let now = Utc::now();
		Self {
			id: OrgId::generate(),
			name: name.into(),
			slug: slug.into(),
			created_at: now,
			updated_at: now,
			deleted_at: None,
		}
	}
}

/// A user's membership in an organization.
///
/// `role` is a name, not a grant set: it may be one of the built-in roles
/// or a custom role defined within the organization. Grants are resolved
/// at request time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgMembership {
	pub id: MemberId,
	pub org_id: OrgId,
	pub user_id: UserId,
	pub role: String,
	pub created_at: DateTime<Utc>,
}

impl OrgMembership {
	pub fn new(org_id: OrgId, user_id: UserId, role: impl Into<String>) -> Self {
		Self {
			id: MemberId::generate(),
			org_id,
			user_id,
			role: role.into(),
			created_at: Utc::now(),
		}
	}
}

/// An email invitation into an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invitation {
	pub id: InvitationId,
	pub org_id: OrgId,
	pub email: String,
	/// Role the invitee will receive on acceptance.
	pub role: String,
	pub inviter_id: UserId,
	pub status: InvitationStatus,
	pub expires_at: DateTime<Utc>,
	pub created_at: DateTime<Utc>,
}

impl Invitation {
	/// Create a pending invitation with the default expiry window.
	pub fn new(
		org_id: OrgId,
		email: impl Into<String>,
		role: impl Into<String>,
		inviter_id: UserId,
	) -> Self {
		let now = Utc::now();
		Self {
			id: InvitationId::generate(),
			org_id,
			email: email.into(),
			role: role.into(),
			inviter_id,
			status: InvitationStatus::Pending,
			expires_at: now + Duration::hours(INVITATION_EXPIRY_HOURS),
			created_at: now,
		}
	}

	/// Returns true if the expiry deadline has passed.
	pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
		self.expires_at <= now
	}

	/// Returns true if the invitation can still be accepted.
	pub fn is_acceptable(&self, now: DateTime<Utc>) -> bool {
		self.status.is_pending() && !self.is_expired(now)
	}
}

/// A team within an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
	pub id: TeamId,
	pub org_id: OrgId,
	pub name: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Team {
	pub fn new(org_id: OrgId, name: impl Into<String>) -> Self {
		let now = Utc::now();
		Self {
			id: TeamId::generate(),
			org_id,
			name: name.into(),
			created_at: now,
			updated_at: now,
		}
	}
}

/// A user's membership in a team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMembership {
	pub team_id: TeamId,
	pub user_id: UserId,
	pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn new_org_is_not_deleted() {
		let org = Organization::new("Acme", "acme");
		assert!(org.deleted_at.is_none());
		assert_eq!(org.slug, "acme");
	}

	#[test]
	fn new_invitation_is_pending_and_acceptable() {
		let inv = Invitation::new(OrgId::generate(), "a@example.com", "member", UserId::generate());
		let now = Utc::now();
		assert!(inv.status.is_pending());
		assert!(!inv.is_expired(now));
		assert!(inv.is_acceptable(now));
	}

	#[test]
	fn expired_invitation_is_not_acceptable() {
		let mut inv =
			Invitation::new(OrgId::generate(), "a@example.com", "member", UserId::generate());
		inv.expires_at = Utc::now() - Duration::hours(1);
		assert!(inv.is_expired(Utc::now()));
		assert!(!inv.is_acceptable(Utc::now()));
	}

	#[test]
	fn cancelled_invitation_is_not_acceptable() {
		let mut inv =
			Invitation::new(OrgId::generate(), "a@example.com", "member", UserId::generate());
		inv.status = InvitationStatus::Cancelled;
		assert!(!inv.is_acceptable(Utc::now()));
	}

	#[test]
	fn expiry_window_is_48_hours() {
		let inv = Invitation::new(OrgId::generate(), "a@example.com", "member", UserId::generate());
		let window = inv.expires_at - inv.created_at;
		assert_eq!(window, Duration::hours(INVITATION_EXPIRY_HOURS));
	}
}
