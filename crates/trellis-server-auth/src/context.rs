// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request-scoped authorization context.
//!
//! A [`GuardContext`] is built once per request from the session store and
//! membership tables, then passed explicitly to every guard and handler.
//! Guards never read ambient state; everything they need to decide is in
//! the context value they receive.

use crate::roles::{OrgRole, RoleGrants};
use crate::types::{MemberId, OrgId, SessionId, SystemRole, TeamId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The slice of a user record that travels with the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
	pub id: UserId,
	pub display_name: String,
	pub email: String,
	pub system_role: SystemRole,
	pub banned: bool,
	pub ban_expires_at: Option<DateTime<Utc>>,
}

impl SessionUser {
	/// Returns true if the user is currently banned.
	pub fn is_banned(&self, now: DateTime<Utc>) -> bool {
		if !self.banned {
			return false;
		}
		match self.ban_expires_at {
			Some(expires) => expires > now,
			None => true,
		}
	}
}

/// An authenticated session as resolved from a session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
	pub id: SessionId,
	pub user: SessionUser,
	/// The organization the session is currently operating in, if any.
	pub active_org_id: Option<OrgId>,
	/// The team focus within the active organization, if any.
	pub active_team_id: Option<TeamId>,
	/// When an admin is impersonating, the admin's own user id.
	pub impersonated_by: Option<UserId>,
	pub expires_at: DateTime<Utc>,
}

impl Session {
	/// Returns true if the session expiry has passed.
	pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
		self.expires_at <= now
	}
}

/// The requesting user's membership in the active organization, with the
/// role's grants already resolved.
///
/// `role_name` is the raw role string from the membership row; for custom
/// roles it will not parse as an [`OrgRole`]. `grants` is authoritative for
/// permission checks either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveMember {
	pub member_id: MemberId,
	pub user_id: UserId,
	pub org_id: OrgId,
	pub role_name: String,
	pub grants: RoleGrants,
}

impl ActiveMember {
	/// The built-in role this membership holds, if its role is built-in.
	pub fn builtin_role(&self) -> Option<OrgRole> {
		OrgRole::from_str(&self.role_name).ok()
	}

	/// Returns true if the membership holds the owner role.
	pub fn is_owner(&self) -> bool {
		self.builtin_role() == Some(OrgRole::Owner)
	}
}

/// Everything a guard needs to authorize one request.
///
/// `session` is `None` for anonymous requests. `active_member` is `None`
/// when the session has no active organization or the user is not a member
/// of it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuardContext {
	pub session: Option<Session>,
	pub active_member: Option<ActiveMember>,
}

impl GuardContext {
	/// An anonymous context with no session.
	pub fn anonymous() -> Self {
		Self::default()
	}

	/// A context for an authenticated session without membership resolution.
	pub fn for_session(session: Session) -> Self {
		Self {
			session: Some(session),
			active_member: None,
		}
	}

	/// Attaches the resolved active-organization membership.
	pub fn with_member(mut self, member: ActiveMember) -> Self {
		self.active_member = Some(member);
		self
	}

	/// The authenticated user id, if any.
	pub fn user_id(&self) -> Option<UserId> {
		self.session.as_ref().map(|s| s.user.id)
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;

	pub(crate) fn session_user(system_role: SystemRole) -> SessionUser {
		SessionUser {
			id: UserId::generate(),
			display_name: "Test User".to_string(),
			email: "test@example.com".to_string(),
			system_role,
			banned: false,
			ban_expires_at: None,
		}
	}

	pub(crate) fn session(system_role: SystemRole) -> Session {
		Session {
			id: SessionId::generate(),
			user: session_user(system_role),
			active_org_id: None,
			active_team_id: None,
			impersonated_by: None,
			expires_at: Utc::now() + chrono::Duration::days(7),
		}
	}

	#[test]
	fn session_expiry() {
		let mut s = session(SystemRole::User);
		assert!(!s.is_expired(Utc::now()));
		s.expires_at = Utc::now() - chrono::Duration::seconds(1);
		assert!(s.is_expired(Utc::now()));
	}

	#[test]
	fn builtin_role_resolution() {
		let member = ActiveMember {
			member_id: MemberId::generate(),
			user_id: UserId::generate(),
			org_id: OrgId::generate(),
			role_name: "owner".to_string(),
			grants: OrgRole::Owner.grants().clone(),
		};
		assert_eq!(member.builtin_role(), Some(OrgRole::Owner));
		assert!(member.is_owner());

		let custom = ActiveMember {
			role_name: "support".to_string(),
			..member
		};
		assert_eq!(custom.builtin_role(), None);
		assert!(!custom.is_owner());
	}

	#[test]
	fn anonymous_context_has_no_user() {
		assert_eq!(GuardContext::anonymous().user_id(), None);
	}

	#[test]
	fn session_context_exposes_user_id() {
		let s = session(SystemRole::User);
		let user_id = s.user.id;
		assert_eq!(GuardContext::for_session(s).user_id(), Some(user_id));
	}
}
