// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! HTTP route handlers, grouped by surface.

pub mod admin;
pub mod health;
pub mod invitations;
pub mod orgs;
pub mod roles;
pub mod teams;

use trellis_server_auth::{ActiveMember, GuardError, OrgId};

/// Require the path organization to be the caller's active organization.
///
/// Guards resolve membership from the session's active organization; a
/// request addressing a different organization is denied rather than
/// silently evaluated against the wrong grant set.
pub(crate) fn ensure_org_scope(member: &ActiveMember, org_id: &OrgId) -> Result<(), GuardError> {
	if member.org_id == *org_id {
		Ok(())
	} else {
		Err(GuardError::NotAMember)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use trellis_server_auth::{MemberId, OrgRole, UserId};

	#[test]
	fn org_scope_requires_matching_org() {
		let org_id = OrgId::generate();
		let member = ActiveMember {
			member_id: MemberId::generate(),
			user_id: UserId::generate(),
			org_id,
			role_name: "owner".to_string(),
			grants: OrgRole::Owner.grants().clone(),
		};
		assert!(ensure_org_scope(&member, &org_id).is_ok());
		assert!(matches!(
			ensure_org_scope(&member, &OrgId::generate()),
			Err(GuardError::NotAMember)
		));
	}
}
