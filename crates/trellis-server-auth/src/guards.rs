// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Route guards: composable authorization predicates over a [`GuardContext`].
//!
//! Each guard is a pure function taking the request context and returning
//! the resolved session or membership, or a [`GuardError`] naming what was
//! missing. Guards compose by
//! sequencing `?`: a handler that needs an active organization and a
//! permission calls `require_active_organization` then `require_permission`.
//!
//! Error mapping at the HTTP boundary: [`GuardError::Unauthorized`] is 401,
//! everything else is 403. Denials never leak which specific grant was
//! absent to unauthenticated callers.

use crate::context::{ActiveMember, GuardContext, Session};
use crate::engine::{any_allowed, is_allowed, PermissionRequest};
use crate::types::SystemRole;
use chrono::Utc;

/// Why a guard denied the request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GuardError {
	/// No valid session: missing, expired, or the account is banned.
	#[error("authentication required")]
	Unauthorized,

	/// Authenticated but no active organization is selected.
	#[error("no active organization")]
	NoActiveOrganization,

	/// The session has an active organization the user is not a member of.
	#[error("not a member of the active organization")]
	NotAMember,

	/// The user's system role does not satisfy the requirement.
	#[error("system role '{required}' required")]
	SystemRoleRequired { required: SystemRole },

	/// The membership does not hold any of the named roles.
	#[error("one of roles [{}] required", required.join(", "))]
	RoleRequired { required: Vec<String> },

	/// The membership's grants do not satisfy the permission request.
	/// Carries what was required so the boundary can report it.
	#[error("permission denied: requires {}", format_required(required))]
	PermissionDenied { required: PermissionRequest },
}

fn format_required(request: &PermissionRequest) -> String {
	request
		.iter()
		.map(|(resource, actions)| {
			let actions: Vec<String> = actions.iter().map(ToString::to_string).collect();
			format!("{resource}:[{}]", actions.join(", "))
		})
		.collect::<Vec<_>>()
		.join(" ")
}

fn merge_requests(requests: &[PermissionRequest]) -> PermissionRequest {
	requests.iter().fold(PermissionRequest::new(), |acc, request| {
		request
			.iter()
			.fold(acc, |acc, (resource, actions)| acc.require(*resource, actions))
	})
}

/// Requires a live, unexpired session for an unbanned account.
pub fn require_auth(ctx: &GuardContext) -> Result<&Session, GuardError> {
	let session = ctx.session.as_ref().ok_or(GuardError::Unauthorized)?;
	let now = Utc::now();
	if session.is_expired(now) || session.user.is_banned(now) {
		return Err(GuardError::Unauthorized);
	}
	Ok(session)
}

/// Requires the platform admin role.
pub fn require_system_admin(ctx: &GuardContext) -> Result<&Session, GuardError> {
	require_system_role(ctx, SystemRole::Admin)
}

/// Requires the user's system role to satisfy `required`.
///
/// Admin satisfies any requirement; see [`SystemRole::satisfies`].
pub fn require_system_role(
	ctx: &GuardContext,
	required: SystemRole,
) -> Result<&Session, GuardError> {
	let session = require_auth(ctx)?;
	if !session.user.system_role.satisfies(required) {
		return Err(GuardError::SystemRoleRequired { required });
	}
	Ok(session)
}

/// Requires an authenticated session with an active organization the user
/// is a member of. Returns the resolved membership.
pub fn require_active_organization(ctx: &GuardContext) -> Result<&ActiveMember, GuardError> {
	let session = require_auth(ctx)?;
	if session.active_org_id.is_none() {
		return Err(GuardError::NoActiveOrganization);
	}
	ctx.active_member.as_ref().ok_or(GuardError::NotAMember)
}

/// Requires the active membership's grants to satisfy `request`.
///
/// This is the grant-based check: custom roles pass on what they grant,
/// regardless of their name.
pub fn require_permission<'a>(
	ctx: &'a GuardContext,
	request: &PermissionRequest,
) -> Result<&'a ActiveMember, GuardError> {
	let member = require_active_organization(ctx)?;
	if !is_allowed(&member.grants, request) {
		return Err(GuardError::PermissionDenied {
			required: request.clone(),
		});
	}
	Ok(member)
}

/// Requires at least one of `requests` to be satisfied.
///
/// An empty list denies.
pub fn require_any_permission<'a>(
	ctx: &'a GuardContext,
	requests: &[PermissionRequest],
) -> Result<&'a ActiveMember, GuardError> {
	let member = require_active_organization(ctx)?;
	if !any_allowed(&member.grants, requests) {
		return Err(GuardError::PermissionDenied {
			required: merge_requests(requests),
		});
	}
	Ok(member)
}

/// Requires all of `requests` to be satisfied.
///
/// An empty list is vacuously allowed, matching [`is_allowed`] on an empty
/// request.
pub fn require_all_permissions<'a>(
	ctx: &'a GuardContext,
	requests: &[PermissionRequest],
) -> Result<&'a ActiveMember, GuardError> {
	let member = require_active_organization(ctx)?;
	if !requests.iter().all(|r| is_allowed(&member.grants, r)) {
		return Err(GuardError::PermissionDenied {
			required: merge_requests(requests),
		});
	}
	Ok(member)
}

/// Requires the membership's role to be exactly `role_name`.
///
/// This is the name-based check, used where the role identity matters
/// (e.g. owner-only operations) independent of what the role grants.
pub fn require_role<'a>(ctx: &'a GuardContext, role_name: &str) -> Result<&'a ActiveMember, GuardError> {
	require_any_role(ctx, &[role_name])
}

/// Requires the membership's role name to be one of `role_names`.
pub fn require_any_role<'a>(
	ctx: &'a GuardContext,
	role_names: &[&str],
) -> Result<&'a ActiveMember, GuardError> {
	let member = require_active_organization(ctx)?;
	if !role_names.iter().any(|name| member.role_name == *name) {
		return Err(GuardError::RoleRequired {
			required: role_names.iter().map(|s| s.to_string()).collect(),
		});
	}
	Ok(member)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::roles::{OrgRole, RoleGrants};
	use crate::statement::{Action, Resource};
	use crate::types::{MemberId, OrgId};

	fn member_ctx(role: OrgRole) -> GuardContext {
		named_member_ctx(&role.to_string(), role.grants().clone())
	}

	fn named_member_ctx(role_name: &str, grants: RoleGrants) -> GuardContext {
		let mut session = crate::context::tests::session(SystemRole::User);
		let org_id = OrgId::generate();
		session.active_org_id = Some(org_id);
		let user_id = session.user.id;
		GuardContext::for_session(session).with_member(ActiveMember {
			member_id: MemberId::generate(),
			user_id,
			org_id,
			role_name: role_name.to_string(),
			grants,
		})
	}

	mod auth {
		use super::*;

		#[test]
		fn anonymous_is_unauthorized() {
			assert_eq!(
				require_auth(&GuardContext::anonymous()).unwrap_err(),
				GuardError::Unauthorized
			);
		}

		#[test]
		fn valid_session_passes() {
			let ctx = GuardContext::for_session(crate::context::tests::session(SystemRole::User));
			assert!(require_auth(&ctx).is_ok());
		}

		#[test]
		fn expired_session_is_unauthorized() {
			let mut session = crate::context::tests::session(SystemRole::User);
			session.expires_at = Utc::now() - chrono::Duration::seconds(1);
			let ctx = GuardContext::for_session(session);
			assert_eq!(require_auth(&ctx).unwrap_err(), GuardError::Unauthorized);
		}

		#[test]
		fn banned_user_is_unauthorized() {
			let mut session = crate::context::tests::session(SystemRole::User);
			session.user.banned = true;
			let ctx = GuardContext::for_session(session);
			assert_eq!(require_auth(&ctx).unwrap_err(), GuardError::Unauthorized);
		}

		#[test]
		fn expired_ban_passes_again() {
			let mut session = crate::context::tests::session(SystemRole::User);
			session.user.banned = true;
			session.user.ban_expires_at = Some(Utc::now() - chrono::Duration::hours(1));
			let ctx = GuardContext::for_session(session);
			assert!(require_auth(&ctx).is_ok());
		}
	}

	mod system_roles {
		use super::*;

		#[test]
		fn admin_passes_admin_requirement() {
			let ctx = GuardContext::for_session(crate::context::tests::session(SystemRole::Admin));
			assert!(require_system_admin(&ctx).is_ok());
		}

		#[test]
		fn user_fails_admin_requirement() {
			let ctx = GuardContext::for_session(crate::context::tests::session(SystemRole::User));
			assert_eq!(
				require_system_admin(&ctx).unwrap_err(),
				GuardError::SystemRoleRequired {
					required: SystemRole::Admin
				}
			);
		}

		#[test]
		fn admin_satisfies_user_requirement() {
			let ctx = GuardContext::for_session(crate::context::tests::session(SystemRole::Admin));
			assert!(require_system_role(&ctx, SystemRole::User).is_ok());
		}

		#[test]
		fn anonymous_fails_before_role_check() {
			assert_eq!(
				require_system_admin(&GuardContext::anonymous()).unwrap_err(),
				GuardError::Unauthorized
			);
		}
	}

	mod active_organization {
		use super::*;

		#[test]
		fn session_without_org_is_denied() {
			let ctx = GuardContext::for_session(crate::context::tests::session(SystemRole::User));
			assert_eq!(
				require_active_organization(&ctx).unwrap_err(),
				GuardError::NoActiveOrganization
			);
		}

		#[test]
		fn org_without_membership_is_denied() {
			let mut session = crate::context::tests::session(SystemRole::User);
			session.active_org_id = Some(OrgId::generate());
			let ctx = GuardContext::for_session(session);
			assert_eq!(
				require_active_organization(&ctx).unwrap_err(),
				GuardError::NotAMember
			);
		}

		#[test]
		fn member_passes() {
			let ctx = member_ctx(OrgRole::Member);
			assert!(require_active_organization(&ctx).is_ok());
		}
	}

	mod permissions {
		use super::*;

		#[test]
		fn granted_permission_passes() {
			let ctx = member_ctx(OrgRole::Moderator);
			let request = PermissionRequest::single(Resource::Team, Action::ManageMembers);
			assert!(require_permission(&ctx, &request).is_ok());
		}

		#[test]
		fn missing_permission_is_denied() {
			let ctx = member_ctx(OrgRole::Member);
			let request = PermissionRequest::single(Resource::Team, Action::Delete);
			assert_eq!(
				require_permission(&ctx, &request).unwrap_err(),
				GuardError::PermissionDenied {
					required: request.clone()
				}
			);
		}

		#[test]
		fn denial_names_the_missing_permission() {
			let ctx = member_ctx(OrgRole::Member);
			let request = PermissionRequest::single(Resource::Team, Action::ManageMembers);
			let err = require_permission(&ctx, &request).unwrap_err();
			assert_eq!(
				err,
				GuardError::PermissionDenied {
					required: request.clone()
				}
			);
			assert!(err.to_string().contains("team:[manage-members]"));
		}

		#[test]
		fn custom_role_passes_on_grants_not_name() {
			let grants = RoleGrants::new().grant(Resource::Tickets, &[Action::View, Action::Assign]);
			let ctx = named_member_ctx("support", grants);
			let request = PermissionRequest::single(Resource::Tickets, Action::Assign);
			assert!(require_permission(&ctx, &request).is_ok());
		}

		#[test]
		fn any_permission_needs_one_pass() {
			let ctx = member_ctx(OrgRole::Member);
			let requests = [
				PermissionRequest::single(Resource::Billing, Action::Manage),
				PermissionRequest::single(Resource::Billing, Action::View),
			];
			assert!(require_any_permission(&ctx, &requests).is_ok());
		}

		#[test]
		fn any_permission_with_empty_list_denies() {
			let ctx = member_ctx(OrgRole::Owner);
			assert_eq!(
				require_any_permission(&ctx, &[]).unwrap_err(),
				GuardError::PermissionDenied {
					required: PermissionRequest::new()
				}
			);
		}

		#[test]
		fn all_permissions_need_every_pass() {
			let ctx = member_ctx(OrgRole::Moderator);
			let requests = [
				PermissionRequest::single(Resource::Team, Action::Update),
				PermissionRequest::single(Resource::Organization, Action::Delete),
			];
			assert_eq!(
				require_all_permissions(&ctx, &requests).unwrap_err(),
				GuardError::PermissionDenied {
					required: PermissionRequest::new()
						.require(Resource::Team, &[Action::Update])
						.require(Resource::Organization, &[Action::Delete])
				}
			);
			assert!(require_all_permissions(&ctx, &requests[..1]).is_ok());
		}

		#[test]
		fn permission_check_still_requires_membership() {
			let ctx = GuardContext::for_session(crate::context::tests::session(SystemRole::User));
			let request = PermissionRequest::single(Resource::Team, Action::View);
			assert_eq!(
				require_permission(&ctx, &request).unwrap_err(),
				GuardError::NoActiveOrganization
			);
		}
	}

	mod role_names {
		use super::*;

		#[test]
		fn exact_role_name_passes() {
			let ctx = member_ctx(OrgRole::Owner);
			assert!(require_role(&ctx, "owner").is_ok());
		}

		#[test]
		fn wrong_role_name_is_denied() {
			let ctx = member_ctx(OrgRole::Moderator);
			assert_eq!(
				require_role(&ctx, "owner").unwrap_err(),
				GuardError::RoleRequired {
					required: vec!["owner".to_string()]
				}
			);
		}

		#[test]
		fn any_role_matches_custom_names() {
			let grants = RoleGrants::new();
			let ctx = named_member_ctx("support", grants);
			assert!(require_any_role(&ctx, &["support", "triage"]).is_ok());
		}

		#[test]
		fn name_check_ignores_grants() {
			// A custom role holding every owner grant is still not "owner".
			let ctx = named_member_ctx("shadow-owner", OrgRole::Owner.grants().clone());
			assert!(require_role(&ctx, "owner").is_err());
		}
	}
}
