// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Organization and membership HTTP handlers.
//!
//! Covers organization CRUD, the member surface, active-organization
//! selection, the caller's resolved membership, and the permission check
//! endpoint.

use axum::{
	extract::{Path, State},
	http::StatusCode,
	response::IntoResponse,
	Json,
};
use trellis_server_audit::{AuditEventType, AuditLogEntry};
use trellis_server_auth::{
	is_allowed, require_auth, require_active_organization, require_permission, require_role,
	Action, OrgId, OrgRole, Organization, PermissionRequest, Resource,
};
use trellis_server_db::{DbError, OrgStore, RoleStore, SessionStore, TeamStore, UserStore};

pub use trellis_server_api::orgs::*;
use trellis_server_api::roles::{CheckPermissionRequest, CheckPermissionResponse};

use crate::{
	api::AppState,
	api_response::{bad_request, db_error, forbidden, not_found},
	auth_middleware::RequireAuth,
	guard, impl_api_error_response, parse_id,
	routes::ensure_org_scope,
	validation::{parse_org_id, parse_permission_request, parse_team_id, parse_user_id, validate_slug},
};

impl_api_error_response!(OrgErrorResponse);

fn org_response(org: &Organization) -> OrgResponse {
	OrgResponse {
		id: org.id.to_string(),
		name: org.name.clone(),
		slug: org.slug.clone(),
		created_at: org.created_at,
		updated_at: org.updated_at,
	}
}

/// Returns true if `role` names a built-in role or a custom role defined
/// in the organization.
pub(crate) async fn role_exists(
	state: &AppState,
	org_id: &OrgId,
	role: &str,
) -> Result<bool, DbError> {
	if role.parse::<OrgRole>().is_ok() {
		return Ok(true);
	}
	Ok(state.role_repo.get_role_by_name(org_id, role).await?.is_some())
}

#[utoipa::path(
    get,
    path = "/api/orgs",
    responses(
        (status = 200, description = "Organizations the caller belongs to", body = ListOrgsResponse),
        (status = 401, description = "Not authenticated", body = OrgErrorResponse)
    ),
    tag = "orgs"
)]
/// List organizations the caller is a member of.
#[tracing::instrument(skip(state, ctx), fields(user_id = %current_user.user.id))]
pub async fn list_orgs(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
) -> impl IntoResponse {
	let session = guard!(OrgErrorResponse, require_auth(&ctx));

	match state.org_repo.list_orgs_for_user(&session.user.id).await {
		Ok(orgs) => Json(ListOrgsResponse {
			orgs: orgs.iter().map(org_response).collect(),
		})
		.into_response(),
		Err(e) => db_error::<OrgErrorResponse>(e).into_response(),
	}
}

#[utoipa::path(
    post,
    path = "/api/orgs",
    request_body = CreateOrgRequest,
    responses(
        (status = 201, description = "Organization created", body = OrgResponse),
        (status = 400, description = "Invalid name or slug", body = OrgErrorResponse),
        (status = 409, description = "Slug already taken", body = OrgErrorResponse)
    ),
    tag = "orgs"
)]
/// Create an organization. The creator becomes its owner.
#[tracing::instrument(skip(state, ctx, payload), fields(user_id = %current_user.user.id))]
pub async fn create_org(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Json(payload): Json<CreateOrgRequest>,
) -> impl IntoResponse {
	let session = guard!(OrgErrorResponse, require_auth(&ctx));

	let name = payload.name.trim();
	if name.is_empty() || name.len() > 100 {
		return bad_request::<OrgErrorResponse>(
			"invalid_name",
			"Organization name must be 1-100 characters",
		)
		.into_response();
	}
	if !validate_slug(&payload.slug, 3, 50) {
		return bad_request::<OrgErrorResponse>(
			"invalid_slug",
			"Slug must be 3-50 lowercase alphanumeric characters or hyphens",
		)
		.into_response();
	}

	let org = Organization::new(name, &payload.slug);
	if let Err(e) = state.org_repo.create_org(&org).await {
		return db_error::<OrgErrorResponse>(e).into_response();
	}
	if let Err(e) = state
		.org_repo
		.add_member(&org.id, &session.user.id, &OrgRole::Owner.to_string())
		.await
	{
		return db_error::<OrgErrorResponse>(e).into_response();
	}

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::OrgCreated)
			.actor(*current_user.actor_user_id())
			.resource("organization", org.id.to_string())
			.action("create")
			.details(serde_json::json!({ "slug": org.slug }))
			.build(),
	);

	(StatusCode::CREATED, Json(org_response(&org))).into_response()
}

#[utoipa::path(
    get,
    path = "/api/orgs/{org_id}",
    params(("org_id" = String, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Organization details", body = OrgResponse),
        (status = 403, description = "Not a member", body = OrgErrorResponse),
        (status = 404, description = "Organization not found", body = OrgErrorResponse)
    ),
    tag = "orgs"
)]
/// Get an organization. Requires membership, not a specific grant.
#[tracing::instrument(skip(state, ctx), fields(%org_id))]
pub async fn get_org(
	RequireAuth(_current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path(org_id): Path<String>,
) -> impl IntoResponse {
	let session = guard!(OrgErrorResponse, require_auth(&ctx));
	let org_id = parse_id!(OrgErrorResponse, parse_org_id(&org_id));

	let org = match state.org_repo.get_org_by_id(&org_id).await {
		Ok(Some(org)) => org,
		Ok(None) => {
			return not_found::<OrgErrorResponse>("Organization not found").into_response();
		}
		Err(e) => return db_error::<OrgErrorResponse>(e).into_response(),
	};

	match state.org_repo.get_membership(&org_id, &session.user.id).await {
		Ok(Some(_)) => Json(org_response(&org)).into_response(),
		Ok(None) => {
			forbidden::<OrgErrorResponse>("not_a_member", "Not a member of this organization")
				.into_response()
		}
		Err(e) => db_error::<OrgErrorResponse>(e).into_response(),
	}
}

#[utoipa::path(
    patch,
    path = "/api/orgs/{org_id}",
    params(("org_id" = String, Path, description = "Organization ID")),
    request_body = UpdateOrgRequest,
    responses(
        (status = 200, description = "Organization updated", body = OrgResponse),
        (status = 403, description = "Missing organization:update", body = OrgErrorResponse),
        (status = 404, description = "Organization not found", body = OrgErrorResponse)
    ),
    tag = "orgs"
)]
/// Update an organization's name or slug. Requires `organization:update`.
#[tracing::instrument(skip(state, ctx, payload), fields(%org_id))]
pub async fn update_org(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path(org_id): Path<String>,
	Json(payload): Json<UpdateOrgRequest>,
) -> impl IntoResponse {
	let org_id = parse_id!(OrgErrorResponse, parse_org_id(&org_id));
	let member = guard!(
		OrgErrorResponse,
		require_permission(
			&ctx,
			&PermissionRequest::single(Resource::Organization, Action::Update)
		)
	);
	guard!(OrgErrorResponse, ensure_org_scope(member, &org_id));

	let mut org = match state.org_repo.get_org_by_id(&org_id).await {
		Ok(Some(org)) => org,
		Ok(None) => return not_found::<OrgErrorResponse>("Organization not found").into_response(),
		Err(e) => return db_error::<OrgErrorResponse>(e).into_response(),
	};

	if let Some(name) = payload.name {
		let name = name.trim().to_string();
		if name.is_empty() || name.len() > 100 {
			return bad_request::<OrgErrorResponse>(
				"invalid_name",
				"Organization name must be 1-100 characters",
			)
			.into_response();
		}
		org.name = name;
	}
	if let Some(slug) = payload.slug {
		if !validate_slug(&slug, 3, 50) {
			return bad_request::<OrgErrorResponse>(
				"invalid_slug",
				"Slug must be 3-50 lowercase alphanumeric characters or hyphens",
			)
			.into_response();
		}
		org.slug = slug;
	}

	if let Err(e) = state.org_repo.update_org(&org).await {
		return db_error::<OrgErrorResponse>(e).into_response();
	}

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::OrgUpdated)
			.actor(*current_user.actor_user_id())
			.resource("organization", org.id.to_string())
			.action("update")
			.build(),
	);

	Json(org_response(&org)).into_response()
}

#[utoipa::path(
    delete,
    path = "/api/orgs/{org_id}",
    params(("org_id" = String, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Organization deleted", body = OrgSuccessResponse),
        (status = 403, description = "Missing organization:delete", body = OrgErrorResponse)
    ),
    tag = "orgs"
)]
/// Soft-delete an organization. Requires `organization:delete`, which only
/// the owner grant set carries.
#[tracing::instrument(skip(state, ctx), fields(%org_id))]
pub async fn delete_org(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path(org_id): Path<String>,
) -> impl IntoResponse {
	let org_id = parse_id!(OrgErrorResponse, parse_org_id(&org_id));
	let member = guard!(
		OrgErrorResponse,
		require_permission(
			&ctx,
			&PermissionRequest::single(Resource::Organization, Action::Delete)
		)
	);
	guard!(OrgErrorResponse, ensure_org_scope(member, &org_id));

	if let Err(e) = state.org_repo.soft_delete_org(&org_id).await {
		return db_error::<OrgErrorResponse>(e).into_response();
	}

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::OrgDeleted)
			.actor(*current_user.actor_user_id())
			.resource("organization", org_id.to_string())
			.action("delete")
			.build(),
	);

	Json(OrgSuccessResponse {
		message: "Organization deleted".to_string(),
	})
	.into_response()
}

#[utoipa::path(
    post,
    path = "/api/me/active-org",
    request_body = SetActiveOrgRequest,
    responses(
        (status = 200, description = "Active organization set", body = OrgSuccessResponse),
        (status = 400, description = "Team does not belong to the organization", body = OrgErrorResponse),
        (status = 403, description = "Not a member", body = OrgErrorResponse),
        (status = 404, description = "Team not found", body = OrgErrorResponse)
    ),
    tag = "orgs"
)]
/// Select the session's active organization and, optionally, a team
/// within it. Requires membership.
#[tracing::instrument(skip(state, ctx, payload))]
pub async fn set_active_org(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Json(payload): Json<SetActiveOrgRequest>,
) -> impl IntoResponse {
	let session = guard!(OrgErrorResponse, require_auth(&ctx));
	let org_id = parse_id!(OrgErrorResponse, parse_org_id(&payload.org_id));

	match state.org_repo.get_membership(&org_id, &session.user.id).await {
		Ok(Some(_)) => {}
		Ok(None) => {
			return forbidden::<OrgErrorResponse>(
				"not_a_member",
				"Not a member of this organization",
			)
			.into_response();
		}
		Err(e) => return db_error::<OrgErrorResponse>(e).into_response(),
	}

	let team_id = match &payload.team_id {
		Some(raw) => {
			let team_id = parse_id!(OrgErrorResponse, parse_team_id(raw));
			match state.team_repo.get_team(&team_id).await {
				Ok(Some(team)) if team.org_id == org_id => Some(team_id),
				Ok(Some(_)) => {
					return bad_request::<OrgErrorResponse>(
						"team_not_in_org",
						"Team does not belong to this organization",
					)
					.into_response();
				}
				Ok(None) => {
					return not_found::<OrgErrorResponse>("Team not found").into_response();
				}
				Err(e) => return db_error::<OrgErrorResponse>(e).into_response(),
			}
		}
		None => None,
	};

	if let Err(e) = state
		.session_repo
		.set_active_org(&current_user.session_id, Some(&org_id), team_id.as_ref())
		.await
	{
		return db_error::<OrgErrorResponse>(e).into_response();
	}

	Json(OrgSuccessResponse {
		message: "Active organization set".to_string(),
	})
	.into_response()
}

#[utoipa::path(
    get,
    path = "/api/me/active-member",
    responses(
        (status = 200, description = "The caller's active membership", body = ActiveMemberResponse),
        (status = 403, description = "No active organization", body = OrgErrorResponse)
    ),
    tag = "orgs"
)]
/// Get the caller's membership in the active organization, with resolved
/// grants.
#[tracing::instrument(skip(ctx))]
pub async fn get_active_member(RequireAuth(_current_user, ctx): RequireAuth) -> impl IntoResponse {
	let member = guard!(OrgErrorResponse, require_active_organization(&ctx));

	let permissions = match serde_json::to_value(&member.grants) {
		Ok(value) => value,
		Err(e) => {
			tracing::error!(error = %e, "failed to serialize grants");
			return crate::api_response::internal_error::<OrgErrorResponse>(
				"internal server error",
			)
			.into_response();
		}
	};

	Json(ActiveMemberResponse {
		member_id: member.member_id.to_string(),
		org_id: member.org_id.to_string(),
		role: member.role_name.clone(),
		permissions,
	})
	.into_response()
}

#[utoipa::path(
    post,
    path = "/api/me/permissions/check",
    request_body = CheckPermissionRequest,
    responses(
        (status = 200, description = "Evaluation result", body = CheckPermissionResponse),
        (status = 400, description = "Permission map outside the statement", body = OrgErrorResponse),
        (status = 403, description = "No active organization", body = OrgErrorResponse)
    ),
    tag = "orgs"
)]
/// Evaluate a permission map against the caller's active membership.
///
/// Evaluation is pure: the caller's grants were resolved when the request
/// was authenticated, and the answer carries no detail beyond the boolean.
#[tracing::instrument(skip(ctx, payload))]
pub async fn check_permission(
	RequireAuth(_current_user, ctx): RequireAuth,
	Json(payload): Json<CheckPermissionRequest>,
) -> impl IntoResponse {
	let member = guard!(OrgErrorResponse, require_active_organization(&ctx));

	let request = match parse_permission_request(&payload.permissions) {
		Ok(request) => request,
		Err(e) => return bad_request::<OrgErrorResponse>(e.error, e.message).into_response(),
	};

	Json(CheckPermissionResponse {
		allowed: is_allowed(&member.grants, &request),
	})
	.into_response()
}

#[utoipa::path(
    get,
    path = "/api/orgs/{org_id}/members",
    params(("org_id" = String, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Organization members", body = ListOrgMembersResponse),
        (status = 403, description = "Missing member:view", body = OrgErrorResponse)
    ),
    tag = "members"
)]
/// List members with their user records. Requires `member:view`.
#[tracing::instrument(skip(state, ctx), fields(%org_id))]
pub async fn list_members(
	RequireAuth(_current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path(org_id): Path<String>,
) -> impl IntoResponse {
	let org_id = parse_id!(OrgErrorResponse, parse_org_id(&org_id));
	let member = guard!(
		OrgErrorResponse,
		require_permission(
			&ctx,
			&PermissionRequest::single(Resource::Member, Action::View)
		)
	);
	guard!(OrgErrorResponse, ensure_org_scope(member, &org_id));

	match state.org_repo.list_members(&org_id).await {
		Ok(members) => Json(ListOrgMembersResponse {
			members: members
				.iter()
				.map(|(membership, user)| OrgMemberResponse {
					member_id: membership.id.to_string(),
					user_id: user.id.to_string(),
					display_name: user.display_name.clone(),
					email: user.email.clone(),
					role: membership.role.clone(),
					joined_at: membership.created_at,
				})
				.collect(),
		})
		.into_response(),
		Err(e) => db_error::<OrgErrorResponse>(e).into_response(),
	}
}

#[utoipa::path(
    post,
    path = "/api/orgs/{org_id}/members",
    params(("org_id" = String, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Member added", body = OrgSuccessResponse),
        (status = 400, description = "Unknown role", body = OrgErrorResponse),
        (status = 403, description = "Missing member:create", body = OrgErrorResponse),
        (status = 409, description = "Already a member", body = OrgErrorResponse)
    ),
    tag = "members"
)]
/// Add a member directly. Requires `member:create`.
#[tracing::instrument(skip(state, ctx, payload), fields(%org_id))]
pub async fn add_member(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path(org_id): Path<String>,
	Json(payload): Json<AddMemberRequest>,
) -> impl IntoResponse {
	let org_id = parse_id!(OrgErrorResponse, parse_org_id(&org_id));
	let member = guard!(
		OrgErrorResponse,
		require_permission(
			&ctx,
			&PermissionRequest::single(Resource::Member, Action::Create)
		)
	);
	guard!(OrgErrorResponse, ensure_org_scope(member, &org_id));

	let user_id = parse_id!(OrgErrorResponse, parse_user_id(&payload.user_id));
	match state.user_repo.get_user_by_id(&user_id).await {
		Ok(Some(_)) => {}
		Ok(None) => return not_found::<OrgErrorResponse>("User not found").into_response(),
		Err(e) => return db_error::<OrgErrorResponse>(e).into_response(),
	}

	match role_exists(&state, &org_id, &payload.role).await {
		Ok(true) => {}
		Ok(false) => {
			return bad_request::<OrgErrorResponse>(
				"invalid_role",
				format!("Role '{}' does not exist in this organization", payload.role),
			)
			.into_response();
		}
		Err(e) => return db_error::<OrgErrorResponse>(e).into_response(),
	}

	if let Err(e) = state.org_repo.add_member(&org_id, &user_id, &payload.role).await {
		return db_error::<OrgErrorResponse>(e).into_response();
	}

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::MemberAdded)
			.actor(*current_user.actor_user_id())
			.resource("organization", org_id.to_string())
			.action("member_add")
			.details(serde_json::json!({ "user_id": user_id.to_string(), "role": payload.role }))
			.build(),
	);

	Json(OrgSuccessResponse {
		message: "Member added".to_string(),
	})
	.into_response()
}

#[utoipa::path(
    patch,
    path = "/api/orgs/{org_id}/members/{user_id}",
    params(
        ("org_id" = String, Path, description = "Organization ID"),
        ("user_id" = String, Path, description = "User ID")
    ),
    request_body = UpdateMemberRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = OrgSuccessResponse),
        (status = 400, description = "Unknown role", body = OrgErrorResponse),
        (status = 403, description = "Missing member:update-role", body = OrgErrorResponse),
        (status = 409, description = "Would demote the last owner", body = OrgErrorResponse)
    ),
    tag = "members"
)]
/// Change a member's role. Requires `member:update-role`. The last owner
/// cannot be demoted.
#[tracing::instrument(skip(state, ctx, payload), fields(%org_id, %user_id))]
pub async fn update_member_role(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path((org_id, user_id)): Path<(String, String)>,
	Json(payload): Json<UpdateMemberRoleRequest>,
) -> impl IntoResponse {
	let org_id = parse_id!(OrgErrorResponse, parse_org_id(&org_id));
	let member = guard!(
		OrgErrorResponse,
		require_permission(
			&ctx,
			&PermissionRequest::single(Resource::Member, Action::UpdateRole)
		)
	);
	guard!(OrgErrorResponse, ensure_org_scope(member, &org_id));

	let user_id = parse_id!(OrgErrorResponse, parse_user_id(&user_id));

	match role_exists(&state, &org_id, &payload.role).await {
		Ok(true) => {}
		Ok(false) => {
			return bad_request::<OrgErrorResponse>(
				"invalid_role",
				format!("Role '{}' does not exist in this organization", payload.role),
			)
			.into_response();
		}
		Err(e) => return db_error::<OrgErrorResponse>(e).into_response(),
	}

	if let Err(e) = state
		.org_repo
		.update_member_role(&org_id, &user_id, &payload.role)
		.await
	{
		return db_error::<OrgErrorResponse>(e).into_response();
	}

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::MemberRoleChanged)
			.actor(*current_user.actor_user_id())
			.resource("organization", org_id.to_string())
			.action("member_update_role")
			.details(serde_json::json!({ "user_id": user_id.to_string(), "role": payload.role }))
			.build(),
	);

	Json(OrgSuccessResponse {
		message: "Member role updated".to_string(),
	})
	.into_response()
}

#[utoipa::path(
    delete,
    path = "/api/orgs/{org_id}/members/{user_id}",
    params(
        ("org_id" = String, Path, description = "Organization ID"),
        ("user_id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Member removed", body = OrgSuccessResponse),
        (status = 403, description = "Missing member:delete", body = OrgErrorResponse),
        (status = 409, description = "Would remove the last owner", body = OrgErrorResponse)
    ),
    tag = "members"
)]
/// Remove a member. Requires `member:delete`. The last owner cannot be
/// removed.
#[tracing::instrument(skip(state, ctx), fields(%org_id, %user_id))]
pub async fn remove_member(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path((org_id, user_id)): Path<(String, String)>,
) -> impl IntoResponse {
	let org_id = parse_id!(OrgErrorResponse, parse_org_id(&org_id));
	let member = guard!(
		OrgErrorResponse,
		require_permission(
			&ctx,
			&PermissionRequest::single(Resource::Member, Action::Delete)
		)
	);
	guard!(OrgErrorResponse, ensure_org_scope(member, &org_id));

	let user_id = parse_id!(OrgErrorResponse, parse_user_id(&user_id));

	match state.org_repo.remove_member(&org_id, &user_id).await {
		Ok(true) => {}
		Ok(false) => return not_found::<OrgErrorResponse>("Membership not found").into_response(),
		Err(e) => return db_error::<OrgErrorResponse>(e).into_response(),
	}

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::MemberRemoved)
			.actor(*current_user.actor_user_id())
			.resource("organization", org_id.to_string())
			.action("member_remove")
			.details(serde_json::json!({ "user_id": user_id.to_string() }))
			.build(),
	);

	Json(OrgSuccessResponse {
		message: "Member removed".to_string(),
	})
	.into_response()
}

#[utoipa::path(
    post,
    path = "/api/orgs/{org_id}/transfer-ownership",
    params(("org_id" = String, Path, description = "Organization ID")),
    request_body = TransferOwnershipRequest,
    responses(
        (status = 200, description = "Ownership transferred", body = OrgSuccessResponse),
        (status = 403, description = "Owner role required", body = OrgErrorResponse)
    ),
    tag = "members"
)]
/// Transfer ownership to another user. Owner only; the transfer is a
/// single transaction and the caller is demoted to moderator.
#[tracing::instrument(skip(state, ctx, payload), fields(%org_id))]
pub async fn transfer_ownership(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path(org_id): Path<String>,
	Json(payload): Json<TransferOwnershipRequest>,
) -> impl IntoResponse {
	let org_id = parse_id!(OrgErrorResponse, parse_org_id(&org_id));
	let member = guard!(
		OrgErrorResponse,
		require_role(&ctx, &OrgRole::Owner.to_string())
	);
	guard!(OrgErrorResponse, ensure_org_scope(member, &org_id));

	let new_owner = parse_id!(OrgErrorResponse, parse_user_id(&payload.new_owner_user_id));
	let from_user = member.user_id;
	if new_owner == from_user {
		return bad_request::<OrgErrorResponse>(
			"invalid_transfer",
			"Cannot transfer ownership to yourself",
		)
		.into_response();
	}

	if let Err(e) = state
		.org_repo
		.transfer_ownership(&org_id, &from_user, &new_owner)
		.await
	{
		return db_error::<OrgErrorResponse>(e).into_response();
	}

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::OwnershipTransferred)
			.actor(*current_user.actor_user_id())
			.resource("organization", org_id.to_string())
			.action("transfer_ownership")
			.details(serde_json::json!({
				"from_user_id": from_user.to_string(),
				"to_user_id": new_owner.to_string(),
			}))
			.build(),
	);

	Json(OrgSuccessResponse {
		message: "Ownership transferred".to_string(),
	})
	.into_response()
}
