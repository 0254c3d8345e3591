// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Custom role HTTP handlers.
//!
//! Role management sits behind the `ac` (access-control) resource. Grant
//! maps are validated against the permission statement on the way in; a
//! map naming an unknown resource, an unknown action, or an action the
//! statement does not declare for its resource is rejected outright.

use axum::{
	extract::{Path, State},
	http::StatusCode,
	response::IntoResponse,
	Json,
};
use trellis_server_audit::{AuditEventType, AuditLogEntry};
use trellis_server_auth::{
	require_permission, Action, OrgRole, PermissionRequest, Resource, RoleDefinition, RoleGrants,
};
use trellis_server_db::{OrgStore, RoleStore};

pub use trellis_server_api::roles::*;

use crate::{
	api::AppState,
	api_response::{bad_request, conflict, db_error, internal_error, not_found},
	auth_middleware::RequireAuth,
	guard, impl_api_error_response, parse_id,
	routes::ensure_org_scope,
	validation::{parse_org_id, parse_role_id, validate_custom_role_name},
};

impl_api_error_response!(RoleErrorResponse);

fn builtin_role_response(role: OrgRole) -> Result<RoleResponse, serde_json::Error> {
	Ok(RoleResponse {
		id: None,
		name: role.to_string(),
		permissions: serde_json::to_value(role.grants())?,
		description: None,
		color: trellis_server_auth::DEFAULT_ROLE_COLOR.to_string(),
		level: role.level(),
		is_builtin: true,
		created_at: None,
	})
}

fn custom_role_response(role: &RoleDefinition) -> Result<RoleResponse, serde_json::Error> {
	Ok(RoleResponse {
		id: Some(role.id.to_string()),
		name: role.name.clone(),
		permissions: serde_json::to_value(&role.grants)?,
		description: role.description.clone(),
		color: role.color.clone(),
		level: role.level,
		is_builtin: false,
		created_at: Some(role.created_at),
	})
}

/// Load a custom role and check it belongs to the given organization.
async fn load_scoped_role(
	state: &AppState,
	org_id: &trellis_server_auth::OrgId,
	role_id: &trellis_server_auth::RoleId,
) -> Result<RoleDefinition, (StatusCode, Json<RoleErrorResponse>)> {
	match state.role_repo.get_role(role_id).await {
		Ok(Some(role)) if role.org_id == *org_id => Ok(role),
		Ok(_) => Err(not_found::<RoleErrorResponse>("Role not found")),
		Err(e) => Err(db_error::<RoleErrorResponse>(e)),
	}
}

#[utoipa::path(
    get,
    path = "/api/orgs/{org_id}/roles",
    params(("org_id" = String, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Built-in and custom roles", body = ListRolesResponse),
        (status = 403, description = "Missing ac:view", body = RoleErrorResponse)
    ),
    tag = "roles"
)]
/// List all roles: the three built-ins followed by the organization's
/// custom roles. Requires `ac:view`.
#[tracing::instrument(skip(state, ctx), fields(%org_id))]
pub async fn list_roles(
	RequireAuth(_current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path(org_id): Path<String>,
) -> impl IntoResponse {
	let org_id = parse_id!(RoleErrorResponse, parse_org_id(&org_id));
	let member = guard!(
		RoleErrorResponse,
		require_permission(
			&ctx,
			&PermissionRequest::single(Resource::AccessControl, Action::View)
		)
	);
	guard!(RoleErrorResponse, ensure_org_scope(member, &org_id));

	let custom = match state.role_repo.list_roles(&org_id).await {
		Ok(roles) => roles,
		Err(e) => return db_error::<RoleErrorResponse>(e).into_response(),
	};

	let mut roles = Vec::with_capacity(OrgRole::all().len() + custom.len());
	for builtin in OrgRole::all() {
		match builtin_role_response(*builtin) {
			Ok(response) => roles.push(response),
			Err(e) => {
				tracing::error!(error = %e, "failed to serialize built-in grants");
				return internal_error::<RoleErrorResponse>("internal server error")
					.into_response();
			}
		}
	}
	for role in &custom {
		match custom_role_response(role) {
			Ok(response) => roles.push(response),
			Err(e) => {
				tracing::error!(error = %e, role = %role.name, "failed to serialize role grants");
				return internal_error::<RoleErrorResponse>("internal server error")
					.into_response();
			}
		}
	}

	Json(ListRolesResponse { roles }).into_response()
}

#[utoipa::path(
    post,
    path = "/api/orgs/{org_id}/roles",
    params(("org_id" = String, Path, description = "Organization ID")),
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "Role created", body = RoleResponse),
        (status = 400, description = "Invalid name or grant map", body = RoleErrorResponse),
        (status = 403, description = "Missing ac:create", body = RoleErrorResponse),
        (status = 409, description = "Duplicate name or role limit reached", body = RoleErrorResponse)
    ),
    tag = "roles"
)]
/// Create a custom role. Requires `ac:create`. Organizations are capped
/// at a fixed number of custom roles; the count check and insert are one
/// transaction.
#[tracing::instrument(skip(state, ctx, payload), fields(%org_id))]
pub async fn create_role(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path(org_id): Path<String>,
	Json(payload): Json<CreateRoleRequest>,
) -> impl IntoResponse {
	let org_id = parse_id!(RoleErrorResponse, parse_org_id(&org_id));
	let member = guard!(
		RoleErrorResponse,
		require_permission(
			&ctx,
			&PermissionRequest::single(Resource::AccessControl, Action::Create)
		)
	);
	guard!(RoleErrorResponse, ensure_org_scope(member, &org_id));

	if !validate_custom_role_name(&payload.name) {
		return bad_request::<RoleErrorResponse>(
			"invalid_role_name",
			"Role names are lowercase kebab-case, at most 32 characters, and may not shadow a built-in role",
		)
		.into_response();
	}

	let grants = match RoleGrants::parse(&payload.permissions) {
		Ok(grants) => grants,
		Err(e) => {
			return bad_request::<RoleErrorResponse>("invalid_permissions", e.to_string())
				.into_response();
		}
	};

	let mut role = RoleDefinition::new(org_id, &payload.name, grants);
	role.description = payload.description;
	if let Some(color) = payload.color {
		role.color = color;
	}
	if let Some(level) = payload.level {
		role.level = level;
	}

	if let Err(e) = state.role_repo.create_role(&role).await {
		return db_error::<RoleErrorResponse>(e).into_response();
	}

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::RoleCreated)
			.actor(*current_user.actor_user_id())
			.resource("role", role.id.to_string())
			.action("create")
			.details(serde_json::json!({ "org_id": org_id.to_string(), "name": role.name }))
			.build(),
	);

	match custom_role_response(&role) {
		Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
		Err(e) => {
			tracing::error!(error = %e, "failed to serialize role grants");
			internal_error::<RoleErrorResponse>("internal server error").into_response()
		}
	}
}

#[utoipa::path(
    patch,
    path = "/api/orgs/{org_id}/roles/{role_id}",
    params(
        ("org_id" = String, Path, description = "Organization ID"),
        ("role_id" = String, Path, description = "Role ID")
    ),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = RoleResponse),
        (status = 400, description = "Invalid name or grant map", body = RoleErrorResponse),
        (status = 403, description = "Missing ac:update", body = RoleErrorResponse),
        (status = 404, description = "Role not found", body = RoleErrorResponse),
        (status = 409, description = "System roles cannot be modified", body = RoleErrorResponse)
    ),
    tag = "roles"
)]
/// Update a custom role. Requires `ac:update`. Built-in roles have no
/// database row and system roles reject updates.
#[tracing::instrument(skip(state, ctx, payload), fields(%org_id, %role_id))]
pub async fn update_role(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path((org_id, role_id)): Path<(String, String)>,
	Json(payload): Json<UpdateRoleRequest>,
) -> impl IntoResponse {
	let org_id = parse_id!(RoleErrorResponse, parse_org_id(&org_id));
	let member = guard!(
		RoleErrorResponse,
		require_permission(
			&ctx,
			&PermissionRequest::single(Resource::AccessControl, Action::Update)
		)
	);
	guard!(RoleErrorResponse, ensure_org_scope(member, &org_id));

	let role_id = parse_id!(RoleErrorResponse, parse_role_id(&role_id));
	let mut role = match load_scoped_role(&state, &org_id, &role_id).await {
		Ok(role) => role,
		Err(response) => return response.into_response(),
	};

	if let Some(name) = payload.name {
		if !validate_custom_role_name(&name) {
			return bad_request::<RoleErrorResponse>(
				"invalid_role_name",
				"Role names are lowercase kebab-case, at most 32 characters, and may not shadow a built-in role",
			)
			.into_response();
		}
		role.name = name;
	}
	if let Some(permissions) = payload.permissions {
		role.grants = match RoleGrants::parse(&permissions) {
			Ok(grants) => grants,
			Err(e) => {
				return bad_request::<RoleErrorResponse>("invalid_permissions", e.to_string())
					.into_response();
			}
		};
	}
	if let Some(description) = payload.description {
		role.description = Some(description);
	}
	if let Some(color) = payload.color {
		role.color = color;
	}
	if let Some(level) = payload.level {
		role.level = level;
	}

	if let Err(e) = state.role_repo.update_role(&role).await {
		return db_error::<RoleErrorResponse>(e).into_response();
	}

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::RoleUpdated)
			.actor(*current_user.actor_user_id())
			.resource("role", role_id.to_string())
			.action("update")
			.build(),
	);

	match custom_role_response(&role) {
		Ok(response) => Json(response).into_response(),
		Err(e) => {
			tracing::error!(error = %e, "failed to serialize role grants");
			internal_error::<RoleErrorResponse>("internal server error").into_response()
		}
	}
}

#[utoipa::path(
    delete,
    path = "/api/orgs/{org_id}/roles/{role_id}",
    params(
        ("org_id" = String, Path, description = "Organization ID"),
        ("role_id" = String, Path, description = "Role ID")
    ),
    responses(
        (status = 200, description = "Role deleted", body = RoleSuccessResponse),
        (status = 403, description = "Missing ac:delete", body = RoleErrorResponse),
        (status = 404, description = "Role not found", body = RoleErrorResponse),
        (status = 409, description = "Role is a system role or still assigned", body = RoleErrorResponse)
    ),
    tag = "roles"
)]
/// Delete a custom role. Requires `ac:delete`. A role still assigned to
/// any member cannot be deleted.
#[tracing::instrument(skip(state, ctx), fields(%org_id, %role_id))]
pub async fn delete_role(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path((org_id, role_id)): Path<(String, String)>,
) -> impl IntoResponse {
	let org_id = parse_id!(RoleErrorResponse, parse_org_id(&org_id));
	let member = guard!(
		RoleErrorResponse,
		require_permission(
			&ctx,
			&PermissionRequest::single(Resource::AccessControl, Action::Delete)
		)
	);
	guard!(RoleErrorResponse, ensure_org_scope(member, &org_id));

	let role_id = parse_id!(RoleErrorResponse, parse_role_id(&role_id));
	let role = match load_scoped_role(&state, &org_id, &role_id).await {
		Ok(role) => role,
		Err(response) => return response.into_response(),
	};

	let members = match state.org_repo.list_members(&org_id).await {
		Ok(members) => members,
		Err(e) => return db_error::<RoleErrorResponse>(e).into_response(),
	};
	if members.iter().any(|(membership, _)| membership.role == role.name) {
		return conflict::<RoleErrorResponse>(
			"role_in_use",
			"Role is still assigned to at least one member",
		)
		.into_response();
	}

	if let Err(e) = state.role_repo.delete_role(&role_id).await {
		return db_error::<RoleErrorResponse>(e).into_response();
	}

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::RoleDeleted)
			.actor(*current_user.actor_user_id())
			.resource("role", role_id.to_string())
			.action("delete")
			.details(serde_json::json!({ "name": role.name }))
			.build(),
	);

	Json(RoleSuccessResponse {
		message: "Role deleted".to_string(),
	})
	.into_response()
}
