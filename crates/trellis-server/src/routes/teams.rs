// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Team HTTP handlers.
//!
//! Teams live inside an organization. Reads require `team:view`; adding
//! and removing team members requires `team:manage-members`.

use axum::{
	extract::{Path, State},
	http::StatusCode,
	response::IntoResponse,
	Json,
};
use trellis_server_audit::{AuditEventType, AuditLogEntry};
use trellis_server_auth::{require_permission, Action, PermissionRequest, Resource, Team};
use trellis_server_db::{OrgStore, TeamStore};

pub use trellis_server_api::teams::*;

use crate::{
	api::AppState,
	api_response::{bad_request, db_error, not_found},
	auth_middleware::RequireAuth,
	guard, impl_api_error_response, parse_id,
	routes::ensure_org_scope,
	validation::{parse_org_id, parse_team_id, parse_user_id},
};

impl_api_error_response!(TeamErrorResponse);

fn team_response(team: &Team) -> TeamResponse {
	TeamResponse {
		id: team.id.to_string(),
		org_id: team.org_id.to_string(),
		name: team.name.clone(),
		created_at: team.created_at,
		updated_at: team.updated_at,
	}
}

fn valid_team_name(name: &str) -> bool {
	let name = name.trim();
	!name.is_empty() && name.len() <= 100
}

/// Load a team and check it belongs to the given organization.
async fn load_scoped_team(
	state: &AppState,
	org_id: &trellis_server_auth::OrgId,
	team_id: &trellis_server_auth::TeamId,
) -> Result<Team, (StatusCode, Json<TeamErrorResponse>)> {
	match state.team_repo.get_team(team_id).await {
		Ok(Some(team)) if team.org_id == *org_id => Ok(team),
		Ok(_) => Err(not_found::<TeamErrorResponse>("Team not found")),
		Err(e) => Err(db_error::<TeamErrorResponse>(e)),
	}
}

#[utoipa::path(
    get,
    path = "/api/orgs/{org_id}/teams",
    params(("org_id" = String, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Teams in the organization", body = ListTeamsResponse),
        (status = 403, description = "Missing team:view", body = TeamErrorResponse)
    ),
    tag = "teams"
)]
/// List teams. Requires `team:view`.
#[tracing::instrument(skip(state, ctx), fields(%org_id))]
pub async fn list_teams(
	RequireAuth(_current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path(org_id): Path<String>,
) -> impl IntoResponse {
	let org_id = parse_id!(TeamErrorResponse, parse_org_id(&org_id));
	let member = guard!(
		TeamErrorResponse,
		require_permission(
			&ctx,
			&PermissionRequest::single(Resource::Team, Action::View)
		)
	);
	guard!(TeamErrorResponse, ensure_org_scope(member, &org_id));

	match state.team_repo.list_teams(&org_id).await {
		Ok(teams) => Json(ListTeamsResponse {
			teams: teams.iter().map(team_response).collect(),
		})
		.into_response(),
		Err(e) => db_error::<TeamErrorResponse>(e).into_response(),
	}
}

#[utoipa::path(
    post,
    path = "/api/orgs/{org_id}/teams",
    params(("org_id" = String, Path, description = "Organization ID")),
    request_body = CreateTeamRequest,
    responses(
        (status = 201, description = "Team created", body = TeamResponse),
        (status = 400, description = "Invalid team name", body = TeamErrorResponse),
        (status = 403, description = "Missing team:create", body = TeamErrorResponse),
        (status = 409, description = "Team name already taken", body = TeamErrorResponse)
    ),
    tag = "teams"
)]
/// Create a team. Requires `team:create`. Names are unique per
/// organization.
#[tracing::instrument(skip(state, ctx, payload), fields(%org_id))]
pub async fn create_team(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path(org_id): Path<String>,
	Json(payload): Json<CreateTeamRequest>,
) -> impl IntoResponse {
	let org_id = parse_id!(TeamErrorResponse, parse_org_id(&org_id));
	let member = guard!(
		TeamErrorResponse,
		require_permission(
			&ctx,
			&PermissionRequest::single(Resource::Team, Action::Create)
		)
	);
	guard!(TeamErrorResponse, ensure_org_scope(member, &org_id));

	if !valid_team_name(&payload.name) {
		return bad_request::<TeamErrorResponse>(
			"invalid_name",
			"Team name must be 1-100 characters",
		)
		.into_response();
	}

	let team = Team::new(org_id, payload.name.trim());
	if let Err(e) = state.team_repo.create_team(&team).await {
		return db_error::<TeamErrorResponse>(e).into_response();
	}

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::TeamCreated)
			.actor(*current_user.actor_user_id())
			.resource("team", team.id.to_string())
			.action("create")
			.details(serde_json::json!({ "org_id": org_id.to_string(), "name": team.name }))
			.build(),
	);

	(StatusCode::CREATED, Json(team_response(&team))).into_response()
}

#[utoipa::path(
    get,
    path = "/api/orgs/{org_id}/teams/{team_id}",
    params(
        ("org_id" = String, Path, description = "Organization ID"),
        ("team_id" = String, Path, description = "Team ID")
    ),
    responses(
        (status = 200, description = "The team", body = TeamResponse),
        (status = 403, description = "Missing team:view", body = TeamErrorResponse),
        (status = 404, description = "Team not found", body = TeamErrorResponse)
    ),
    tag = "teams"
)]
/// Get a team. Requires `team:view`.
#[tracing::instrument(skip(state, ctx), fields(%org_id, %team_id))]
pub async fn get_team(
	RequireAuth(_current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path((org_id, team_id)): Path<(String, String)>,
) -> impl IntoResponse {
	let org_id = parse_id!(TeamErrorResponse, parse_org_id(&org_id));
	let member = guard!(
		TeamErrorResponse,
		require_permission(
			&ctx,
			&PermissionRequest::single(Resource::Team, Action::View)
		)
	);
	guard!(TeamErrorResponse, ensure_org_scope(member, &org_id));

	let team_id = parse_id!(TeamErrorResponse, parse_team_id(&team_id));
	match load_scoped_team(&state, &org_id, &team_id).await {
		Ok(team) => Json(team_response(&team)).into_response(),
		Err(response) => response.into_response(),
	}
}

#[utoipa::path(
    patch,
    path = "/api/orgs/{org_id}/teams/{team_id}",
    params(
        ("org_id" = String, Path, description = "Organization ID"),
        ("team_id" = String, Path, description = "Team ID")
    ),
    request_body = UpdateTeamRequest,
    responses(
        (status = 200, description = "Team renamed", body = TeamResponse),
        (status = 403, description = "Missing team:update", body = TeamErrorResponse),
        (status = 404, description = "Team not found", body = TeamErrorResponse)
    ),
    tag = "teams"
)]
/// Rename a team. Requires `team:update`.
#[tracing::instrument(skip(state, ctx, payload), fields(%org_id, %team_id))]
pub async fn update_team(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path((org_id, team_id)): Path<(String, String)>,
	Json(payload): Json<UpdateTeamRequest>,
) -> impl IntoResponse {
	let org_id = parse_id!(TeamErrorResponse, parse_org_id(&org_id));
	let member = guard!(
		TeamErrorResponse,
		require_permission(
			&ctx,
			&PermissionRequest::single(Resource::Team, Action::Update)
		)
	);
	guard!(TeamErrorResponse, ensure_org_scope(member, &org_id));

	let team_id = parse_id!(TeamErrorResponse, parse_team_id(&team_id));
	if let Err(response) = load_scoped_team(&state, &org_id, &team_id).await {
		return response.into_response();
	}

	if !valid_team_name(&payload.name) {
		return bad_request::<TeamErrorResponse>(
			"invalid_name",
			"Team name must be 1-100 characters",
		)
		.into_response();
	}

	if let Err(e) = state.team_repo.update_team(&team_id, payload.name.trim()).await {
		return db_error::<TeamErrorResponse>(e).into_response();
	}

	let team = match state.team_repo.get_team(&team_id).await {
		Ok(Some(team)) => team,
		Ok(None) => return not_found::<TeamErrorResponse>("Team not found").into_response(),
		Err(e) => return db_error::<TeamErrorResponse>(e).into_response(),
	};

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::TeamUpdated)
			.actor(*current_user.actor_user_id())
			.resource("team", team_id.to_string())
			.action("update")
			.build(),
	);

	Json(team_response(&team)).into_response()
}

#[utoipa::path(
    delete,
    path = "/api/orgs/{org_id}/teams/{team_id}",
    params(
        ("org_id" = String, Path, description = "Organization ID"),
        ("team_id" = String, Path, description = "Team ID")
    ),
    responses(
        (status = 200, description = "Team deleted", body = TeamSuccessResponse),
        (status = 403, description = "Missing team:delete", body = TeamErrorResponse),
        (status = 404, description = "Team not found", body = TeamErrorResponse)
    ),
    tag = "teams"
)]
/// Delete a team and its memberships. Requires `team:delete`.
#[tracing::instrument(skip(state, ctx), fields(%org_id, %team_id))]
pub async fn delete_team(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path((org_id, team_id)): Path<(String, String)>,
) -> impl IntoResponse {
	let org_id = parse_id!(TeamErrorResponse, parse_org_id(&org_id));
	let member = guard!(
		TeamErrorResponse,
		require_permission(
			&ctx,
			&PermissionRequest::single(Resource::Team, Action::Delete)
		)
	);
	guard!(TeamErrorResponse, ensure_org_scope(member, &org_id));

	let team_id = parse_id!(TeamErrorResponse, parse_team_id(&team_id));
	if let Err(response) = load_scoped_team(&state, &org_id, &team_id).await {
		return response.into_response();
	}

	match state.team_repo.delete_team(&team_id).await {
		Ok(true) => {}
		Ok(false) => return not_found::<TeamErrorResponse>("Team not found").into_response(),
		Err(e) => return db_error::<TeamErrorResponse>(e).into_response(),
	}

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::TeamDeleted)
			.actor(*current_user.actor_user_id())
			.resource("team", team_id.to_string())
			.action("delete")
			.build(),
	);

	Json(TeamSuccessResponse {
		message: "Team deleted".to_string(),
	})
	.into_response()
}

#[utoipa::path(
    get,
    path = "/api/orgs/{org_id}/teams/{team_id}/members",
    params(
        ("org_id" = String, Path, description = "Organization ID"),
        ("team_id" = String, Path, description = "Team ID")
    ),
    responses(
        (status = 200, description = "Team members", body = ListTeamMembersResponse),
        (status = 403, description = "Missing team:view", body = TeamErrorResponse)
    ),
    tag = "teams"
)]
/// List team members. Requires `team:view`.
#[tracing::instrument(skip(state, ctx), fields(%org_id, %team_id))]
pub async fn list_team_members(
	RequireAuth(_current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path((org_id, team_id)): Path<(String, String)>,
) -> impl IntoResponse {
	let org_id = parse_id!(TeamErrorResponse, parse_org_id(&org_id));
	let member = guard!(
		TeamErrorResponse,
		require_permission(
			&ctx,
			&PermissionRequest::single(Resource::Team, Action::View)
		)
	);
	guard!(TeamErrorResponse, ensure_org_scope(member, &org_id));

	let team_id = parse_id!(TeamErrorResponse, parse_team_id(&team_id));
	if let Err(response) = load_scoped_team(&state, &org_id, &team_id).await {
		return response.into_response();
	}

	match state.team_repo.list_team_members(&team_id).await {
		Ok(members) => Json(ListTeamMembersResponse {
			members: members
				.iter()
				.map(|m| TeamMemberResponse {
					user_id: m.user_id.to_string(),
					added_at: m.created_at,
				})
				.collect(),
		})
		.into_response(),
		Err(e) => db_error::<TeamErrorResponse>(e).into_response(),
	}
}

#[utoipa::path(
    post,
    path = "/api/orgs/{org_id}/teams/{team_id}/members",
    params(
        ("org_id" = String, Path, description = "Organization ID"),
        ("team_id" = String, Path, description = "Team ID")
    ),
    request_body = AddTeamMemberRequest,
    responses(
        (status = 200, description = "Member added to team", body = TeamSuccessResponse),
        (status = 400, description = "User is not an organization member", body = TeamErrorResponse),
        (status = 403, description = "Missing team:manage-members", body = TeamErrorResponse),
        (status = 409, description = "Already a team member", body = TeamErrorResponse)
    ),
    tag = "teams"
)]
/// Add an organization member to a team. Requires `team:manage-members`.
#[tracing::instrument(skip(state, ctx, payload), fields(%org_id, %team_id))]
pub async fn add_team_member(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path((org_id, team_id)): Path<(String, String)>,
	Json(payload): Json<AddTeamMemberRequest>,
) -> impl IntoResponse {
	let org_id = parse_id!(TeamErrorResponse, parse_org_id(&org_id));
	let member = guard!(
		TeamErrorResponse,
		require_permission(
			&ctx,
			&PermissionRequest::single(Resource::Team, Action::ManageMembers)
		)
	);
	guard!(TeamErrorResponse, ensure_org_scope(member, &org_id));

	let team_id = parse_id!(TeamErrorResponse, parse_team_id(&team_id));
	if let Err(response) = load_scoped_team(&state, &org_id, &team_id).await {
		return response.into_response();
	}

	let user_id = parse_id!(TeamErrorResponse, parse_user_id(&payload.user_id));

	// Team members must already belong to the organization.
	match state.org_repo.get_membership(&org_id, &user_id).await {
		Ok(Some(_)) => {}
		Ok(None) => {
			return bad_request::<TeamErrorResponse>(
				"not_an_org_member",
				"User is not a member of this organization",
			)
			.into_response();
		}
		Err(e) => return db_error::<TeamErrorResponse>(e).into_response(),
	}

	if let Err(e) = state.team_repo.add_team_member(&team_id, &user_id).await {
		return db_error::<TeamErrorResponse>(e).into_response();
	}

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::TeamMemberAdded)
			.actor(*current_user.actor_user_id())
			.resource("team", team_id.to_string())
			.action("member_add")
			.details(serde_json::json!({ "user_id": user_id.to_string() }))
			.build(),
	);

	Json(TeamSuccessResponse {
		message: "Member added to team".to_string(),
	})
	.into_response()
}

#[utoipa::path(
    delete,
    path = "/api/orgs/{org_id}/teams/{team_id}/members/{user_id}",
    params(
        ("org_id" = String, Path, description = "Organization ID"),
        ("team_id" = String, Path, description = "Team ID"),
        ("user_id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Member removed from team", body = TeamSuccessResponse),
        (status = 403, description = "Missing team:manage-members", body = TeamErrorResponse),
        (status = 404, description = "Not a team member", body = TeamErrorResponse)
    ),
    tag = "teams"
)]
/// Remove a member from a team. Requires `team:manage-members`.
#[tracing::instrument(skip(state, ctx), fields(%org_id, %team_id, %user_id))]
pub async fn remove_team_member(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path((org_id, team_id, user_id)): Path<(String, String, String)>,
) -> impl IntoResponse {
	let org_id = parse_id!(TeamErrorResponse, parse_org_id(&org_id));
	let member = guard!(
		TeamErrorResponse,
		require_permission(
			&ctx,
			&PermissionRequest::single(Resource::Team, Action::ManageMembers)
		)
	);
	guard!(TeamErrorResponse, ensure_org_scope(member, &org_id));

	let team_id = parse_id!(TeamErrorResponse, parse_team_id(&team_id));
	if let Err(response) = load_scoped_team(&state, &org_id, &team_id).await {
		return response.into_response();
	}

	let user_id = parse_id!(TeamErrorResponse, parse_user_id(&user_id));
	match state.team_repo.remove_team_member(&team_id, &user_id).await {
		Ok(true) => {}
		Ok(false) => {
			return not_found::<TeamErrorResponse>("Not a member of this team").into_response();
		}
		Err(e) => return db_error::<TeamErrorResponse>(e).into_response(),
	}

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::TeamMemberRemoved)
			.actor(*current_user.actor_user_id())
			.resource("team", team_id.to_string())
			.action("member_remove")
			.details(serde_json::json!({ "user_id": user_id.to_string() }))
			.build(),
	);

	Json(TeamSuccessResponse {
		message: "Member removed from team".to_string(),
	})
	.into_response()
}
