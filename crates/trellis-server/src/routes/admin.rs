// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Platform admin HTTP handlers.
//!
//! Every handler here requires the platform admin system role and sits
//! behind the strict rate-limit tier. Mutations are audit logged with the
//! real actor, so an impersonating admin's actions attribute to the admin,
//! never the impersonated account.

use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	response::IntoResponse,
	Json,
};
use chrono::Utc;
use trellis_server_audit::{AuditEventType, AuditLogEntry, AuditSeverity};
use trellis_server_auth::{
	hash_password, is_allowed, require_system_admin, OrgRole, PasswordError, SystemRole, User,
	UserId,
};
use trellis_server_db::{InvitationStore, OrgStore, RoleStore, SessionStore, UserStore};

pub use trellis_server_api::admin::*;
use trellis_server_api::invitations::ListInvitationsResponse;
use trellis_server_api::orgs::{
	ListAllOrgsParams, ListAllOrgsResponse, ListOrgsResponse, OrgDetailResponse, OrgMemberResponse,
	OrgResponse,
};
use trellis_server_api::roles::CheckPermissionResponse;

use crate::{
	api::AppState,
	api_response::{bad_request, db_error, not_found},
	auth_middleware::RequireAuth,
	guard, impl_api_error_response, parse_id,
	routes::invitations::invitation_response,
	validation::{
		looks_like_email, parse_org_id, parse_permission_request, parse_session_id, parse_user_id,
		sanitize_email,
	},
};

impl_api_error_response!(AdminErrorResponse);

fn user_response(user: &User) -> AdminUserResponse {
	AdminUserResponse {
		id: user.id.to_string(),
		display_name: user.display_name.clone(),
		email: user.email.clone(),
		system_role: user.system_role.to_string(),
		banned: user.banned,
		ban_reason: user.ban_reason.clone(),
		ban_expires_at: user.ban_expires_at,
		created_at: user.created_at,
		updated_at: user.updated_at,
	}
}

/// Load a user or answer 404.
async fn load_user(
	state: &AppState,
	user_id: &UserId,
) -> Result<User, (StatusCode, Json<AdminErrorResponse>)> {
	match state.user_repo.get_user_by_id(user_id).await {
		Ok(Some(user)) => Ok(user),
		Ok(None) => Err(not_found::<AdminErrorResponse>("User not found")),
		Err(e) => Err(db_error::<AdminErrorResponse>(e)),
	}
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(ListUsersParams),
    responses(
        (status = 200, description = "Paginated users", body = ListUsersResponse),
        (status = 403, description = "Admin role required", body = AdminErrorResponse)
    ),
    tag = "admin"
)]
/// List users with optional search over name and email.
#[tracing::instrument(skip(state, ctx))]
pub async fn list_users(
	RequireAuth(_current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Query(params): Query<ListUsersParams>,
) -> impl IntoResponse {
	guard!(AdminErrorResponse, require_system_admin(&ctx));

	let limit = params.limit.clamp(1, 200);
	let offset = params.offset.max(0);
	let search = params.search.as_deref().filter(|s| !s.trim().is_empty());

	let users = match state.user_repo.list_users(search, limit, offset).await {
		Ok(users) => users,
		Err(e) => return db_error::<AdminErrorResponse>(e).into_response(),
	};
	let total = match state.user_repo.count_users(search).await {
		Ok(total) => total,
		Err(e) => return db_error::<AdminErrorResponse>(e).into_response(),
	};

	Json(ListUsersResponse {
		users: users.iter().map(user_response).collect(),
		total,
		limit,
		offset,
	})
	.into_response()
}

#[utoipa::path(
    post,
    path = "/api/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = AdminUserResponse),
        (status = 400, description = "Invalid email, role, or password", body = AdminErrorResponse),
        (status = 403, description = "Admin role required", body = AdminErrorResponse),
        (status = 409, description = "Email already in use", body = AdminErrorResponse)
    ),
    tag = "admin"
)]
/// Create a user with a password.
#[tracing::instrument(skip(state, ctx, payload))]
pub async fn create_user(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Json(payload): Json<CreateUserRequest>,
) -> impl IntoResponse {
	guard!(AdminErrorResponse, require_system_admin(&ctx));

	let email = sanitize_email(&payload.email);
	if !looks_like_email(&email) {
		return bad_request::<AdminErrorResponse>(
			"invalid_email",
			"A valid email address is required",
		)
		.into_response();
	}
	let display_name = payload.display_name.trim().to_string();
	if display_name.is_empty() || display_name.len() > 100 {
		return bad_request::<AdminErrorResponse>(
			"invalid_display_name",
			"Display name must be 1-100 characters",
		)
		.into_response();
	}

	let system_role = match payload.system_role.as_deref() {
		Some(raw) => match raw.parse::<SystemRole>() {
			Ok(role) => role,
			Err(_) => {
				return bad_request::<AdminErrorResponse>(
					"invalid_system_role",
					format!("Unknown system role '{raw}'"),
				)
				.into_response();
			}
		},
		None => SystemRole::User,
	};

	let password_hash = match hash_password(&payload.password) {
		Ok(hash) => hash,
		Err(PasswordError::TooShort) => {
			return bad_request::<AdminErrorResponse>(
				"password_too_short",
				"Password does not meet the minimum length",
			)
			.into_response();
		}
		Err(e) => {
			tracing::error!(error = %e, "failed to hash password");
			return crate::api_response::internal_error::<AdminErrorResponse>(
				"internal server error",
			)
			.into_response();
		}
	};

	let now = Utc::now();
	let user = User {
		id: UserId::generate(),
		display_name,
		email,
		system_role,
		banned: false,
		ban_reason: None,
		ban_expires_at: None,
		created_at: now,
		updated_at: now,
		deleted_at: None,
	};

	if let Err(e) = state.user_repo.create_user(&user, Some(&password_hash)).await {
		return db_error::<AdminErrorResponse>(e).into_response();
	}

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::UserCreated)
			.actor(*current_user.actor_user_id())
			.resource("user", user.id.to_string())
			.action("create")
			.build(),
	);

	(StatusCode::CREATED, Json(user_response(&user))).into_response()
}

#[utoipa::path(
    get,
    path = "/api/admin/users/{user_id}",
    params(("user_id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = AdminUserResponse),
        (status = 403, description = "Admin role required", body = AdminErrorResponse),
        (status = 404, description = "User not found", body = AdminErrorResponse)
    ),
    tag = "admin"
)]
#[tracing::instrument(skip(state, ctx), fields(%user_id))]
pub async fn get_user(
	RequireAuth(_current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path(user_id): Path<String>,
) -> impl IntoResponse {
	guard!(AdminErrorResponse, require_system_admin(&ctx));
	let user_id = parse_id!(AdminErrorResponse, parse_user_id(&user_id));

	match load_user(&state, &user_id).await {
		Ok(user) => Json(user_response(&user)).into_response(),
		Err(response) => response.into_response(),
	}
}

#[utoipa::path(
    patch,
    path = "/api/admin/users/{user_id}/system-role",
    params(("user_id" = String, Path, description = "User ID")),
    request_body = SetSystemRoleRequest,
    responses(
        (status = 200, description = "System role changed", body = AdminSuccessResponse),
        (status = 400, description = "Unknown system role", body = AdminErrorResponse),
        (status = 403, description = "Admin role required", body = AdminErrorResponse)
    ),
    tag = "admin"
)]
/// Change a user's platform role.
#[tracing::instrument(skip(state, ctx, payload), fields(%user_id))]
pub async fn set_system_role(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path(user_id): Path<String>,
	Json(payload): Json<SetSystemRoleRequest>,
) -> impl IntoResponse {
	guard!(AdminErrorResponse, require_system_admin(&ctx));
	let user_id = parse_id!(AdminErrorResponse, parse_user_id(&user_id));

	let role = match payload.system_role.parse::<SystemRole>() {
		Ok(role) => role,
		Err(_) => {
			return bad_request::<AdminErrorResponse>(
				"invalid_system_role",
				format!("Unknown system role '{}'", payload.system_role),
			)
			.into_response();
		}
	};

	if let Err(response) = load_user(&state, &user_id).await {
		return response.into_response();
	}
	if let Err(e) = state.user_repo.set_system_role(&user_id, role).await {
		return db_error::<AdminErrorResponse>(e).into_response();
	}

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::SystemRoleChanged)
			.severity(AuditSeverity::Warning)
			.actor(*current_user.actor_user_id())
			.resource("user", user_id.to_string())
			.action("set_system_role")
			.details(serde_json::json!({ "system_role": role.to_string() }))
			.build(),
	);

	Json(AdminSuccessResponse {
		message: "System role updated".to_string(),
	})
	.into_response()
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{user_id}/ban",
    params(("user_id" = String, Path, description = "User ID")),
    request_body = BanUserRequest,
    responses(
        (status = 200, description = "User banned", body = AdminSuccessResponse),
        (status = 403, description = "Admin role required", body = AdminErrorResponse),
        (status = 404, description = "User not found", body = AdminErrorResponse)
    ),
    tag = "admin"
)]
/// Ban a user, optionally until a deadline. Their sessions are revoked.
#[tracing::instrument(skip(state, ctx, payload), fields(%user_id))]
pub async fn ban_user(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path(user_id): Path<String>,
	Json(payload): Json<BanUserRequest>,
) -> impl IntoResponse {
	guard!(AdminErrorResponse, require_system_admin(&ctx));
	let user_id = parse_id!(AdminErrorResponse, parse_user_id(&user_id));

	if user_id == current_user.user.id {
		return bad_request::<AdminErrorResponse>("invalid_ban", "Cannot ban yourself")
			.into_response();
	}

	if let Err(response) = load_user(&state, &user_id).await {
		return response.into_response();
	}
	if let Err(e) = state
		.user_repo
		.ban_user(&user_id, payload.reason.as_deref(), payload.expires_at)
		.await
	{
		return db_error::<AdminErrorResponse>(e).into_response();
	}
	if let Err(e) = state.session_repo.revoke_sessions_for_user(&user_id).await {
		return db_error::<AdminErrorResponse>(e).into_response();
	}

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::UserBanned)
			.severity(AuditSeverity::Warning)
			.actor(*current_user.actor_user_id())
			.resource("user", user_id.to_string())
			.action("ban")
			.details(serde_json::json!({
				"reason": payload.reason,
				"expires_at": payload.expires_at,
			}))
			.build(),
	);

	Json(AdminSuccessResponse {
		message: "User banned".to_string(),
	})
	.into_response()
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{user_id}/unban",
    params(("user_id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User unbanned", body = AdminSuccessResponse),
        (status = 403, description = "Admin role required", body = AdminErrorResponse),
        (status = 404, description = "User not found", body = AdminErrorResponse)
    ),
    tag = "admin"
)]
#[tracing::instrument(skip(state, ctx), fields(%user_id))]
pub async fn unban_user(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path(user_id): Path<String>,
) -> impl IntoResponse {
	guard!(AdminErrorResponse, require_system_admin(&ctx));
	let user_id = parse_id!(AdminErrorResponse, parse_user_id(&user_id));

	if let Err(response) = load_user(&state, &user_id).await {
		return response.into_response();
	}
	if let Err(e) = state.user_repo.unban_user(&user_id).await {
		return db_error::<AdminErrorResponse>(e).into_response();
	}

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::UserUnbanned)
			.actor(*current_user.actor_user_id())
			.resource("user", user_id.to_string())
			.action("unban")
			.build(),
	);

	Json(AdminSuccessResponse {
		message: "User unbanned".to_string(),
	})
	.into_response()
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{user_id}",
    params(("user_id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User removed", body = AdminSuccessResponse),
        (status = 400, description = "Cannot remove yourself", body = AdminErrorResponse),
        (status = 403, description = "Admin role required", body = AdminErrorResponse)
    ),
    tag = "admin"
)]
/// Soft-delete a user and revoke their sessions.
#[tracing::instrument(skip(state, ctx), fields(%user_id))]
pub async fn remove_user(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path(user_id): Path<String>,
) -> impl IntoResponse {
	guard!(AdminErrorResponse, require_system_admin(&ctx));
	let user_id = parse_id!(AdminErrorResponse, parse_user_id(&user_id));

	if user_id == current_user.user.id {
		return bad_request::<AdminErrorResponse>("invalid_removal", "Cannot remove yourself")
			.into_response();
	}

	if let Err(response) = load_user(&state, &user_id).await {
		return response.into_response();
	}
	if let Err(e) = state.user_repo.soft_delete_user(&user_id).await {
		return db_error::<AdminErrorResponse>(e).into_response();
	}
	if let Err(e) = state.session_repo.revoke_sessions_for_user(&user_id).await {
		return db_error::<AdminErrorResponse>(e).into_response();
	}

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::UserRemoved)
			.severity(AuditSeverity::Warning)
			.actor(*current_user.actor_user_id())
			.resource("user", user_id.to_string())
			.action("remove")
			.build(),
	);

	Json(AdminSuccessResponse {
		message: "User removed".to_string(),
	})
	.into_response()
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{user_id}/password",
    params(("user_id" = String, Path, description = "User ID")),
    request_body = SetPasswordRequest,
    responses(
        (status = 200, description = "Password set", body = AdminSuccessResponse),
        (status = 400, description = "Password too short", body = AdminErrorResponse),
        (status = 403, description = "Admin role required", body = AdminErrorResponse)
    ),
    tag = "admin"
)]
/// Set a user's password. The raw password is never logged.
#[tracing::instrument(skip(state, ctx, payload), fields(%user_id))]
pub async fn set_password(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path(user_id): Path<String>,
	Json(payload): Json<SetPasswordRequest>,
) -> impl IntoResponse {
	guard!(AdminErrorResponse, require_system_admin(&ctx));
	let user_id = parse_id!(AdminErrorResponse, parse_user_id(&user_id));

	let password_hash = match hash_password(&payload.password) {
		Ok(hash) => hash,
		Err(PasswordError::TooShort) => {
			return bad_request::<AdminErrorResponse>(
				"password_too_short",
				"Password does not meet the minimum length",
			)
			.into_response();
		}
		Err(e) => {
			tracing::error!(error = %e, "failed to hash password");
			return crate::api_response::internal_error::<AdminErrorResponse>(
				"internal server error",
			)
			.into_response();
		}
	};

	if let Err(response) = load_user(&state, &user_id).await {
		return response.into_response();
	}
	if let Err(e) = state.user_repo.set_password_hash(&user_id, &password_hash).await {
		return db_error::<AdminErrorResponse>(e).into_response();
	}

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::UserPasswordSet)
			.severity(AuditSeverity::Warning)
			.actor(*current_user.actor_user_id())
			.resource("user", user_id.to_string())
			.action("set_password")
			.build(),
	);

	Json(AdminSuccessResponse {
		message: "Password updated".to_string(),
	})
	.into_response()
}

#[utoipa::path(
    get,
    path = "/api/admin/users/{user_id}/sessions",
    params(("user_id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "The user's live sessions", body = ListSessionsResponse),
        (status = 403, description = "Admin role required", body = AdminErrorResponse)
    ),
    tag = "admin"
)]
#[tracing::instrument(skip(state, ctx), fields(%user_id))]
pub async fn list_user_sessions(
	RequireAuth(_current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path(user_id): Path<String>,
) -> impl IntoResponse {
	guard!(AdminErrorResponse, require_system_admin(&ctx));
	let user_id = parse_id!(AdminErrorResponse, parse_user_id(&user_id));

	match state.session_repo.list_sessions_for_user(&user_id).await {
		Ok(sessions) => Json(ListSessionsResponse {
			sessions: sessions
				.iter()
				.map(|s| SessionResponse {
					id: s.id.to_string(),
					user_id: s.user_id.to_string(),
					ip_address: s.ip_address.clone(),
					user_agent: s.user_agent.clone(),
					impersonated_by: s.impersonated_by.map(|id| id.to_string()),
					created_at: s.created_at,
					expires_at: s.expires_at,
				})
				.collect(),
		})
		.into_response(),
		Err(e) => db_error::<AdminErrorResponse>(e).into_response(),
	}
}

#[utoipa::path(
    delete,
    path = "/api/admin/sessions/{session_id}",
    params(("session_id" = String, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session revoked", body = AdminSuccessResponse),
        (status = 403, description = "Admin role required", body = AdminErrorResponse),
        (status = 404, description = "Session not found", body = AdminErrorResponse)
    ),
    tag = "admin"
)]
#[tracing::instrument(skip(state, ctx), fields(%session_id))]
pub async fn revoke_session(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path(session_id): Path<String>,
) -> impl IntoResponse {
	guard!(AdminErrorResponse, require_system_admin(&ctx));
	let session_id = parse_id!(AdminErrorResponse, parse_session_id(&session_id));

	match state.session_repo.revoke_session(&session_id).await {
		Ok(true) => {}
		Ok(false) => return not_found::<AdminErrorResponse>("Session not found").into_response(),
		Err(e) => return db_error::<AdminErrorResponse>(e).into_response(),
	}

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::SessionRevoked)
			.actor(*current_user.actor_user_id())
			.resource("session", session_id.to_string())
			.action("revoke")
			.build(),
	);

	Json(AdminSuccessResponse {
		message: "Session revoked".to_string(),
	})
	.into_response()
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{user_id}/sessions",
    params(("user_id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "All sessions revoked", body = RevokeSessionsResponse),
        (status = 403, description = "Admin role required", body = AdminErrorResponse)
    ),
    tag = "admin"
)]
#[tracing::instrument(skip(state, ctx), fields(%user_id))]
pub async fn revoke_user_sessions(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path(user_id): Path<String>,
) -> impl IntoResponse {
	guard!(AdminErrorResponse, require_system_admin(&ctx));
	let user_id = parse_id!(AdminErrorResponse, parse_user_id(&user_id));

	let revoked = match state.session_repo.revoke_sessions_for_user(&user_id).await {
		Ok(revoked) => revoked,
		Err(e) => return db_error::<AdminErrorResponse>(e).into_response(),
	};

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::SessionRevoked)
			.actor(*current_user.actor_user_id())
			.resource("user", user_id.to_string())
			.action("revoke_all_sessions")
			.details(serde_json::json!({ "revoked": revoked }))
			.build(),
	);

	Json(RevokeSessionsResponse { revoked }).into_response()
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{user_id}/impersonate",
    params(("user_id" = String, Path, description = "User ID to impersonate")),
    responses(
        (status = 200, description = "Impersonation started on the current session", body = ImpersonateResponse),
        (status = 400, description = "Cannot impersonate yourself or another admin", body = AdminErrorResponse),
        (status = 403, description = "Admin role required", body = AdminErrorResponse)
    ),
    tag = "admin"
)]
/// Start impersonating a user on the admin's current session. Subsequent
/// requests resolve permissions as the target while audit attributes to
/// the admin.
#[tracing::instrument(skip(state, ctx), fields(%user_id))]
pub async fn impersonate_user(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path(user_id): Path<String>,
) -> impl IntoResponse {
	guard!(AdminErrorResponse, require_system_admin(&ctx));
	let target_id = parse_id!(AdminErrorResponse, parse_user_id(&user_id));

	if target_id == current_user.user.id {
		return bad_request::<AdminErrorResponse>(
			"invalid_impersonation",
			"Cannot impersonate yourself",
		)
		.into_response();
	}
	let target = match load_user(&state, &target_id).await {
		Ok(user) => user,
		Err(response) => return response.into_response(),
	};
	if target.is_system_admin() {
		return bad_request::<AdminErrorResponse>(
			"invalid_impersonation",
			"Cannot impersonate another admin",
		)
		.into_response();
	}

	if let Err(e) = state
		.session_repo
		.set_impersonation(&current_user.session_id, &target_id, &current_user.user.id)
		.await
	{
		return db_error::<AdminErrorResponse>(e).into_response();
	}

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::ImpersonationStarted)
			.severity(AuditSeverity::Warning)
			.actor(current_user.user.id)
			.impersonating(target_id)
			.resource("user", target_id.to_string())
			.action("impersonate")
			.build(),
	);

	Json(ImpersonateResponse {
		session_id: current_user.session_id.to_string(),
		impersonating_user_id: target_id.to_string(),
	})
	.into_response()
}

#[utoipa::path(
    post,
    path = "/api/admin/impersonation/stop",
    responses(
        (status = 200, description = "Impersonation ended", body = AdminSuccessResponse),
        (status = 403, description = "Admin role required", body = AdminErrorResponse)
    ),
    tag = "admin"
)]
/// Stop impersonating and return the session to the admin's identity.
#[tracing::instrument(skip(state, ctx))]
pub async fn stop_impersonation(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
) -> impl IntoResponse {
	// The effective identity during impersonation is the target, so the
	// guard would reject; the real actor recorded on the session must be
	// an admin for the clear to succeed.
	let _ = &ctx;
	let admin_id = *current_user.actor_user_id();

	if let Err(e) = state
		.session_repo
		.clear_impersonation(&current_user.session_id, &admin_id)
		.await
	{
		return db_error::<AdminErrorResponse>(e).into_response();
	}

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::ImpersonationEnded)
			.actor(admin_id)
			.resource("session", current_user.session_id.to_string())
			.action("stop_impersonation")
			.build(),
	);

	Json(AdminSuccessResponse {
		message: "Impersonation ended".to_string(),
	})
	.into_response()
}

#[utoipa::path(
    get,
    path = "/api/admin/orgs",
    params(ListAllOrgsParams),
    responses(
        (status = 200, description = "All organizations, paginated", body = ListAllOrgsResponse),
        (status = 403, description = "Admin role required", body = AdminErrorResponse)
    ),
    tag = "admin"
)]
#[tracing::instrument(skip(state, ctx))]
pub async fn list_all_orgs(
	RequireAuth(_current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Query(params): Query<ListAllOrgsParams>,
) -> impl IntoResponse {
	guard!(AdminErrorResponse, require_system_admin(&ctx));

	let limit = params.limit.clamp(1, 200);
	let offset = params.offset.max(0);

	let orgs = match state.org_repo.list_all_orgs(limit, offset).await {
		Ok(orgs) => orgs,
		Err(e) => return db_error::<AdminErrorResponse>(e).into_response(),
	};
	let total = match state.org_repo.count_orgs().await {
		Ok(total) => total,
		Err(e) => return db_error::<AdminErrorResponse>(e).into_response(),
	};

	Json(ListAllOrgsResponse {
		orgs: orgs
			.iter()
			.map(|org| OrgResponse {
				id: org.id.to_string(),
				name: org.name.clone(),
				slug: org.slug.clone(),
				created_at: org.created_at,
				updated_at: org.updated_at,
			})
			.collect(),
		total,
		limit,
		offset,
	})
	.into_response()
}

#[utoipa::path(
    get,
    path = "/api/admin/users/{user_id}/orgs",
    params(("user_id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Organizations the user belongs to", body = ListOrgsResponse),
        (status = 403, description = "Admin role required", body = AdminErrorResponse)
    ),
    tag = "admin"
)]
#[tracing::instrument(skip(state, ctx), fields(%user_id))]
pub async fn list_user_orgs(
	RequireAuth(_current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path(user_id): Path<String>,
) -> impl IntoResponse {
	guard!(AdminErrorResponse, require_system_admin(&ctx));
	let user_id = parse_id!(AdminErrorResponse, parse_user_id(&user_id));

	match state.org_repo.list_orgs_for_user(&user_id).await {
		Ok(orgs) => Json(ListOrgsResponse {
			orgs: orgs
				.iter()
				.map(|org| OrgResponse {
					id: org.id.to_string(),
					name: org.name.clone(),
					slug: org.slug.clone(),
					created_at: org.created_at,
					updated_at: org.updated_at,
				})
				.collect(),
		})
		.into_response(),
		Err(e) => db_error::<AdminErrorResponse>(e).into_response(),
	}
}

#[utoipa::path(
    post,
    path = "/api/admin/orgs/{org_id}/owner",
    params(("org_id" = String, Path, description = "Organization ID")),
    request_body = SetOrgOwnerRequest,
    responses(
        (status = 200, description = "Owner set; all other owners demoted", body = AdminSuccessResponse),
        (status = 403, description = "Admin role required", body = AdminErrorResponse),
        (status = 404, description = "Organization or user not found", body = AdminErrorResponse)
    ),
    tag = "admin"
)]
/// Force an organization's owner. After the transaction commits the
/// organization has exactly one owner; any previous owners become
/// moderators.
#[tracing::instrument(skip(state, ctx, payload), fields(%org_id))]
pub async fn set_org_owner(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path(org_id): Path<String>,
	Json(payload): Json<SetOrgOwnerRequest>,
) -> impl IntoResponse {
	guard!(AdminErrorResponse, require_system_admin(&ctx));
	let org_id = parse_id!(AdminErrorResponse, parse_org_id(&org_id));
	let user_id = parse_id!(AdminErrorResponse, parse_user_id(&payload.user_id));

	match state.org_repo.get_org_by_id(&org_id).await {
		Ok(Some(_)) => {}
		Ok(None) => {
			return not_found::<AdminErrorResponse>("Organization not found").into_response();
		}
		Err(e) => return db_error::<AdminErrorResponse>(e).into_response(),
	}
	if let Err(response) = load_user(&state, &user_id).await {
		return response.into_response();
	}

	if let Err(e) = state.org_repo.set_owner(&org_id, &user_id).await {
		return db_error::<AdminErrorResponse>(e).into_response();
	}

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::OwnershipTransferred)
			.severity(AuditSeverity::Warning)
			.actor(*current_user.actor_user_id())
			.resource("organization", org_id.to_string())
			.action("set_owner")
			.details(serde_json::json!({ "user_id": user_id.to_string() }))
			.build(),
	);

	Json(AdminSuccessResponse {
		message: "Organization owner set".to_string(),
	})
	.into_response()
}

#[utoipa::path(
    get,
    path = "/api/admin/orgs/{org_id}",
    params(("org_id" = String, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Organization with its member list", body = OrgDetailResponse),
        (status = 403, description = "Admin role required", body = AdminErrorResponse),
        (status = 404, description = "Organization not found", body = AdminErrorResponse)
    ),
    tag = "admin"
)]
/// Get an organization together with its full member list.
#[tracing::instrument(skip(state, ctx), fields(%org_id))]
pub async fn get_org_detail(
	RequireAuth(_current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path(org_id): Path<String>,
) -> impl IntoResponse {
	guard!(AdminErrorResponse, require_system_admin(&ctx));
	let org_id = parse_id!(AdminErrorResponse, parse_org_id(&org_id));

	let org = match state.org_repo.get_org_by_id(&org_id).await {
		Ok(Some(org)) => org,
		Ok(None) => {
			return not_found::<AdminErrorResponse>("Organization not found").into_response();
		}
		Err(e) => return db_error::<AdminErrorResponse>(e).into_response(),
	};

	match state.org_repo.list_members(&org_id).await {
		Ok(members) => Json(OrgDetailResponse {
			org: OrgResponse {
				id: org.id.to_string(),
				name: org.name.clone(),
				slug: org.slug.clone(),
				created_at: org.created_at,
				updated_at: org.updated_at,
			},
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
		Err(e) => db_error::<AdminErrorResponse>(e).into_response(),
	}
}

#[utoipa::path(
    get,
    path = "/api/admin/orgs/{org_id}/invitations",
    params(("org_id" = String, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Pending invitations", body = ListInvitationsResponse),
        (status = 403, description = "Admin role required", body = AdminErrorResponse),
        (status = 404, description = "Organization not found", body = AdminErrorResponse)
    ),
    tag = "admin"
)]
/// List an organization's pending invitations.
#[tracing::instrument(skip(state, ctx), fields(%org_id))]
pub async fn list_org_invitations(
	RequireAuth(_current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path(org_id): Path<String>,
) -> impl IntoResponse {
	guard!(AdminErrorResponse, require_system_admin(&ctx));
	let org_id = parse_id!(AdminErrorResponse, parse_org_id(&org_id));

	match state.org_repo.get_org_by_id(&org_id).await {
		Ok(Some(_)) => {}
		Ok(None) => {
			return not_found::<AdminErrorResponse>("Organization not found").into_response();
		}
		Err(e) => return db_error::<AdminErrorResponse>(e).into_response(),
	}

	match state.invitation_repo.list_pending_invitations(&org_id).await {
		Ok(invitations) => Json(ListInvitationsResponse {
			invitations: invitations.iter().map(invitation_response).collect(),
		})
		.into_response(),
		Err(e) => db_error::<AdminErrorResponse>(e).into_response(),
	}
}

#[utoipa::path(
    post,
    path = "/api/admin/permissions/check",
    request_body = AdminCheckPermissionRequest,
    responses(
        (status = 200, description = "Evaluation result", body = CheckPermissionResponse),
        (status = 400, description = "Unknown role or malformed permission map", body = AdminErrorResponse),
        (status = 403, description = "Admin role required", body = AdminErrorResponse)
    ),
    tag = "admin"
)]
/// Evaluate a role's grants against a permission map. Built-in roles
/// resolve directly; custom roles resolve within the given organization.
#[tracing::instrument(skip(state, ctx, payload))]
pub async fn check_permission(
	RequireAuth(_current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Json(payload): Json<AdminCheckPermissionRequest>,
) -> impl IntoResponse {
	guard!(AdminErrorResponse, require_system_admin(&ctx));

	let request = match parse_permission_request(&payload.permissions) {
		Ok(request) => request,
		Err(e) => return bad_request::<AdminErrorResponse>(e.error, e.message).into_response(),
	};

	if let Ok(builtin) = payload.role.parse::<OrgRole>() {
		return Json(CheckPermissionResponse {
			allowed: is_allowed(builtin.grants(), &request),
		})
		.into_response();
	}

	let org_id = match &payload.org_id {
		Some(raw) => parse_id!(AdminErrorResponse, parse_org_id(raw)),
		None => {
			return bad_request::<AdminErrorResponse>(
				"org_required",
				"Custom role lookup requires an org_id",
			)
			.into_response();
		}
	};

	match state.role_repo.get_role_by_name(&org_id, &payload.role).await {
		Ok(Some(role)) => Json(CheckPermissionResponse {
			allowed: is_allowed(&role.grants, &request),
		})
		.into_response(),
		Ok(None) => bad_request::<AdminErrorResponse>(
			"unknown_role",
			"No such role in this organization",
		)
		.into_response(),
		Err(e) => db_error::<AdminErrorResponse>(e).into_response(),
	}
}
