// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Invitation HTTP handlers.
//!
//! Invitations are org-scoped except acceptance, which any authenticated
//! user can perform against an invitation addressed to their email.

use axum::{
	extract::{Path, State},
	http::StatusCode,
	response::IntoResponse,
	Json,
};
use chrono::Utc;
use trellis_server_audit::{AuditEventType, AuditLogEntry};
use trellis_server_auth::{
	require_auth, require_permission, Action, Invitation, PermissionRequest, Resource,
};
use trellis_server_db::{DbError, InvitationStore};

pub use trellis_server_api::invitations::*;

use crate::{
	api::AppState,
	api_response::{bad_request, conflict, db_error, forbidden, not_found},
	auth_middleware::RequireAuth,
	guard, impl_api_error_response, parse_id,
	routes::{ensure_org_scope, orgs::role_exists},
	validation::{looks_like_email, parse_invitation_id, parse_org_id, sanitize_email},
};

impl_api_error_response!(InvitationErrorResponse);

pub(crate) fn invitation_response(invitation: &Invitation) -> InvitationResponse {
	InvitationResponse {
		id: invitation.id.to_string(),
		org_id: invitation.org_id.to_string(),
		email: invitation.email.clone(),
		role: invitation.role.clone(),
		inviter_id: invitation.inviter_id.to_string(),
		status: invitation.status.to_string(),
		created_at: invitation.created_at,
		expires_at: invitation.expires_at,
		is_expired: invitation.is_expired(Utc::now()),
	}
}

/// Load an invitation and check it belongs to the given organization.
async fn load_scoped_invitation(
	state: &AppState,
	org_id: &trellis_server_auth::OrgId,
	invitation_id: &trellis_server_auth::InvitationId,
) -> Result<Invitation, (StatusCode, Json<InvitationErrorResponse>)> {
	match state.invitation_repo.get_invitation(invitation_id).await {
		Ok(Some(invitation)) if invitation.org_id == *org_id => Ok(invitation),
		Ok(_) => Err(not_found::<InvitationErrorResponse>("Invitation not found")),
		Err(e) => Err(db_error::<InvitationErrorResponse>(e)),
	}
}

#[utoipa::path(
    post,
    path = "/api/orgs/{org_id}/invitations",
    params(("org_id" = String, Path, description = "Organization ID")),
    request_body = CreateInvitationRequest,
    responses(
        (status = 201, description = "Invitation created", body = InvitationResponse),
        (status = 400, description = "Invalid email or role", body = InvitationErrorResponse),
        (status = 403, description = "Missing invitation:create", body = InvitationErrorResponse),
        (status = 409, description = "A pending invitation already exists for this email", body = InvitationErrorResponse)
    ),
    tag = "invitations"
)]
/// Invite an email address to the organization. Requires
/// `invitation:create`.
#[tracing::instrument(skip(state, ctx, payload), fields(%org_id))]
pub async fn create_invitation(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path(org_id): Path<String>,
	Json(payload): Json<CreateInvitationRequest>,
) -> impl IntoResponse {
	let org_id = parse_id!(InvitationErrorResponse, parse_org_id(&org_id));
	let member = guard!(
		InvitationErrorResponse,
		require_permission(
			&ctx,
			&PermissionRequest::single(Resource::Invitation, Action::Create)
		)
	);
	guard!(InvitationErrorResponse, ensure_org_scope(member, &org_id));

	let email = sanitize_email(&payload.email);
	if !looks_like_email(&email) {
		return bad_request::<InvitationErrorResponse>(
			"invalid_email",
			"A valid email address is required",
		)
		.into_response();
	}

	let role = payload.role.unwrap_or_else(|| "member".to_string());
	match role_exists(&state, &org_id, &role).await {
		Ok(true) => {}
		Ok(false) => {
			return bad_request::<InvitationErrorResponse>(
				"invalid_role",
				format!("Role '{role}' does not exist in this organization"),
			)
			.into_response();
		}
		Err(e) => return db_error::<InvitationErrorResponse>(e).into_response(),
	}

	match state.invitation_repo.find_pending_by_email(&org_id, &email).await {
		Ok(Some(_)) => {
			return conflict::<InvitationErrorResponse>(
				"invitation_exists",
				"A pending invitation already exists for this email",
			)
			.into_response();
		}
		Ok(None) => {}
		Err(e) => return db_error::<InvitationErrorResponse>(e).into_response(),
	}

	let invitation = Invitation::new(org_id, &email, &role, member.user_id);
	if let Err(e) = state.invitation_repo.create_invitation(&invitation).await {
		return db_error::<InvitationErrorResponse>(e).into_response();
	}

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::InvitationCreated)
			.actor(*current_user.actor_user_id())
			.resource("invitation", invitation.id.to_string())
			.action("create")
			.details(serde_json::json!({ "org_id": org_id.to_string(), "role": role }))
			.build(),
	);

	(StatusCode::CREATED, Json(invitation_response(&invitation))).into_response()
}

#[utoipa::path(
    get,
    path = "/api/orgs/{org_id}/invitations",
    params(("org_id" = String, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Pending invitations", body = ListInvitationsResponse),
        (status = 403, description = "Missing invitation:view", body = InvitationErrorResponse)
    ),
    tag = "invitations"
)]
/// List pending invitations. Requires `invitation:view`.
#[tracing::instrument(skip(state, ctx), fields(%org_id))]
pub async fn list_invitations(
	RequireAuth(_current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path(org_id): Path<String>,
) -> impl IntoResponse {
	let org_id = parse_id!(InvitationErrorResponse, parse_org_id(&org_id));
	let member = guard!(
		InvitationErrorResponse,
		require_permission(
			&ctx,
			&PermissionRequest::single(Resource::Invitation, Action::View)
		)
	);
	guard!(InvitationErrorResponse, ensure_org_scope(member, &org_id));

	match state.invitation_repo.list_pending_invitations(&org_id).await {
		Ok(invitations) => Json(ListInvitationsResponse {
			invitations: invitations.iter().map(invitation_response).collect(),
		})
		.into_response(),
		Err(e) => db_error::<InvitationErrorResponse>(e).into_response(),
	}
}

#[utoipa::path(
    delete,
    path = "/api/orgs/{org_id}/invitations/{invitation_id}",
    params(
        ("org_id" = String, Path, description = "Organization ID"),
        ("invitation_id" = String, Path, description = "Invitation ID")
    ),
    responses(
        (status = 200, description = "Invitation cancelled", body = InvitationSuccessResponse),
        (status = 403, description = "Missing invitation:cancel", body = InvitationErrorResponse),
        (status = 404, description = "Invitation not found or not pending", body = InvitationErrorResponse)
    ),
    tag = "invitations"
)]
/// Cancel a pending invitation. Requires `invitation:cancel`.
#[tracing::instrument(skip(state, ctx), fields(%org_id, %invitation_id))]
pub async fn cancel_invitation(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path((org_id, invitation_id)): Path<(String, String)>,
) -> impl IntoResponse {
	let org_id = parse_id!(InvitationErrorResponse, parse_org_id(&org_id));
	let member = guard!(
		InvitationErrorResponse,
		require_permission(
			&ctx,
			&PermissionRequest::single(Resource::Invitation, Action::Cancel)
		)
	);
	guard!(InvitationErrorResponse, ensure_org_scope(member, &org_id));

	let invitation_id = parse_id!(InvitationErrorResponse, parse_invitation_id(&invitation_id));
	if let Err(response) = load_scoped_invitation(&state, &org_id, &invitation_id).await {
		return response.into_response();
	}

	if let Err(e) = state.invitation_repo.cancel_invitation(&invitation_id).await {
		return db_error::<InvitationErrorResponse>(e).into_response();
	}

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::InvitationCancelled)
			.actor(*current_user.actor_user_id())
			.resource("invitation", invitation_id.to_string())
			.action("cancel")
			.build(),
	);

	Json(InvitationSuccessResponse {
		message: "Invitation cancelled".to_string(),
	})
	.into_response()
}

#[utoipa::path(
    post,
    path = "/api/orgs/{org_id}/invitations/{invitation_id}/resend",
    params(
        ("org_id" = String, Path, description = "Organization ID"),
        ("invitation_id" = String, Path, description = "Invitation ID")
    ),
    responses(
        (status = 200, description = "Invitation resent with a fresh expiry", body = InvitationResponse),
        (status = 403, description = "Missing invitation:resend", body = InvitationErrorResponse),
        (status = 404, description = "Invitation not found or not pending", body = InvitationErrorResponse)
    ),
    tag = "invitations"
)]
/// Refresh a pending invitation's expiry window. Requires
/// `invitation:resend`.
#[tracing::instrument(skip(state, ctx), fields(%org_id, %invitation_id))]
pub async fn resend_invitation(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path((org_id, invitation_id)): Path<(String, String)>,
) -> impl IntoResponse {
	let org_id = parse_id!(InvitationErrorResponse, parse_org_id(&org_id));
	let member = guard!(
		InvitationErrorResponse,
		require_permission(
			&ctx,
			&PermissionRequest::single(Resource::Invitation, Action::Resend)
		)
	);
	guard!(InvitationErrorResponse, ensure_org_scope(member, &org_id));

	let invitation_id = parse_id!(InvitationErrorResponse, parse_invitation_id(&invitation_id));
	if let Err(response) = load_scoped_invitation(&state, &org_id, &invitation_id).await {
		return response.into_response();
	}

	let invitation = match state.invitation_repo.resend_invitation(&invitation_id).await {
		Ok(invitation) => invitation,
		Err(e) => return db_error::<InvitationErrorResponse>(e).into_response(),
	};

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::InvitationResent)
			.actor(*current_user.actor_user_id())
			.resource("invitation", invitation_id.to_string())
			.action("resend")
			.build(),
	);

	Json(invitation_response(&invitation)).into_response()
}

#[utoipa::path(
    post,
    path = "/api/invitations/{invitation_id}/accept",
    params(("invitation_id" = String, Path, description = "Invitation ID")),
    responses(
        (status = 200, description = "Invitation accepted, membership created", body = AcceptInvitationResponse),
        (status = 403, description = "Invitation addressed to a different email", body = InvitationErrorResponse),
        (status = 404, description = "Invitation not found or not pending", body = InvitationErrorResponse),
        (status = 409, description = "Already a member", body = InvitationErrorResponse),
        (status = 410, description = "Invitation expired", body = InvitationErrorResponse)
    ),
    tag = "invitations"
)]
/// Accept an invitation addressed to the caller's email. The acceptance
/// and membership insert are one transaction.
#[tracing::instrument(skip(state, ctx), fields(%invitation_id))]
pub async fn accept_invitation(
	RequireAuth(current_user, ctx): RequireAuth,
	State(state): State<AppState>,
	Path(invitation_id): Path<String>,
) -> impl IntoResponse {
	let session = guard!(InvitationErrorResponse, require_auth(&ctx));
	let invitation_id = parse_id!(InvitationErrorResponse, parse_invitation_id(&invitation_id));

	let invitation = match state.invitation_repo.get_invitation(&invitation_id).await {
		Ok(Some(invitation)) => invitation,
		Ok(None) => {
			return not_found::<InvitationErrorResponse>("Invitation not found").into_response();
		}
		Err(e) => return db_error::<InvitationErrorResponse>(e).into_response(),
	};

	if !invitation.email.eq_ignore_ascii_case(&session.user.email) {
		return forbidden::<InvitationErrorResponse>(
			"email_mismatch",
			"This invitation is addressed to a different email",
		)
		.into_response();
	}

	let membership = match state
		.invitation_repo
		.accept_invitation(&invitation_id, &session.user.id, Utc::now())
		.await
	{
		Ok(membership) => membership,
		Err(DbError::Conflict(_)) => {
			return conflict::<InvitationErrorResponse>(
				"already_a_member",
				"Already a member of this organization",
			)
			.into_response();
		}
		Err(e) => return db_error::<InvitationErrorResponse>(e).into_response(),
	};

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::InvitationAccepted)
			.actor(*current_user.actor_user_id())
			.resource("invitation", invitation_id.to_string())
			.action("accept")
			.details(serde_json::json!({
				"org_id": membership.org_id.to_string(),
				"role": membership.role,
			}))
			.build(),
	);

	Json(AcceptInvitationResponse {
		org_id: membership.org_id.to_string(),
		role: membership.role,
	})
	.into_response()
}
