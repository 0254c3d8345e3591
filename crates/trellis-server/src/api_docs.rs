// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! OpenAPI document assembly, served at `/openapi.json`.

use axum::{response::IntoResponse, Json};
use utoipa::OpenApi;

use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health_check,
        routes::orgs::list_orgs,
        routes::orgs::create_org,
        routes::orgs::get_org,
        routes::orgs::update_org,
        routes::orgs::delete_org,
        routes::orgs::set_active_org,
        routes::orgs::get_active_member,
        routes::orgs::check_permission,
        routes::orgs::list_members,
        routes::orgs::add_member,
        routes::orgs::update_member_role,
        routes::orgs::remove_member,
        routes::orgs::transfer_ownership,
        routes::invitations::create_invitation,
        routes::invitations::list_invitations,
        routes::invitations::cancel_invitation,
        routes::invitations::resend_invitation,
        routes::invitations::accept_invitation,
        routes::teams::list_teams,
        routes::teams::create_team,
        routes::teams::get_team,
        routes::teams::update_team,
        routes::teams::delete_team,
        routes::teams::list_team_members,
        routes::teams::add_team_member,
        routes::teams::remove_team_member,
        routes::roles::list_roles,
        routes::roles::create_role,
        routes::roles::update_role,
        routes::roles::delete_role,
        routes::admin::list_users,
        routes::admin::create_user,
        routes::admin::get_user,
        routes::admin::set_system_role,
        routes::admin::ban_user,
        routes::admin::unban_user,
        routes::admin::remove_user,
        routes::admin::set_password,
        routes::admin::list_user_sessions,
        routes::admin::revoke_session,
        routes::admin::revoke_user_sessions,
        routes::admin::impersonate_user,
        routes::admin::stop_impersonation,
        routes::admin::list_all_orgs,
        routes::admin::get_org_detail,
        routes::admin::list_org_invitations,
        routes::admin::list_user_orgs,
        routes::admin::set_org_owner,
        routes::admin::check_permission,
    ),
    components(schemas(
        routes::health::HealthResponse,
        trellis_server_api::orgs::OrgResponse,
        trellis_server_api::orgs::ListOrgsResponse,
        trellis_server_api::orgs::ListAllOrgsResponse,
        trellis_server_api::orgs::CreateOrgRequest,
        trellis_server_api::orgs::UpdateOrgRequest,
        trellis_server_api::orgs::OrgMemberResponse,
        trellis_server_api::orgs::ListOrgMembersResponse,
        trellis_server_api::orgs::AddMemberRequest,
        trellis_server_api::orgs::UpdateMemberRoleRequest,
        trellis_server_api::orgs::TransferOwnershipRequest,
        trellis_server_api::orgs::ActiveMemberResponse,
        trellis_server_api::orgs::SetActiveOrgRequest,
        trellis_server_api::orgs::OrgDetailResponse,
        trellis_server_api::orgs::OrgSuccessResponse,
        trellis_server_api::orgs::OrgErrorResponse,
        trellis_server_api::invitations::InvitationResponse,
        trellis_server_api::invitations::ListInvitationsResponse,
        trellis_server_api::invitations::CreateInvitationRequest,
        trellis_server_api::invitations::AcceptInvitationResponse,
        trellis_server_api::invitations::InvitationSuccessResponse,
        trellis_server_api::invitations::InvitationErrorResponse,
        trellis_server_api::teams::TeamResponse,
        trellis_server_api::teams::ListTeamsResponse,
        trellis_server_api::teams::CreateTeamRequest,
        trellis_server_api::teams::UpdateTeamRequest,
        trellis_server_api::teams::AddTeamMemberRequest,
        trellis_server_api::teams::TeamMemberResponse,
        trellis_server_api::teams::ListTeamMembersResponse,
        trellis_server_api::teams::TeamSuccessResponse,
        trellis_server_api::teams::TeamErrorResponse,
        trellis_server_api::roles::RoleResponse,
        trellis_server_api::roles::ListRolesResponse,
        trellis_server_api::roles::CreateRoleRequest,
        trellis_server_api::roles::UpdateRoleRequest,
        trellis_server_api::roles::CheckPermissionRequest,
        trellis_server_api::roles::CheckPermissionResponse,
        trellis_server_api::roles::RoleSuccessResponse,
        trellis_server_api::roles::RoleErrorResponse,
        trellis_server_api::admin::AdminUserResponse,
        trellis_server_api::admin::ListUsersResponse,
        trellis_server_api::admin::CreateUserRequest,
        trellis_server_api::admin::SetSystemRoleRequest,
        trellis_server_api::admin::BanUserRequest,
        trellis_server_api::admin::SetPasswordRequest,
        trellis_server_api::admin::SetOrgOwnerRequest,
        trellis_server_api::admin::AdminCheckPermissionRequest,
        trellis_server_api::admin::ImpersonateResponse,
        trellis_server_api::admin::SessionResponse,
        trellis_server_api::admin::ListSessionsResponse,
        trellis_server_api::admin::RevokeSessionsResponse,
        trellis_server_api::admin::AdminSuccessResponse,
        trellis_server_api::admin::AdminErrorResponse,
    )),
    tags(
        (name = "health", description = "Liveness and readiness"),
        (name = "orgs", description = "Organizations and the caller's active membership"),
        (name = "members", description = "Organization membership management"),
        (name = "invitations", description = "Email invitations into organizations"),
        (name = "teams", description = "Teams within an organization"),
        (name = "roles", description = "Built-in and custom roles"),
        (name = "admin", description = "Platform administration"),
    ),
    info(
        title = "trellis-server",
        description = "Multi-tenant authorization and organization management API"
    )
)]
pub struct ApiDoc;

/// GET /openapi.json - the generated OpenAPI document.
pub async fn openapi_json() -> impl IntoResponse {
	Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn document_builds_and_covers_the_surface() {
		let doc = ApiDoc::openapi();
		assert!(doc.paths.paths.contains_key("/health"));
		assert!(doc.paths.paths.contains_key("/api/orgs"));
		assert!(doc.paths.paths.contains_key("/api/admin/users"));
		assert!(doc.paths.paths.contains_key("/api/orgs/{org_id}/roles/{role_id}"));
	}
}
