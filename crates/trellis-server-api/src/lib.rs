// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request and response types for the Trellis HTTP API.
//!
//! Pure data shapes: serde for the wire, utoipa schemas behind the
//! `openapi` feature. Conversion from domain types lives with the route
//! handlers, not here.

pub mod admin;
pub mod invitations;
pub mod orgs;
pub mod roles;
pub mod teams;

pub use admin::{
	AdminCheckPermissionRequest, AdminErrorResponse, AdminSuccessResponse, AdminUserResponse,
	BanUserRequest, CreateUserRequest, ImpersonateResponse, ListSessionsResponse, ListUsersParams,
	ListUsersResponse, RevokeSessionsResponse, SessionResponse, SetOrgOwnerRequest,
	SetPasswordRequest, SetSystemRoleRequest,
};
pub use invitations::{
	AcceptInvitationResponse, CreateInvitationRequest, InvitationErrorResponse, InvitationResponse,
	InvitationSuccessResponse, ListInvitationsResponse,
};
pub use orgs::{
	ActiveMemberResponse, AddMemberRequest, CreateOrgRequest, ListAllOrgsParams, ListAllOrgsResponse,
	ListOrgMembersResponse, ListOrgsResponse, OrgDetailResponse, OrgErrorResponse,
	OrgMemberResponse, OrgResponse, OrgSuccessResponse, SetActiveOrgRequest,
	TransferOwnershipRequest, UpdateMemberRoleRequest, UpdateOrgRequest,
};
pub use roles::{
	CheckPermissionRequest, CheckPermissionResponse, CreateRoleRequest, ListRolesResponse,
	RoleErrorResponse, RoleResponse, RoleSuccessResponse, UpdateRoleRequest,
};
pub use teams::{
	AddTeamMemberRequest, CreateTeamRequest, ListTeamMembersResponse, ListTeamsResponse,
	TeamErrorResponse, TeamMemberResponse, TeamResponse, TeamSuccessResponse, UpdateTeamRequest,
};
