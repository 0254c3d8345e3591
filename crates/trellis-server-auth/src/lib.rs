// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authentication and authorization for the Trellis server.
//!
//! This crate owns the permission model and everything needed to enforce it:
//!
//! - [`statement`] - the closed vocabulary of resources and actions
//! - [`roles`] - built-in role grant sets and custom role definitions
//! - [`engine`] - pure permission evaluation over a role's grants
//! - [`context`] - the per-request [`GuardContext`] guards operate on
//! - [`guards`] - composable authorization predicates for route handlers
//! - [`middleware`] - token extraction and auth configuration
//! - [`session_token`] / [`password`] - credential hashing primitives
//!
//! Evaluation is deliberately pure: the server resolves the session and
//! membership into a [`GuardContext`] once per request, and every guard
//! decision after that is a lookup with no I/O.

pub mod context;
pub mod engine;
pub mod guards;
pub mod middleware;
pub mod org;
pub mod password;
pub mod roles;
pub mod session_token;
pub mod statement;
pub mod types;

pub use context::{ActiveMember, GuardContext, Session, SessionUser};
pub use engine::{any_allowed, is_allowed, PermissionRequest};
pub use guards::{
	require_active_organization, require_all_permissions, require_any_permission,
	require_any_role, require_auth, require_permission, require_role, require_system_admin,
	require_system_role, GuardError,
};
pub use middleware::{
	extract_bearer_token, extract_session_cookie, extract_session_cookie_with_name, AuthConfig,
	CurrentUser, SESSION_COOKIE_NAME,
};
pub use org::{
	Invitation, Organization, OrgMembership, Team, TeamMembership, INVITATION_EXPIRY_HOURS,
};
pub use password::{hash_password, verify_password, PasswordError, MIN_PASSWORD_LENGTH};
pub use roles::{
	is_builtin_role_name, GrantParseError, OrgRole, RoleDefinition, RoleGrants,
	DEFAULT_ROLE_COLOR, MAX_CUSTOM_ROLES_PER_ORG,
};
pub use session_token::{
	generate_session_token, hash_session_token, is_session_token, SESSION_TOKEN_PREFIX,
};
pub use statement::{Action, Resource, UnknownAction, UnknownResource};
pub use types::{
	InvitationId, InvitationStatus, MemberId, OrgId, RoleId, SessionId, SystemRole, TeamId,
	UnknownRole, User, UserId,
};
