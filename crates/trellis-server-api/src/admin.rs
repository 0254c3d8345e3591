// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::{IntoParams, ToSchema};

/// A user in admin API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct AdminUserResponse {
	pub id: String,
	pub display_name: String,
	pub email: String,
	pub system_role: String,
	pub banned: bool,
	pub ban_reason: Option<String>,
	pub ban_expires_at: Option<DateTime<Utc>>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// Paginated list of users.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ListUsersResponse {
	pub users: Vec<AdminUserResponse>,
	pub total: i64,
	pub limit: i64,
	pub offset: i64,
}

/// Query parameters for listing users.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(IntoParams))]
pub struct ListUsersParams {
	#[serde(default = "default_limit")]
	pub limit: i64,
	#[serde(default)]
	pub offset: i64,
	pub search: Option<String>,
}

fn default_limit() -> i64 {
	50
}

/// Request to create a user from the admin surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CreateUserRequest {
	pub display_name: String,
	pub email: String,
	pub password: String,
	#[serde(default)]
	pub system_role: Option<String>,
}

/// Request to change a user's platform role.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct SetSystemRoleRequest {
	pub system_role: String,
}

/// Request to ban a user, optionally until a deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct BanUserRequest {
	pub reason: Option<String>,
	pub expires_at: Option<DateTime<Utc>>,
}

/// Request to set a user's password.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct SetPasswordRequest {
	pub password: String,
}

/// Request to evaluate a role against a permission map, without a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct AdminCheckPermissionRequest {
	/// Built-in role name, or a custom role name within `org_id`.
	pub role: String,
	/// Required when `role` names a custom role.
	#[serde(default)]
	pub org_id: Option<String>,
	/// Required actions as a `{resource: [actions]}` map; all must hold.
	pub permissions: std::collections::BTreeMap<String, Vec<String>>,
}

/// Request to force an organization's owner from the admin surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct SetOrgOwnerRequest {
	pub user_id: String,
}

/// Response for impersonation start.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ImpersonateResponse {
	pub session_id: String,
	pub impersonating_user_id: String,
}

/// An active session in admin responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct SessionResponse {
	pub id: String,
	pub user_id: String,
	pub ip_address: Option<String>,
	pub user_agent: Option<String>,
	pub impersonated_by: Option<String>,
	pub created_at: DateTime<Utc>,
	pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ListSessionsResponse {
	pub sessions: Vec<SessionResponse>,
}

/// Count of sessions revoked by a bulk revocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct RevokeSessionsResponse {
	pub revoked: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct AdminSuccessResponse {
	pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct AdminErrorResponse {
	pub error: String,
	pub message: String,
}
