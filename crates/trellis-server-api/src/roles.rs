// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// A role in API responses: built-in or custom.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct RoleResponse {
	/// Absent for built-in roles, which have no database row.
	pub id: Option<String>,
	pub name: String,
	/// Grants as a `{resource: [actions]}` map.
	pub permissions: serde_json::Value,
	pub description: Option<String>,
	pub color: String,
	pub level: i64,
	pub is_builtin: bool,
	pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ListRolesResponse {
	pub roles: Vec<RoleResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CreateRoleRequest {
	pub name: String,
	/// Grants as a `{resource: [actions]}` map, validated against the
	/// permission statement.
	pub permissions: BTreeMap<String, Vec<String>>,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub color: Option<String>,
	#[serde(default)]
	pub level: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct UpdateRoleRequest {
	pub name: Option<String>,
	pub permissions: Option<BTreeMap<String, Vec<String>>>,
	pub description: Option<String>,
	pub color: Option<String>,
	pub level: Option<i64>,
}

/// Request to evaluate permissions against the caller's active membership.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CheckPermissionRequest {
	/// Required actions as a `{resource: [actions]}` map; all must hold.
	pub permissions: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CheckPermissionResponse {
	pub allowed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct RoleSuccessResponse {
	pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct RoleErrorResponse {
	pub error: String,
	pub message: String,
}
