// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Custom role repository.
//!
//! Grants are persisted as a JSON document in the `permissions` column and
//! parsed fail-closed on load: a row whose grants no longer parse against
//! the statement vocabulary surfaces as an error rather than an empty
//! grant set silently allowing nothing (or a stale one allowing too much).
//!
//! The per-organization cap is enforced inside the creation transaction so
//! two concurrent creates cannot both slip under the limit.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use trellis_server_auth::{
	OrgId, RoleDefinition, RoleGrants, RoleId, MAX_CUSTOM_ROLES_PER_ORG,
};
use uuid::Uuid;

use crate::error::DbError;

#[async_trait]
pub trait RoleStore: Send + Sync {
	async fn create_role(&self, role: &RoleDefinition) -> Result<(), DbError>;
	async fn get_role(&self, id: &RoleId) -> Result<Option<RoleDefinition>, DbError>;
	async fn get_role_by_name(
		&self,
		org_id: &OrgId,
		name: &str,
	) -> Result<Option<RoleDefinition>, DbError>;
	async fn list_roles(&self, org_id: &OrgId) -> Result<Vec<RoleDefinition>, DbError>;
	async fn count_roles(&self, org_id: &OrgId) -> Result<i64, DbError>;
	async fn update_role(&self, role: &RoleDefinition) -> Result<(), DbError>;
	async fn delete_role(&self, id: &RoleId) -> Result<(), DbError>;
}

/// Repository for custom role database operations.
#[derive(Clone)]
pub struct RoleRepository {
	pool: SqlitePool,
}

impl RoleRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	fn row_to_role(&self, row: &sqlx::sqlite::SqliteRow) -> Result<RoleDefinition, DbError> {
		let id_str: String = row.get("id");
		let org_id_str: String = row.get("org_id");
		let permissions: String = row.get("permissions");
		let is_system_role: i32 = row.get("is_system_role");
		let created_at: String = row.get("created_at");
		let updated_at: String = row.get("updated_at");

		let id =
			Uuid::parse_str(&id_str).map_err(|e| DbError::Internal(format!("Invalid role ID: {e}")))?;
		let org_id = Uuid::parse_str(&org_id_str)
			.map_err(|e| DbError::Internal(format!("Invalid org_id: {e}")))?;
		let value: serde_json::Value = serde_json::from_str(&permissions)?;
		let grants = RoleGrants::parse_json(&value)
			.map_err(|e| DbError::Internal(format!("Invalid role grants: {e}")))?;

		Ok(RoleDefinition {
			id: RoleId::new(id),
			org_id: OrgId::new(org_id),
			name: row.get("name"),
			grants,
			description: row.get("description"),
			color: row.get("color"),
			level: row.get("level"),
			is_system_role: is_system_role != 0,
			created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
				.map_err(|e| DbError::Internal(format!("Invalid created_at: {e}")))?
				.with_timezone(&Utc),
			updated_at: chrono::DateTime::parse_from_rfc3339(&updated_at)
				.map_err(|e| DbError::Internal(format!("Invalid updated_at: {e}")))?
				.with_timezone(&Utc),
		})
	}
}

#[async_trait]
impl RoleStore for RoleRepository {
	/// Create a custom role, enforcing the per-organization cap.
	///
	/// # Errors
	/// - `DbError::RoleLimitExceeded` when the organization already has
	///   [`MAX_CUSTOM_ROLES_PER_ORG`] roles
	/// - `DbError::Conflict` when the name is taken within the organization
	#[tracing::instrument(skip(self, role), fields(role_id = %role.id, org_id = %role.org_id, name = %role.name))]
	async fn create_role(&self, role: &RoleDefinition) -> Result<(), DbError> {
		let grants_json = serde_json::to_string(&role.grants)?;

		let mut tx = self.pool.begin().await?;

		let row = sqlx::query("SELECT COUNT(*) as count FROM org_roles WHERE org_id = ?")
			.bind(role.org_id.to_string())
			.fetch_one(&mut *tx)
			.await?;
		let count: i64 = row.get("count");
		if count >= MAX_CUSTOM_ROLES_PER_ORG as i64 {
			return Err(DbError::RoleLimitExceeded {
				limit: MAX_CUSTOM_ROLES_PER_ORG,
			});
		}

		sqlx::query(
			r#"
			INSERT INTO org_roles (id, org_id, name, permissions, description, color, level, is_system_role, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(role.id.to_string())
		.bind(role.org_id.to_string())
		.bind(&role.name)
		.bind(&grants_json)
		.bind(&role.description)
		.bind(&role.color)
		.bind(role.level)
		.bind(i32::from(role.is_system_role))
		.bind(role.created_at.to_rfc3339())
		.bind(role.updated_at.to_rfc3339())
		.execute(&mut *tx)
		.await?;

		tx.commit().await?;

		tracing::debug!(role_id = %role.id, org_id = %role.org_id, "custom role created");
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(role_id = %id))]
	async fn get_role(&self, id: &RoleId) -> Result<Option<RoleDefinition>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, org_id, name, permissions, description, color, level, is_system_role, created_at, updated_at
			FROM org_roles
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_role(&r)).transpose()
	}

	/// Look up a custom role by name within an organization.
	///
	/// Built-in role names never appear here; callers resolve those from
	/// the static grant tables before reaching the database.
	#[tracing::instrument(skip(self), fields(org_id = %org_id, name = %name))]
	async fn get_role_by_name(
		&self,
		org_id: &OrgId,
		name: &str,
	) -> Result<Option<RoleDefinition>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, org_id, name, permissions, description, color, level, is_system_role, created_at, updated_at
			FROM org_roles
			WHERE org_id = ? AND name = ?
			"#,
		)
		.bind(org_id.to_string())
		.bind(name)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_role(&r)).transpose()
	}

	/// List an organization's custom roles, highest level first.
	#[tracing::instrument(skip(self), fields(org_id = %org_id))]
	async fn list_roles(&self, org_id: &OrgId) -> Result<Vec<RoleDefinition>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, org_id, name, permissions, description, color, level, is_system_role, created_at, updated_at
			FROM org_roles
			WHERE org_id = ?
			ORDER BY level DESC, name ASC
			"#,
		)
		.bind(org_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(|r| self.row_to_role(r)).collect()
	}

	#[tracing::instrument(skip(self), fields(org_id = %org_id))]
	async fn count_roles(&self, org_id: &OrgId) -> Result<i64, DbError> {
		let row = sqlx::query("SELECT COUNT(*) as count FROM org_roles WHERE org_id = ?")
			.bind(org_id.to_string())
			.fetch_one(&self.pool)
			.await?;
		Ok(row.get("count"))
	}

	/// Update a role's name, grants and metadata.
	///
	/// # Errors
	/// - `DbError::NotFound` if the role does not exist
	/// - `DbError::Conflict` if the role is a system role or the new name
	///   is taken
	#[tracing::instrument(skip(self, role), fields(role_id = %role.id))]
	async fn update_role(&self, role: &RoleDefinition) -> Result<(), DbError> {
		let grants_json = serde_json::to_string(&role.grants)?;

		let existing = self
			.get_role(&role.id)
			.await?
			.ok_or_else(|| DbError::NotFound(format!("role {}", role.id)))?;
		if existing.is_system_role {
			return Err(DbError::Conflict(format!(
				"role {} is a system role and cannot be modified",
				role.id
			)));
		}

		sqlx::query(
			r#"
			UPDATE org_roles
			SET name = ?, permissions = ?, description = ?, color = ?, level = ?, updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(&role.name)
		.bind(&grants_json)
		.bind(&role.description)
		.bind(&role.color)
		.bind(role.level)
		.bind(Utc::now().to_rfc3339())
		.bind(role.id.to_string())
		.execute(&self.pool)
		.await?;

		tracing::debug!(role_id = %role.id, "custom role updated");
		Ok(())
	}

	/// Delete a custom role.
	///
	/// # Errors
	/// - `DbError::NotFound` if the role does not exist
	/// - `DbError::Conflict` if the role is a system role
	#[tracing::instrument(skip(self), fields(role_id = %id))]
	async fn delete_role(&self, id: &RoleId) -> Result<(), DbError> {
		let existing = self
			.get_role(id)
			.await?
			.ok_or_else(|| DbError::NotFound(format!("role {id}")))?;
		if existing.is_system_role {
			return Err(DbError::Conflict(format!(
				"role {id} is a system role and cannot be deleted"
			)));
		}

		sqlx::query("DELETE FROM org_roles WHERE id = ?")
			.bind(id.to_string())
			.execute(&self.pool)
			.await?;

		tracing::debug!(role_id = %id, "custom role deleted");
		Ok(())
	}
}
