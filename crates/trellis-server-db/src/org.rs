// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Organization repository for database operations.
//!
//! This module provides database access for organization management including:
//! - Organization CRUD operations
//! - Membership management (roles stored by name)
//! - Ownership transfer as a single transaction

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use trellis_server_auth::{MemberId, OrgId, OrgMembership, OrgRole, Organization, User, UserId};
use uuid::Uuid;

use crate::error::DbError;

#[async_trait]
pub trait OrgStore: Send + Sync {
	async fn create_org(&self, org: &Organization) -> Result<(), DbError>;
	async fn get_org_by_id(&self, id: &OrgId) -> Result<Option<Organization>, DbError>;
	async fn get_org_by_slug(&self, slug: &str) -> Result<Option<Organization>, DbError>;
	async fn update_org(&self, org: &Organization) -> Result<(), DbError>;
	async fn soft_delete_org(&self, id: &OrgId) -> Result<(), DbError>;
	async fn list_orgs_for_user(&self, user_id: &UserId) -> Result<Vec<Organization>, DbError>;
	async fn list_all_orgs(&self, limit: i64, offset: i64) -> Result<Vec<Organization>, DbError>;
	async fn count_orgs(&self) -> Result<i64, DbError>;
	async fn add_member(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
		role: &str,
	) -> Result<OrgMembership, DbError>;
	async fn get_membership(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
	) -> Result<Option<OrgMembership>, DbError>;
	async fn update_member_role(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
		role: &str,
	) -> Result<(), DbError>;
	async fn remove_member(&self, org_id: &OrgId, user_id: &UserId) -> Result<bool, DbError>;
	async fn list_members(&self, org_id: &OrgId) -> Result<Vec<(OrgMembership, User)>, DbError>;
	async fn count_owners(&self, org_id: &OrgId) -> Result<i64, DbError>;
	async fn transfer_ownership(
		&self,
		org_id: &OrgId,
		from_user: &UserId,
		to_user: &UserId,
	) -> Result<(), DbError>;
	async fn set_owner(&self, org_id: &OrgId, user_id: &UserId) -> Result<(), DbError>;
}

/// Repository for organization database operations.
///
/// Manages organizations and their memberships. All IDs are UUIDs stored
/// as strings in SQLite; membership roles are stored by name so custom
/// roles need no schema support.
#[derive(Clone)]
pub struct OrgRepository {
	pool: SqlitePool,
}

impl OrgRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	fn row_to_org(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Organization, DbError> {
		let id_str: String = row.get("id");
		let created_at: String = row.get("created_at");
		let updated_at: String = row.get("updated_at");
		let deleted_at: Option<String> = row.get("deleted_at");

		let id =
			Uuid::parse_str(&id_str).map_err(|e| DbError::Internal(format!("Invalid org ID: {e}")))?;

		Ok(Organization {
			id: OrgId::new(id),
			name: row.get("name"),
			slug: row.get("slug"),
			created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
				.map_err(|e| DbError::Internal(format!("Invalid created_at: {e}")))?
				.with_timezone(&Utc),
			updated_at: chrono::DateTime::parse_from_rfc3339(&updated_at)
				.map_err(|e| DbError::Internal(format!("Invalid updated_at: {e}")))?
				.with_timezone(&Utc),
			deleted_at: deleted_at.and_then(|d| {
				chrono::DateTime::parse_from_rfc3339(&d)
					.map(|dt| dt.with_timezone(&Utc))
					.ok()
			}),
		})
	}

	fn row_to_membership(&self, row: &sqlx::sqlite::SqliteRow) -> Result<OrgMembership, DbError> {
		let id_str: String = row.get("id");
		let org_id_str: String = row.get("org_id");
		let user_id_str: String = row.get("user_id");
		let created_at: String = row.get("created_at");

		let id = Uuid::parse_str(&id_str)
			.map_err(|e| DbError::Internal(format!("Invalid membership ID: {e}")))?;
		let org_id = Uuid::parse_str(&org_id_str)
			.map_err(|e| DbError::Internal(format!("Invalid org_id: {e}")))?;
		let user_id = Uuid::parse_str(&user_id_str)
			.map_err(|e| DbError::Internal(format!("Invalid user_id: {e}")))?;

		Ok(OrgMembership {
			id: MemberId::new(id),
			org_id: OrgId::new(org_id),
			user_id: UserId::new(user_id),
			role: row.get("role"),
			created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
				.map_err(|e| DbError::Internal(format!("Invalid created_at: {e}")))?
				.with_timezone(&Utc),
		})
	}
}

#[async_trait]
impl OrgStore for OrgRepository {
	/// Create a new organization.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if the slug is already taken.
	#[tracing::instrument(skip(self, org), fields(org_id = %org.id, slug = %org.slug))]
	async fn create_org(&self, org: &Organization) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO organizations (id, name, slug, created_at, updated_at, deleted_at)
			VALUES (?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(org.id.to_string())
		.bind(&org.name)
		.bind(&org.slug)
		.bind(org.created_at.to_rfc3339())
		.bind(org.updated_at.to_rfc3339())
		.bind(org.deleted_at.map(|d| d.to_rfc3339()))
		.execute(&self.pool)
		.await?;

		tracing::debug!(org_id = %org.id, slug = %org.slug, "organization created");
		Ok(())
	}

	/// Get an organization by ID. Soft-deleted orgs are not returned.
	#[tracing::instrument(skip(self), fields(org_id = %id))]
	async fn get_org_by_id(&self, id: &OrgId) -> Result<Option<Organization>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, name, slug, created_at, updated_at, deleted_at
			FROM organizations
			WHERE id = ? AND deleted_at IS NULL
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_org(&r)).transpose()
	}

	/// Get an organization by slug.
	#[tracing::instrument(skip(self), fields(slug = %slug))]
	async fn get_org_by_slug(&self, slug: &str) -> Result<Option<Organization>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, name, slug, created_at, updated_at, deleted_at
			FROM organizations
			WHERE slug = ? AND deleted_at IS NULL
			"#,
		)
		.bind(slug)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_org(&r)).transpose()
	}

	/// Update an organization's name and slug.
	#[tracing::instrument(skip(self, org), fields(org_id = %org.id))]
	async fn update_org(&self, org: &Organization) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();
		sqlx::query(
			r#"
			UPDATE organizations
			SET name = ?, slug = ?, updated_at = ?
			WHERE id = ? AND deleted_at IS NULL
			"#,
		)
		.bind(&org.name)
		.bind(&org.slug)
		.bind(now)
		.bind(org.id.to_string())
		.execute(&self.pool)
		.await?;

		tracing::debug!(org_id = %org.id, "organization updated");
		Ok(())
	}

	/// Soft-delete an organization.
	#[tracing::instrument(skip(self), fields(org_id = %id))]
	async fn soft_delete_org(&self, id: &OrgId) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();
		sqlx::query(
			r#"
			UPDATE organizations
			SET deleted_at = ?, updated_at = ?
			WHERE id = ? AND deleted_at IS NULL
			"#,
		)
		.bind(&now)
		.bind(&now)
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		tracing::debug!(org_id = %id, "organization soft-deleted");
		Ok(())
	}

	/// List organizations for a user (via membership), ordered by name.
	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	async fn list_orgs_for_user(&self, user_id: &UserId) -> Result<Vec<Organization>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT o.id, o.name, o.slug, o.created_at, o.updated_at, o.deleted_at
			FROM organizations o
			INNER JOIN org_memberships m ON o.id = m.org_id
			WHERE m.user_id = ? AND o.deleted_at IS NULL
			ORDER BY o.name ASC
			"#,
		)
		.bind(user_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(|r| self.row_to_org(r)).collect()
	}

	/// List every organization, for the admin surface.
	#[tracing::instrument(skip(self))]
	async fn list_all_orgs(&self, limit: i64, offset: i64) -> Result<Vec<Organization>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, name, slug, created_at, updated_at, deleted_at
			FROM organizations
			WHERE deleted_at IS NULL
			ORDER BY created_at ASC
			LIMIT ? OFFSET ?
			"#,
		)
		.bind(limit)
		.bind(offset)
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(|r| self.row_to_org(r)).collect()
	}

	#[tracing::instrument(skip(self))]
	async fn count_orgs(&self) -> Result<i64, DbError> {
		let row = sqlx::query("SELECT COUNT(*) as count FROM organizations WHERE deleted_at IS NULL")
			.fetch_one(&self.pool)
			.await?;
		Ok(row.get("count"))
	}

	/// Add a member with the given role name.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if the user is already a member.
	#[tracing::instrument(skip(self), fields(org_id = %org_id, user_id = %user_id, role = %role))]
	async fn add_member(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
		role: &str,
	) -> Result<OrgMembership, DbError> {
		let membership = OrgMembership::new(*org_id, *user_id, role);
		sqlx::query(
			r#"
			INSERT INTO org_memberships (id, org_id, user_id, role, created_at)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(membership.id.to_string())
		.bind(org_id.to_string())
		.bind(user_id.to_string())
		.bind(role)
		.bind(membership.created_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(org_id = %org_id, user_id = %user_id, "member added");
		Ok(membership)
	}

	/// Get a user's membership in an organization.
	#[tracing::instrument(skip(self), fields(org_id = %org_id, user_id = %user_id))]
	async fn get_membership(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
	) -> Result<Option<OrgMembership>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, org_id, user_id, role, created_at
			FROM org_memberships
			WHERE org_id = ? AND user_id = ?
			"#,
		)
		.bind(org_id.to_string())
		.bind(user_id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_membership(&r)).transpose()
	}

	/// Change a member's role.
	///
	/// # Errors
	/// Returns `DbError::LastOwner` if the change would leave the
	/// organization without an owner.
	#[tracing::instrument(skip(self), fields(org_id = %org_id, user_id = %user_id, role = %role))]
	async fn update_member_role(
		&self,
		org_id: &OrgId,
		user_id: &UserId,
		role: &str,
	) -> Result<(), DbError> {
		let current = self
			.get_membership(org_id, user_id)
			.await?
			.ok_or_else(|| DbError::NotFound(format!("membership of {user_id} in {org_id}")))?;

		let owner_name = OrgRole::Owner.to_string();
		if current.role == owner_name && role != owner_name && self.count_owners(org_id).await? <= 1 {
			return Err(DbError::LastOwner);
		}

		sqlx::query("UPDATE org_memberships SET role = ? WHERE org_id = ? AND user_id = ?")
			.bind(role)
			.bind(org_id.to_string())
			.bind(user_id.to_string())
			.execute(&self.pool)
			.await?;

		tracing::debug!(org_id = %org_id, user_id = %user_id, role = %role, "member role updated");
		Ok(())
	}

	/// Remove a member. Returns false if no membership existed.
	///
	/// # Errors
	/// Returns `DbError::LastOwner` when removing the only owner.
	#[tracing::instrument(skip(self), fields(org_id = %org_id, user_id = %user_id))]
	async fn remove_member(&self, org_id: &OrgId, user_id: &UserId) -> Result<bool, DbError> {
		let Some(current) = self.get_membership(org_id, user_id).await? else {
			return Ok(false);
		};

		if current.role == OrgRole::Owner.to_string() && self.count_owners(org_id).await? <= 1 {
			return Err(DbError::LastOwner);
		}

		let result = sqlx::query("DELETE FROM org_memberships WHERE org_id = ? AND user_id = ?")
			.bind(org_id.to_string())
			.bind(user_id.to_string())
			.execute(&self.pool)
			.await?;

		tracing::debug!(org_id = %org_id, user_id = %user_id, "member removed");
		Ok(result.rows_affected() > 0)
	}

	/// List members with their user records, owners first.
	#[tracing::instrument(skip(self), fields(org_id = %org_id))]
	async fn list_members(&self, org_id: &OrgId) -> Result<Vec<(OrgMembership, User)>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT m.id, m.org_id, m.user_id, m.role, m.created_at,
			       u.id as u_id, u.display_name, u.email, u.system_role, u.banned,
			       u.ban_reason, u.ban_expires_at, u.created_at as u_created_at,
			       u.updated_at as u_updated_at, u.deleted_at as u_deleted_at
			FROM org_memberships m
			INNER JOIN users u ON m.user_id = u.id
			WHERE m.org_id = ? AND u.deleted_at IS NULL
			ORDER BY m.created_at ASC
			"#,
		)
		.bind(org_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		rows
			.iter()
			.map(|row| {
				let membership = self.row_to_membership(row)?;
				let user = row_to_joined_user(row)?;
				Ok((membership, user))
			})
			.collect()
	}

	/// Count members holding the owner role.
	#[tracing::instrument(skip(self), fields(org_id = %org_id))]
	async fn count_owners(&self, org_id: &OrgId) -> Result<i64, DbError> {
		let row = sqlx::query(
			"SELECT COUNT(*) as count FROM org_memberships WHERE org_id = ? AND role = ?",
		)
		.bind(org_id.to_string())
		.bind(OrgRole::Owner.to_string())
		.fetch_one(&self.pool)
		.await?;
		Ok(row.get("count"))
	}

	/// Transfer ownership from one member to another atomically.
	///
	/// Promotes `to_user` to owner (creating a membership if needed) and
	/// demotes `from_user` to moderator. Both writes happen in one
	/// transaction; an error leaves the organization unchanged, so the
	/// organization can never end up with zero or two owners from a
	/// half-applied transfer.
	///
	/// # Errors
	/// - `DbError::NotFound` if `from_user` is not a member
	/// - `DbError::Conflict` if `from_user` is not the owner
	#[tracing::instrument(skip(self), fields(org_id = %org_id, from = %from_user, to = %to_user))]
	async fn transfer_ownership(
		&self,
		org_id: &OrgId,
		from_user: &UserId,
		to_user: &UserId,
	) -> Result<(), DbError> {
		let owner_name = OrgRole::Owner.to_string();
		let demoted_name = OrgRole::Moderator.to_string();

		let mut tx = self.pool.begin().await?;

		let from_role: Option<String> =
			sqlx::query("SELECT role FROM org_memberships WHERE org_id = ? AND user_id = ?")
				.bind(org_id.to_string())
				.bind(from_user.to_string())
				.fetch_optional(&mut *tx)
				.await?
				.map(|r| r.get("role"));

		match from_role {
			None => {
				return Err(DbError::NotFound(format!(
					"membership of {from_user} in {org_id}"
				)))
			}
			Some(role) if role != owner_name => {
				return Err(DbError::Conflict(format!(
					"user {from_user} is not the owner of {org_id}"
				)))
			}
			Some(_) => {}
		}

		let updated =
			sqlx::query("UPDATE org_memberships SET role = ? WHERE org_id = ? AND user_id = ?")
				.bind(&owner_name)
				.bind(org_id.to_string())
				.bind(to_user.to_string())
				.execute(&mut *tx)
				.await?;

		if updated.rows_affected() == 0 {
			let membership = OrgMembership::new(*org_id, *to_user, &owner_name);
			sqlx::query(
				r#"
				INSERT INTO org_memberships (id, org_id, user_id, role, created_at)
				VALUES (?, ?, ?, ?, ?)
				"#,
			)
			.bind(membership.id.to_string())
			.bind(org_id.to_string())
			.bind(to_user.to_string())
			.bind(&owner_name)
			.bind(membership.created_at.to_rfc3339())
			.execute(&mut *tx)
			.await?;
		}

		sqlx::query("UPDATE org_memberships SET role = ? WHERE org_id = ? AND user_id = ?")
			.bind(&demoted_name)
			.bind(org_id.to_string())
			.bind(from_user.to_string())
			.execute(&mut *tx)
			.await?;

		tx.commit().await?;

		tracing::info!(org_id = %org_id, from = %from_user, to = %to_user, "ownership transferred");
		Ok(())
	}

	/// Make a user the sole owner.
	///
	/// Creates the membership if the user is not yet a member; any other
	/// owner is demoted to moderator in the same transaction, so exactly
	/// one owner holds after commit.
	#[tracing::instrument(skip(self), fields(org_id = %org_id, user_id = %user_id))]
	async fn set_owner(&self, org_id: &OrgId, user_id: &UserId) -> Result<(), DbError> {
		let owner_name = OrgRole::Owner.to_string();
		let demoted_name = OrgRole::Moderator.to_string();

		let mut tx = self.pool.begin().await?;

		sqlx::query(
			"UPDATE org_memberships SET role = ? WHERE org_id = ? AND role = ? AND user_id != ?",
		)
		.bind(&demoted_name)
		.bind(org_id.to_string())
		.bind(&owner_name)
		.bind(user_id.to_string())
		.execute(&mut *tx)
		.await?;

		let updated =
			sqlx::query("UPDATE org_memberships SET role = ? WHERE org_id = ? AND user_id = ?")
				.bind(&owner_name)
				.bind(org_id.to_string())
				.bind(user_id.to_string())
				.execute(&mut *tx)
				.await?;

		if updated.rows_affected() == 0 {
			let membership = OrgMembership::new(*org_id, *user_id, &owner_name);
			sqlx::query(
				r#"
				INSERT INTO org_memberships (id, org_id, user_id, role, created_at)
				VALUES (?, ?, ?, ?, ?)
				"#,
			)
			.bind(membership.id.to_string())
			.bind(org_id.to_string())
			.bind(user_id.to_string())
			.bind(&owner_name)
			.bind(membership.created_at.to_rfc3339())
			.execute(&mut *tx)
			.await?;
		}

		tx.commit().await?;

		tracing::info!(org_id = %org_id, user_id = %user_id, "owner set");
		Ok(())
	}
}

fn row_to_joined_user(row: &sqlx::sqlite::SqliteRow) -> Result<User, DbError> {
	use trellis_server_auth::SystemRole;

	let id_str: String = row.get("u_id");
	let system_role_str: String = row.get("system_role");
	let banned: i32 = row.get("banned");
	let ban_expires_at: Option<String> = row.get("ban_expires_at");
	let created_at: String = row.get("u_created_at");
	let updated_at: String = row.get("u_updated_at");
	let deleted_at: Option<String> = row.get("u_deleted_at");

	let id =
		Uuid::parse_str(&id_str).map_err(|e| DbError::Internal(format!("Invalid user ID: {e}")))?;
	let system_role = system_role_str
		.parse::<SystemRole>()
		.map_err(|e| DbError::Internal(format!("Invalid system_role: {e}")))?;

	Ok(User {
		id: UserId::new(id),
		display_name: row.get("display_name"),
		email: row.get("email"),
		system_role,
		banned: banned != 0,
		ban_reason: row.get("ban_reason"),
		ban_expires_at: ban_expires_at.and_then(|d| {
			chrono::DateTime::parse_from_rfc3339(&d)
				.map(|dt| dt.with_timezone(&Utc))
				.ok()
		}),
		created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
			.map_err(|e| DbError::Internal(format!("Invalid created_at: {e}")))?
			.with_timezone(&Utc),
		updated_at: chrono::DateTime::parse_from_rfc3339(&updated_at)
			.map_err(|e| DbError::Internal(format!("Invalid updated_at: {e}")))?
			.with_timezone(&Utc),
		deleted_at: deleted_at.and_then(|d| {
			chrono::DateTime::parse_from_rfc3339(&d)
				.map(|dt| dt.with_timezone(&Utc))
				.ok()
		}),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;
	use crate::user::{UserRepository, UserStore};
	use trellis_server_auth::SystemRole;

	async fn seed_user(pool: &SqlitePool, email: &str) -> UserId {
		let now = Utc::now();
		let user = User {
			id: UserId::generate(),
			display_name: email.to_string(),
			email: email.to_string(),
			system_role: SystemRole::User,
			banned: false,
			ban_reason: None,
			ban_expires_at: None,
			created_at: now,
			updated_at: now,
			deleted_at: None,
		};
		UserRepository::new(pool.clone())
			.create_user(&user, None)
			.await
			.unwrap();
		user.id
	}

	async fn seed_org(repo: &OrgRepository, slug: &str) -> Organization {
		let org = Organization::new(slug.to_uppercase(), slug);
		repo.create_org(&org).await.unwrap();
		org
	}

	#[tokio::test]
	async fn create_and_fetch_org() {
		let pool = create_test_pool().await;
		let repo = OrgRepository::new(pool);
		let org = seed_org(&repo, "acme").await;

		let by_id = repo.get_org_by_id(&org.id).await.unwrap().unwrap();
		assert_eq!(by_id.slug, "acme");
		let by_slug = repo.get_org_by_slug("acme").await.unwrap().unwrap();
		assert_eq!(by_slug.id, org.id);
	}

	#[tokio::test]
	async fn duplicate_slug_is_a_conflict() {
		let pool = create_test_pool().await;
		let repo = OrgRepository::new(pool);
		seed_org(&repo, "dup").await;
		let err = repo.create_org(&Organization::new("Dup2", "dup")).await.unwrap_err();
		assert!(err.is_conflict(), "expected Conflict, got {err:?}");
	}

	#[tokio::test]
	async fn soft_deleted_orgs_are_hidden() {
		let pool = create_test_pool().await;
		let repo = OrgRepository::new(pool);
		let org = seed_org(&repo, "gone").await;
		repo.soft_delete_org(&org.id).await.unwrap();
		assert!(repo.get_org_by_id(&org.id).await.unwrap().is_none());
		assert!(repo.get_org_by_slug("gone").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn membership_lifecycle() {
		let pool = create_test_pool().await;
		let owner = seed_user(&pool, "owner@example.com").await;
		let member = seed_user(&pool, "member@example.com").await;
		let repo = OrgRepository::new(pool);
		let org = seed_org(&repo, "team").await;

		repo.add_member(&org.id, &owner, "owner").await.unwrap();
		repo.add_member(&org.id, &member, "member").await.unwrap();

		let membership = repo
			.get_membership(&org.id, &member)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(membership.role, "member");

		repo
			.update_member_role(&org.id, &member, "moderator")
			.await
			.unwrap();
		let updated = repo
			.get_membership(&org.id, &member)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(updated.role, "moderator");

		let members = repo.list_members(&org.id).await.unwrap();
		assert_eq!(members.len(), 2);

		assert!(repo.remove_member(&org.id, &member).await.unwrap());
		assert!(repo.get_membership(&org.id, &member).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn duplicate_membership_is_a_conflict() {
		let pool = create_test_pool().await;
		let user = seed_user(&pool, "twice@example.com").await;
		let repo = OrgRepository::new(pool);
		let org = seed_org(&repo, "once").await;

		repo.add_member(&org.id, &user, "member").await.unwrap();
		let err = repo.add_member(&org.id, &user, "member").await.unwrap_err();
		assert!(err.is_conflict());
	}

	#[tokio::test]
	async fn memberships_accept_custom_role_names() {
		let pool = create_test_pool().await;
		let user = seed_user(&pool, "support@example.com").await;
		let repo = OrgRepository::new(pool);
		let org = seed_org(&repo, "custom").await;

		repo.add_member(&org.id, &user, "support").await.unwrap();
		let membership = repo.get_membership(&org.id, &user).await.unwrap().unwrap();
		assert_eq!(membership.role, "support");
	}

	mod last_owner {
		use super::*;

		#[tokio::test]
		async fn cannot_remove_only_owner() {
			let pool = create_test_pool().await;
			let owner = seed_user(&pool, "solo@example.com").await;
			let repo = OrgRepository::new(pool);
			let org = seed_org(&repo, "solo").await;
			repo.add_member(&org.id, &owner, "owner").await.unwrap();

			let err = repo.remove_member(&org.id, &owner).await.unwrap_err();
			assert!(matches!(err, DbError::LastOwner));
		}

		#[tokio::test]
		async fn cannot_demote_only_owner() {
			let pool = create_test_pool().await;
			let owner = seed_user(&pool, "demote@example.com").await;
			let repo = OrgRepository::new(pool);
			let org = seed_org(&repo, "demote").await;
			repo.add_member(&org.id, &owner, "owner").await.unwrap();

			let err = repo
				.update_member_role(&org.id, &owner, "member")
				.await
				.unwrap_err();
			assert!(matches!(err, DbError::LastOwner));
		}

		#[tokio::test]
		async fn second_owner_unblocks_removal() {
			let pool = create_test_pool().await;
			let a = seed_user(&pool, "a@example.com").await;
			let b = seed_user(&pool, "b@example.com").await;
			let repo = OrgRepository::new(pool);
			let org = seed_org(&repo, "duo").await;
			repo.add_member(&org.id, &a, "owner").await.unwrap();
			repo.add_member(&org.id, &b, "owner").await.unwrap();

			assert_eq!(repo.count_owners(&org.id).await.unwrap(), 2);
			assert!(repo.remove_member(&org.id, &a).await.unwrap());
		}
	}

	mod ownership_transfer {
		use super::*;

		#[tokio::test]
		async fn transfer_promotes_and_demotes_to_moderator() {
			let pool = create_test_pool().await;
			let from = seed_user(&pool, "from@example.com").await;
			let to = seed_user(&pool, "to@example.com").await;
			let repo = OrgRepository::new(pool);
			let org = seed_org(&repo, "handoff").await;
			repo.add_member(&org.id, &from, "owner").await.unwrap();
			repo.add_member(&org.id, &to, "member").await.unwrap();

			repo.transfer_ownership(&org.id, &from, &to).await.unwrap();

			assert_eq!(
				repo.get_membership(&org.id, &to).await.unwrap().unwrap().role,
				"owner"
			);
			assert_eq!(
				repo
					.get_membership(&org.id, &from)
					.await
					.unwrap()
					.unwrap()
					.role,
				"moderator"
			);
			assert_eq!(repo.count_owners(&org.id).await.unwrap(), 1);
		}

		#[tokio::test]
		async fn transfer_creates_membership_for_outsider() {
			let pool = create_test_pool().await;
			let from = seed_user(&pool, "from2@example.com").await;
			let to = seed_user(&pool, "outsider@example.com").await;
			let repo = OrgRepository::new(pool);
			let org = seed_org(&repo, "adopt").await;
			repo.add_member(&org.id, &from, "owner").await.unwrap();

			repo.transfer_ownership(&org.id, &from, &to).await.unwrap();

			assert_eq!(
				repo.get_membership(&org.id, &to).await.unwrap().unwrap().role,
				"owner"
			);
		}

		#[tokio::test]
		async fn transfer_from_non_owner_fails_and_changes_nothing() {
			let pool = create_test_pool().await;
			let owner = seed_user(&pool, "real@example.com").await;
			let pretender = seed_user(&pool, "pretender@example.com").await;
			let to = seed_user(&pool, "to3@example.com").await;
			let repo = OrgRepository::new(pool);
			let org = seed_org(&repo, "guarded").await;
			repo.add_member(&org.id, &owner, "owner").await.unwrap();
			repo.add_member(&org.id, &pretender, "member").await.unwrap();

			let err = repo
				.transfer_ownership(&org.id, &pretender, &to)
				.await
				.unwrap_err();
			assert!(matches!(err, DbError::Conflict(_)));

			// Nothing moved.
			assert_eq!(
				repo
					.get_membership(&org.id, &owner)
					.await
					.unwrap()
					.unwrap()
					.role,
				"owner"
			);
			assert!(repo.get_membership(&org.id, &to).await.unwrap().is_none());
		}

		#[tokio::test]
		async fn transfer_from_non_member_is_not_found() {
			let pool = create_test_pool().await;
			let stranger = seed_user(&pool, "stranger@example.com").await;
			let to = seed_user(&pool, "to4@example.com").await;
			let repo = OrgRepository::new(pool);
			let org = seed_org(&repo, "empty").await;

			let err = repo
				.transfer_ownership(&org.id, &stranger, &to)
				.await
				.unwrap_err();
			assert!(matches!(err, DbError::NotFound(_)));
		}

		#[tokio::test]
		async fn set_owner_leaves_exactly_one_owner() {
			let pool = create_test_pool().await;
			let a = seed_user(&pool, "sa@example.com").await;
			let b = seed_user(&pool, "sb@example.com").await;
			let repo = OrgRepository::new(pool);
			let org = seed_org(&repo, "coown").await;
			repo.add_member(&org.id, &a, "owner").await.unwrap();

			repo.set_owner(&org.id, &b).await.unwrap();

			assert_eq!(repo.count_owners(&org.id).await.unwrap(), 1);
			assert_eq!(
				repo.get_membership(&org.id, &b).await.unwrap().unwrap().role,
				"owner"
			);
			assert_eq!(
				repo.get_membership(&org.id, &a).await.unwrap().unwrap().role,
				"moderator"
			);
		}

		#[tokio::test]
		async fn set_owner_is_idempotent_for_current_owner() {
			let pool = create_test_pool().await;
			let a = seed_user(&pool, "si@example.com").await;
			let repo = OrgRepository::new(pool);
			let org = seed_org(&repo, "idem").await;
			repo.add_member(&org.id, &a, "owner").await.unwrap();

			repo.set_owner(&org.id, &a).await.unwrap();

			assert_eq!(repo.count_owners(&org.id).await.unwrap(), 1);
		}
	}
}
