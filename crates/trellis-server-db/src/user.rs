// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! User repository for database operations.
//!
//! Covers account CRUD, credential storage, system role assignment and
//! ban management. The password hash never leaves this module inside a
//! [`User`] value; it travels only through the dedicated credential
//! methods.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row};
use trellis_server_auth::{SystemRole, User, UserId};
use uuid::Uuid;

use crate::error::DbError;

#[async_trait]
pub trait UserStore: Send + Sync {
	async fn create_user(&self, user: &User, password_hash: Option<&str>) -> Result<(), DbError>;
	async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, DbError>;
	async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError>;
	async fn list_users(
		&self,
		search: Option<&str>,
		limit: i64,
		offset: i64,
	) -> Result<Vec<User>, DbError>;
	async fn count_users(&self, search: Option<&str>) -> Result<i64, DbError>;
	async fn update_user(&self, user: &User) -> Result<(), DbError>;
	async fn soft_delete_user(&self, id: &UserId) -> Result<(), DbError>;
	async fn get_password_hash(&self, id: &UserId) -> Result<Option<String>, DbError>;
	async fn set_password_hash(&self, id: &UserId, password_hash: &str) -> Result<(), DbError>;
	async fn set_system_role(&self, id: &UserId, role: SystemRole) -> Result<(), DbError>;
	async fn ban_user(
		&self,
		id: &UserId,
		reason: Option<&str>,
		expires_at: Option<DateTime<Utc>>,
	) -> Result<(), DbError>;
	async fn unban_user(&self, id: &UserId) -> Result<(), DbError>;
}

/// Repository for user database operations.
#[derive(Clone)]
pub struct UserRepository {
	pool: SqlitePool,
}

impl UserRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	fn row_to_user(&self, row: &sqlx::sqlite::SqliteRow) -> Result<User, DbError> {
		let id_str: String = row.get("id");
		let system_role_str: String = row.get("system_role");
		let banned: i32 = row.get("banned");
		let ban_expires_at: Option<String> = row.get("ban_expires_at");
		let created_at: String = row.get("created_at");
		let updated_at: String = row.get("updated_at");
		let deleted_at: Option<String> = row.get("deleted_at");

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
}

#[async_trait]
impl UserStore for UserRepository {
	/// Create a new user, optionally with an initial password hash.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if the email is already taken.
	#[tracing::instrument(skip(self, user, password_hash), fields(user_id = %user.id))]
	async fn create_user(&self, user: &User, password_hash: Option<&str>) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO users (id, display_name, email, password_hash, system_role, banned, ban_reason, ban_expires_at, created_at, updated_at, deleted_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(user.id.to_string())
		.bind(&user.display_name)
		.bind(&user.email)
		.bind(password_hash)
		.bind(user.system_role.to_string())
		.bind(user.banned as i32)
		.bind(&user.ban_reason)
		.bind(user.ban_expires_at.map(|d| d.to_rfc3339()))
		.bind(user.created_at.to_rfc3339())
		.bind(user.updated_at.to_rfc3339())
		.bind(user.deleted_at.map(|d| d.to_rfc3339()))
		.execute(&self.pool)
		.await?;

		tracing::debug!(user_id = %user.id, "user created");
		Ok(())
	}

	/// Get a user by ID. Soft-deleted users are not returned.
	#[tracing::instrument(skip(self), fields(user_id = %id))]
	async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, display_name, email, system_role, banned, ban_reason, ban_expires_at, created_at, updated_at, deleted_at
			FROM users
			WHERE id = ? AND deleted_at IS NULL
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_user(&r)).transpose()
	}

	/// Get a user by email. Soft-deleted users are not returned.
	#[tracing::instrument(skip(self, email))]
	async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, display_name, email, system_role, banned, ban_reason, ban_expires_at, created_at, updated_at, deleted_at
			FROM users
			WHERE email = ? AND deleted_at IS NULL
			"#,
		)
		.bind(email)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_user(&r)).transpose()
	}

	/// List users, optionally filtered by a substring of email or name.
	#[tracing::instrument(skip(self, search))]
	async fn list_users(
		&self,
		search: Option<&str>,
		limit: i64,
		offset: i64,
	) -> Result<Vec<User>, DbError> {
		let pattern = search.map(|s| format!("%{s}%"));
		let rows = match &pattern {
			Some(pattern) => {
				sqlx::query(
					r#"
					SELECT id, display_name, email, system_role, banned, ban_reason, ban_expires_at, created_at, updated_at, deleted_at
					FROM users
					WHERE deleted_at IS NULL AND (email LIKE ? OR display_name LIKE ?)
					ORDER BY created_at ASC
					LIMIT ? OFFSET ?
					"#,
				)
				.bind(pattern)
				.bind(pattern)
				.bind(limit)
				.bind(offset)
				.fetch_all(&self.pool)
				.await?
			}
			None => {
				sqlx::query(
					r#"
					SELECT id, display_name, email, system_role, banned, ban_reason, ban_expires_at, created_at, updated_at, deleted_at
					FROM users
					WHERE deleted_at IS NULL
					ORDER BY created_at ASC
					LIMIT ? OFFSET ?
					"#,
				)
				.bind(limit)
				.bind(offset)
				.fetch_all(&self.pool)
				.await?
			}
		};

		rows.iter().map(|r| self.row_to_user(r)).collect()
	}

	/// Count users matching the same filter as [`list_users`](UserStore::list_users).
	#[tracing::instrument(skip(self, search))]
	async fn count_users(&self, search: Option<&str>) -> Result<i64, DbError> {
		let pattern = search.map(|s| format!("%{s}%"));
		let row = match &pattern {
			Some(pattern) => {
				sqlx::query(
					"SELECT COUNT(*) as count FROM users WHERE deleted_at IS NULL AND (email LIKE ? OR display_name LIKE ?)",
				)
				.bind(pattern)
				.bind(pattern)
				.fetch_one(&self.pool)
				.await?
			}
			None => {
				sqlx::query("SELECT COUNT(*) as count FROM users WHERE deleted_at IS NULL")
					.fetch_one(&self.pool)
					.await?
			}
		};
		Ok(row.get("count"))
	}

	/// Update a user's profile fields (name and email).
	#[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
	async fn update_user(&self, user: &User) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();
		sqlx::query(
			r#"
			UPDATE users
			SET display_name = ?, email = ?, updated_at = ?
			WHERE id = ? AND deleted_at IS NULL
			"#,
		)
		.bind(&user.display_name)
		.bind(&user.email)
		.bind(now)
		.bind(user.id.to_string())
		.execute(&self.pool)
		.await?;

		tracing::debug!(user_id = %user.id, "user updated");
		Ok(())
	}

	/// Soft-delete a user.
	#[tracing::instrument(skip(self), fields(user_id = %id))]
	async fn soft_delete_user(&self, id: &UserId) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();
		sqlx::query(
			r#"
			UPDATE users
			SET deleted_at = ?, updated_at = ?
			WHERE id = ? AND deleted_at IS NULL
			"#,
		)
		.bind(&now)
		.bind(&now)
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		tracing::debug!(user_id = %id, "user soft-deleted");
		Ok(())
	}

	/// Fetch the stored password hash, if any.
	#[tracing::instrument(skip(self), fields(user_id = %id))]
	async fn get_password_hash(&self, id: &UserId) -> Result<Option<String>, DbError> {
		let row = sqlx::query("SELECT password_hash FROM users WHERE id = ? AND deleted_at IS NULL")
			.bind(id.to_string())
			.fetch_optional(&self.pool)
			.await?;

		Ok(row.and_then(|r| r.get("password_hash")))
	}

	/// Replace the stored password hash.
	#[tracing::instrument(skip(self, password_hash), fields(user_id = %id))]
	async fn set_password_hash(&self, id: &UserId, password_hash: &str) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();
		let result = sqlx::query(
			"UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
		)
		.bind(password_hash)
		.bind(now)
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("user {id}")));
		}
		tracing::debug!(user_id = %id, "password hash updated");
		Ok(())
	}

	/// Change a user's platform-wide role.
	#[tracing::instrument(skip(self), fields(user_id = %id, role = %role))]
	async fn set_system_role(&self, id: &UserId, role: SystemRole) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();
		let result = sqlx::query(
			"UPDATE users SET system_role = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
		)
		.bind(role.to_string())
		.bind(now)
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("user {id}")));
		}
		tracing::debug!(user_id = %id, role = %role, "system role updated");
		Ok(())
	}

	/// Ban a user, optionally with a reason and expiry.
	#[tracing::instrument(skip(self, reason), fields(user_id = %id))]
	async fn ban_user(
		&self,
		id: &UserId,
		reason: Option<&str>,
		expires_at: Option<DateTime<Utc>>,
	) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();
		let result = sqlx::query(
			r#"
			UPDATE users
			SET banned = 1, ban_reason = ?, ban_expires_at = ?, updated_at = ?
			WHERE id = ? AND deleted_at IS NULL
			"#,
		)
		.bind(reason)
		.bind(expires_at.map(|d| d.to_rfc3339()))
		.bind(now)
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("user {id}")));
		}
		tracing::debug!(user_id = %id, "user banned");
		Ok(())
	}

	/// Lift a ban.
	#[tracing::instrument(skip(self), fields(user_id = %id))]
	async fn unban_user(&self, id: &UserId) -> Result<(), DbError> {
		let now = Utc::now().to_rfc3339();
		let result = sqlx::query(
			r#"
			UPDATE users
			SET banned = 0, ban_reason = NULL, ban_expires_at = NULL, updated_at = ?
			WHERE id = ? AND deleted_at IS NULL
			"#,
		)
		.bind(now)
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("user {id}")));
		}
		tracing::debug!(user_id = %id, "user unbanned");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;

	fn test_user(email: &str) -> User {
		let now = Utc::now();
		User {
			id: UserId::generate(),
			display_name: "Test User".to_string(),
			email: email.to_string(),
			system_role: SystemRole::User,
			banned: false,
			ban_reason: None,
			ban_expires_at: None,
			created_at: now,
			updated_at: now,
			deleted_at: None,
		}
	}

	#[tokio::test]
	async fn create_and_fetch_user() {
		let repo = UserRepository::new(create_test_pool().await);
		let user = test_user("a@example.com");
		repo.create_user(&user, None).await.unwrap();

		let fetched = repo.get_user_by_id(&user.id).await.unwrap().unwrap();
		assert_eq!(fetched.email, "a@example.com");
		assert_eq!(fetched.system_role, SystemRole::User);
		assert!(!fetched.banned);

		let by_email = repo.get_user_by_email("a@example.com").await.unwrap();
		assert_eq!(by_email.unwrap().id, user.id);
	}

	#[tokio::test]
	async fn duplicate_email_is_a_conflict() {
		let repo = UserRepository::new(create_test_pool().await);
		repo
			.create_user(&test_user("dup@example.com"), None)
			.await
			.unwrap();
		let err = repo
			.create_user(&test_user("dup@example.com"), None)
			.await
			.unwrap_err();
		assert!(err.is_conflict(), "expected Conflict, got {err:?}");
	}

	#[tokio::test]
	async fn list_users_supports_search_and_pagination() {
		let repo = UserRepository::new(create_test_pool().await);
		for i in 0..5 {
			repo
				.create_user(&test_user(&format!("user{i}@example.com")), None)
				.await
				.unwrap();
		}
		repo
			.create_user(&test_user("someone@else.net"), None)
			.await
			.unwrap();

		let page = repo.list_users(None, 3, 0).await.unwrap();
		assert_eq!(page.len(), 3);

		let matched = repo.list_users(Some("example.com"), 50, 0).await.unwrap();
		assert_eq!(matched.len(), 5);
		assert_eq!(repo.count_users(Some("example.com")).await.unwrap(), 5);
		assert_eq!(repo.count_users(None).await.unwrap(), 6);
	}

	#[tokio::test]
	async fn password_hash_roundtrip() {
		let repo = UserRepository::new(create_test_pool().await);
		let user = test_user("p@example.com");
		repo.create_user(&user, Some("hash-v1")).await.unwrap();

		assert_eq!(
			repo.get_password_hash(&user.id).await.unwrap(),
			Some("hash-v1".to_string())
		);

		repo.set_password_hash(&user.id, "hash-v2").await.unwrap();
		assert_eq!(
			repo.get_password_hash(&user.id).await.unwrap(),
			Some("hash-v2".to_string())
		);
	}

	#[tokio::test]
	async fn password_hash_never_appears_on_user_struct() {
		// Compile-time property really, but assert the fetch path too: the
		// SELECT for users does not include password_hash.
		let repo = UserRepository::new(create_test_pool().await);
		let user = test_user("q@example.com");
		repo.create_user(&user, Some("secret-hash")).await.unwrap();
		let fetched = repo.get_user_by_id(&user.id).await.unwrap().unwrap();
		let json = serde_json::to_string(&fetched).unwrap();
		assert!(!json.contains("secret-hash"));
	}

	#[tokio::test]
	async fn ban_and_unban() {
		let repo = UserRepository::new(create_test_pool().await);
		let user = test_user("ban@example.com");
		repo.create_user(&user, None).await.unwrap();

		repo
			.ban_user(&user.id, Some("abuse"), None)
			.await
			.unwrap();
		let banned = repo.get_user_by_id(&user.id).await.unwrap().unwrap();
		assert!(banned.banned);
		assert_eq!(banned.ban_reason.as_deref(), Some("abuse"));

		repo.unban_user(&user.id).await.unwrap();
		let unbanned = repo.get_user_by_id(&user.id).await.unwrap().unwrap();
		assert!(!unbanned.banned);
		assert!(unbanned.ban_reason.is_none());
	}

	#[tokio::test]
	async fn set_system_role_promotes_user() {
		let repo = UserRepository::new(create_test_pool().await);
		let user = test_user("admin@example.com");
		repo.create_user(&user, None).await.unwrap();

		repo
			.set_system_role(&user.id, SystemRole::Admin)
			.await
			.unwrap();
		let promoted = repo.get_user_by_id(&user.id).await.unwrap().unwrap();
		assert_eq!(promoted.system_role, SystemRole::Admin);
	}

	#[tokio::test]
	async fn soft_deleted_users_are_hidden() {
		let repo = UserRepository::new(create_test_pool().await);
		let user = test_user("gone@example.com");
		repo.create_user(&user, None).await.unwrap();

		repo.soft_delete_user(&user.id).await.unwrap();
		assert!(repo.get_user_by_id(&user.id).await.unwrap().is_none());
		assert!(repo
			.get_user_by_email("gone@example.com")
			.await
			.unwrap()
			.is_none());
	}

	#[tokio::test]
	async fn mutations_on_missing_user_are_not_found() {
		let repo = UserRepository::new(create_test_pool().await);
		let missing = UserId::generate();
		assert!(matches!(
			repo.set_password_hash(&missing, "h").await.unwrap_err(),
			DbError::NotFound(_)
		));
		assert!(matches!(
			repo.ban_user(&missing, None, None).await.unwrap_err(),
			DbError::NotFound(_)
		));
	}
}
