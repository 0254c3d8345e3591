// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Session repository.
//!
//! Sessions are looked up by token hash only; plaintext tokens are never
//! stored. Revocation is a tombstone (`revoked_at`) so admin surfaces can
//! still list recently revoked sessions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row};
use trellis_server_auth::{OrgId, SessionId, TeamId, UserId};
use uuid::Uuid;

use crate::error::DbError;

/// A session row as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
	pub id: SessionId,
	pub user_id: UserId,
	pub active_org_id: Option<OrgId>,
	pub active_team_id: Option<TeamId>,
	pub impersonated_by: Option<UserId>,
	pub ip_address: Option<String>,
	pub user_agent: Option<String>,
	pub expires_at: DateTime<Utc>,
	pub created_at: DateTime<Utc>,
	pub revoked_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
	/// Returns true if the session is revoked or past expiry.
	pub fn is_live(&self, now: DateTime<Utc>) -> bool {
		self.revoked_at.is_none() && self.expires_at > now
	}
}

#[async_trait]
pub trait SessionStore: Send + Sync {
	async fn create_session(
		&self,
		record: &SessionRecord,
		token_hash: &str,
	) -> Result<(), DbError>;
	async fn get_session_by_token_hash(
		&self,
		token_hash: &str,
	) -> Result<Option<SessionRecord>, DbError>;
	async fn get_session_by_id(&self, id: &SessionId) -> Result<Option<SessionRecord>, DbError>;
	async fn list_sessions_for_user(&self, user_id: &UserId) -> Result<Vec<SessionRecord>, DbError>;
	async fn set_active_org(
		&self,
		id: &SessionId,
		org_id: Option<&OrgId>,
		team_id: Option<&TeamId>,
	) -> Result<(), DbError>;
	async fn set_impersonation(
		&self,
		id: &SessionId,
		target_user: &UserId,
		admin_user: &UserId,
	) -> Result<(), DbError>;
	async fn clear_impersonation(&self, id: &SessionId, admin_user: &UserId) -> Result<(), DbError>;
	async fn revoke_session(&self, id: &SessionId) -> Result<bool, DbError>;
	async fn revoke_sessions_for_user(&self, user_id: &UserId) -> Result<u64, DbError>;
	async fn delete_expired_sessions(&self) -> Result<u64, DbError>;
}

/// Repository for session database operations.
#[derive(Clone)]
pub struct SessionRepository {
	pool: SqlitePool,
}

impl SessionRepository {
	/// Create a new repository with the given pool.
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	fn row_to_session(&self, row: &sqlx::sqlite::SqliteRow) -> Result<SessionRecord, DbError> {
		let id_str: String = row.get("id");
		let user_id_str: String = row.get("user_id");
		let active_org_id: Option<String> = row.get("active_org_id");
		let active_team_id: Option<String> = row.get("active_team_id");
		let impersonated_by: Option<String> = row.get("impersonated_by");
		let expires_at: String = row.get("expires_at");
		let created_at: String = row.get("created_at");
		let revoked_at: Option<String> = row.get("revoked_at");

		let id = Uuid::parse_str(&id_str)
			.map_err(|e| DbError::Internal(format!("Invalid session ID: {e}")))?;
		let user_id = Uuid::parse_str(&user_id_str)
			.map_err(|e| DbError::Internal(format!("Invalid user_id: {e}")))?;

		let parse_opt_uuid = |value: Option<String>, field: &str| -> Result<Option<Uuid>, DbError> {
			value
				.map(|v| {
					Uuid::parse_str(&v).map_err(|e| DbError::Internal(format!("Invalid {field}: {e}")))
				})
				.transpose()
		};

		Ok(SessionRecord {
			id: SessionId::new(id),
			user_id: UserId::new(user_id),
			active_org_id: parse_opt_uuid(active_org_id, "active_org_id")?.map(OrgId::new),
			active_team_id: parse_opt_uuid(active_team_id, "active_team_id")?.map(TeamId::new),
			impersonated_by: parse_opt_uuid(impersonated_by, "impersonated_by")?.map(UserId::new),
			ip_address: row.get("ip_address"),
			user_agent: row.get("user_agent"),
			expires_at: chrono::DateTime::parse_from_rfc3339(&expires_at)
				.map_err(|e| DbError::Internal(format!("Invalid expires_at: {e}")))?
				.with_timezone(&Utc),
			created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
				.map_err(|e| DbError::Internal(format!("Invalid created_at: {e}")))?
				.with_timezone(&Utc),
			revoked_at: revoked_at.and_then(|d| {
				chrono::DateTime::parse_from_rfc3339(&d)
					.map(|dt| dt.with_timezone(&Utc))
					.ok()
			}),
		})
	}
}

const SESSION_COLUMNS: &str = "id, user_id, active_org_id, active_team_id, impersonated_by, ip_address, user_agent, expires_at, created_at, revoked_at";

#[async_trait]
impl SessionStore for SessionRepository {
	/// Persist a new session keyed by its token hash.
	#[tracing::instrument(skip(self, record, token_hash), fields(session_id = %record.id, user_id = %record.user_id))]
	async fn create_session(
		&self,
		record: &SessionRecord,
		token_hash: &str,
	) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO sessions (id, user_id, token_hash, active_org_id, active_team_id, impersonated_by, ip_address, user_agent, expires_at, created_at, revoked_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(record.id.to_string())
		.bind(record.user_id.to_string())
		.bind(token_hash)
		.bind(record.active_org_id.map(|v| v.to_string()))
		.bind(record.active_team_id.map(|v| v.to_string()))
		.bind(record.impersonated_by.map(|v| v.to_string()))
		.bind(&record.ip_address)
		.bind(&record.user_agent)
		.bind(record.expires_at.to_rfc3339())
		.bind(record.created_at.to_rfc3339())
		.bind(record.revoked_at.map(|d| d.to_rfc3339()))
		.execute(&self.pool)
		.await?;

		tracing::debug!(session_id = %record.id, "session created");
		Ok(())
	}

	/// Resolve a session from a token hash. Revoked sessions are not returned.
	#[tracing::instrument(skip_all)]
	async fn get_session_by_token_hash(
		&self,
		token_hash: &str,
	) -> Result<Option<SessionRecord>, DbError> {
		let row = sqlx::query(&format!(
			"SELECT {SESSION_COLUMNS} FROM sessions WHERE token_hash = ? AND revoked_at IS NULL"
		))
		.bind(token_hash)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_session(&r)).transpose()
	}

	/// Get a session by ID, revoked or not.
	#[tracing::instrument(skip(self), fields(session_id = %id))]
	async fn get_session_by_id(&self, id: &SessionId) -> Result<Option<SessionRecord>, DbError> {
		let row = sqlx::query(&format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?"))
			.bind(id.to_string())
			.fetch_optional(&self.pool)
			.await?;

		row.map(|r| self.row_to_session(&r)).transpose()
	}

	/// List all unrevoked sessions for a user, newest first.
	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	async fn list_sessions_for_user(&self, user_id: &UserId) -> Result<Vec<SessionRecord>, DbError> {
		let rows = sqlx::query(&format!(
			"SELECT {SESSION_COLUMNS} FROM sessions WHERE user_id = ? AND revoked_at IS NULL ORDER BY created_at DESC"
		))
		.bind(user_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(|r| self.row_to_session(r)).collect()
	}

	/// Point the session at a new active organization (and optional team).
	#[tracing::instrument(skip(self), fields(session_id = %id))]
	async fn set_active_org(
		&self,
		id: &SessionId,
		org_id: Option<&OrgId>,
		team_id: Option<&TeamId>,
	) -> Result<(), DbError> {
		let result =
			sqlx::query("UPDATE sessions SET active_org_id = ?, active_team_id = ? WHERE id = ?")
				.bind(org_id.map(|v| v.to_string()))
				.bind(team_id.map(|v| v.to_string()))
				.bind(id.to_string())
				.execute(&self.pool)
				.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("session {id}")));
		}
		Ok(())
	}

	/// Switch the session to act as `target_user`, recording the admin.
	#[tracing::instrument(skip(self), fields(session_id = %id, target = %target_user))]
	async fn set_impersonation(
		&self,
		id: &SessionId,
		target_user: &UserId,
		admin_user: &UserId,
	) -> Result<(), DbError> {
		let result = sqlx::query(
			"UPDATE sessions SET user_id = ?, impersonated_by = ?, active_org_id = NULL, active_team_id = NULL WHERE id = ?",
		)
		.bind(target_user.to_string())
		.bind(admin_user.to_string())
		.bind(id.to_string())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("session {id}")));
		}
		tracing::debug!(session_id = %id, "impersonation started");
		Ok(())
	}

	/// Return the session to the impersonating admin.
	#[tracing::instrument(skip(self), fields(session_id = %id))]
	async fn clear_impersonation(&self, id: &SessionId, admin_user: &UserId) -> Result<(), DbError> {
		let result = sqlx::query(
			"UPDATE sessions SET user_id = ?, impersonated_by = NULL, active_org_id = NULL, active_team_id = NULL WHERE id = ? AND impersonated_by = ?",
		)
		.bind(admin_user.to_string())
		.bind(id.to_string())
		.bind(admin_user.to_string())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("impersonating session {id}")));
		}
		tracing::debug!(session_id = %id, "impersonation ended");
		Ok(())
	}

	/// Revoke a single session. Returns false if it did not exist or was
	/// already revoked.
	#[tracing::instrument(skip(self), fields(session_id = %id))]
	async fn revoke_session(&self, id: &SessionId) -> Result<bool, DbError> {
		let now = Utc::now().to_rfc3339();
		let result =
			sqlx::query("UPDATE sessions SET revoked_at = ? WHERE id = ? AND revoked_at IS NULL")
				.bind(now)
				.bind(id.to_string())
				.execute(&self.pool)
				.await?;

		Ok(result.rows_affected() > 0)
	}

	/// Revoke every unrevoked session belonging to a user.
	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	async fn revoke_sessions_for_user(&self, user_id: &UserId) -> Result<u64, DbError> {
		let now = Utc::now().to_rfc3339();
		let result =
			sqlx::query("UPDATE sessions SET revoked_at = ? WHERE user_id = ? AND revoked_at IS NULL")
				.bind(now)
				.bind(user_id.to_string())
				.execute(&self.pool)
				.await?;

		tracing::debug!(user_id = %user_id, count = result.rows_affected(), "sessions revoked");
		Ok(result.rows_affected())
	}

	/// Hard-delete sessions past expiry. Returns the number removed.
	#[tracing::instrument(skip(self))]
	async fn delete_expired_sessions(&self) -> Result<u64, DbError> {
		let now = Utc::now().to_rfc3339();
		let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
			.bind(now)
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;
	use crate::user::{UserRepository, UserStore};
	use chrono::Duration;
	use trellis_server_auth::{SystemRole, User};

	async fn seed_user(pool: &SqlitePool, email: &str) -> UserId {
		let now = Utc::now();
		let user = User {
			id: UserId::generate(),
			display_name: "Seed".to_string(),
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

	fn record(user_id: UserId) -> SessionRecord {
		let now = Utc::now();
		SessionRecord {
			id: SessionId::generate(),
			user_id,
			active_org_id: None,
			active_team_id: None,
			impersonated_by: None,
			ip_address: Some("127.0.0.1".to_string()),
			user_agent: None,
			expires_at: now + Duration::days(7),
			created_at: now,
			revoked_at: None,
		}
	}

	#[tokio::test]
	async fn create_and_lookup_by_token_hash() {
		let pool = create_test_pool().await;
		let user_id = seed_user(&pool, "s@example.com").await;
		let repo = SessionRepository::new(pool);

		let session = record(user_id);
		repo.create_session(&session, "hash-abc").await.unwrap();

		let found = repo
			.get_session_by_token_hash("hash-abc")
			.await
			.unwrap()
			.unwrap();
		assert_eq!(found.id, session.id);
		assert!(found.is_live(Utc::now()));

		assert!(repo
			.get_session_by_token_hash("other-hash")
			.await
			.unwrap()
			.is_none());
	}

	#[tokio::test]
	async fn revoked_session_is_not_resolvable() {
		let pool = create_test_pool().await;
		let user_id = seed_user(&pool, "r@example.com").await;
		let repo = SessionRepository::new(pool);

		let session = record(user_id);
		repo.create_session(&session, "hash-r").await.unwrap();
		assert!(repo.revoke_session(&session.id).await.unwrap());

		assert!(repo
			.get_session_by_token_hash("hash-r")
			.await
			.unwrap()
			.is_none());
		// Second revoke is a no-op.
		assert!(!repo.revoke_session(&session.id).await.unwrap());
	}

	#[tokio::test]
	async fn revoke_all_sessions_for_user() {
		let pool = create_test_pool().await;
		let user_id = seed_user(&pool, "all@example.com").await;
		let repo = SessionRepository::new(pool);

		repo.create_session(&record(user_id), "h1").await.unwrap();
		repo.create_session(&record(user_id), "h2").await.unwrap();

		assert_eq!(repo.list_sessions_for_user(&user_id).await.unwrap().len(), 2);
		assert_eq!(repo.revoke_sessions_for_user(&user_id).await.unwrap(), 2);
		assert!(repo
			.list_sessions_for_user(&user_id)
			.await
			.unwrap()
			.is_empty());
	}

	#[tokio::test]
	async fn impersonation_switches_and_restores_user() {
		let pool = create_test_pool().await;
		let admin_id = seed_user(&pool, "admin@example.com").await;
		let target_id = seed_user(&pool, "target@example.com").await;
		let repo = SessionRepository::new(pool);

		let session = record(admin_id);
		repo.create_session(&session, "h-imp").await.unwrap();

		repo
			.set_impersonation(&session.id, &target_id, &admin_id)
			.await
			.unwrap();
		let during = repo.get_session_by_id(&session.id).await.unwrap().unwrap();
		assert_eq!(during.user_id, target_id);
		assert_eq!(during.impersonated_by, Some(admin_id));
		assert!(during.active_org_id.is_none());

		repo
			.clear_impersonation(&session.id, &admin_id)
			.await
			.unwrap();
		let after = repo.get_session_by_id(&session.id).await.unwrap().unwrap();
		assert_eq!(after.user_id, admin_id);
		assert!(after.impersonated_by.is_none());
	}

	#[tokio::test]
	async fn clear_impersonation_requires_matching_admin() {
		let pool = create_test_pool().await;
		let admin_id = seed_user(&pool, "admin2@example.com").await;
		let repo = SessionRepository::new(pool);

		let session = record(admin_id);
		repo.create_session(&session, "h-none").await.unwrap();

		// Not impersonating: nothing matches.
		let err = repo
			.clear_impersonation(&session.id, &admin_id)
			.await
			.unwrap_err();
		assert!(matches!(err, DbError::NotFound(_)));
	}

	#[tokio::test]
	async fn delete_expired_sessions_removes_only_expired() {
		let pool = create_test_pool().await;
		let user_id = seed_user(&pool, "exp@example.com").await;
		let repo = SessionRepository::new(pool);

		let mut expired = record(user_id);
		expired.expires_at = Utc::now() - Duration::hours(1);
		repo.create_session(&expired, "h-old").await.unwrap();
		repo.create_session(&record(user_id), "h-new").await.unwrap();

		assert_eq!(repo.delete_expired_sessions().await.unwrap(), 1);
		assert!(repo.get_session_by_id(&expired.id).await.unwrap().is_none());
	}
}
