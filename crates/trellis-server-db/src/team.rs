// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Team repository.
//!
//! Teams are scoped to an organization; names are unique per organization.
//! Team membership is a plain join table keyed on (team, user).

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use trellis_server_auth::{OrgId, Team, TeamId, TeamMembership, UserId};
use uuid::Uuid;

use crate::error::DbError;

#[async_trait]
pub trait TeamStore: Send + Sync {
	async fn create_team(&self, team: &Team) -> Result<(), DbError>;
	async fn get_team(&self, id: &TeamId) -> Result<Option<Team>, DbError>;
	async fn list_teams(&self, org_id: &OrgId) -> Result<Vec<Team>, DbError>;
	async fn update_team(&self, id: &TeamId, name: &str) -> Result<(), DbError>;
	async fn delete_team(&self, id: &TeamId) -> Result<bool, DbError>;
	async fn add_team_member(&self, team_id: &TeamId, user_id: &UserId) -> Result<(), DbError>;
	async fn remove_team_member(&self, team_id: &TeamId, user_id: &UserId) -> Result<bool, DbError>;
	async fn list_team_members(&self, team_id: &TeamId) -> Result<Vec<TeamMembership>, DbError>;
	async fn is_team_member(&self, team_id: &TeamId, user_id: &UserId) -> Result<bool, DbError>;
}

/// Repository for team database operations.
#[derive(Clone)]
pub struct TeamRepository {
	pool: SqlitePool,
}

impl TeamRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	fn row_to_team(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Team, DbError> {
		let id_str: String = row.get("id");
		let org_id_str: String = row.get("org_id");
		let created_at: String = row.get("created_at");
		let updated_at: String = row.get("updated_at");

		let id =
			Uuid::parse_str(&id_str).map_err(|e| DbError::Internal(format!("Invalid team ID: {e}")))?;
		let org_id = Uuid::parse_str(&org_id_str)
			.map_err(|e| DbError::Internal(format!("Invalid org_id: {e}")))?;

		Ok(Team {
			id: TeamId::new(id),
			org_id: OrgId::new(org_id),
			name: row.get("name"),
			created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
				.map_err(|e| DbError::Internal(format!("Invalid created_at: {e}")))?
				.with_timezone(&Utc),
			updated_at: chrono::DateTime::parse_from_rfc3339(&updated_at)
				.map_err(|e| DbError::Internal(format!("Invalid updated_at: {e}")))?
				.with_timezone(&Utc),
		})
	}

	fn row_to_team_membership(
		&self,
		row: &sqlx::sqlite::SqliteRow,
	) -> Result<TeamMembership, DbError> {
		let team_id_str: String = row.get("team_id");
		let user_id_str: String = row.get("user_id");
		let created_at: String = row.get("created_at");

		let team_id = Uuid::parse_str(&team_id_str)
			.map_err(|e| DbError::Internal(format!("Invalid team_id: {e}")))?;
		let user_id = Uuid::parse_str(&user_id_str)
			.map_err(|e| DbError::Internal(format!("Invalid user_id: {e}")))?;

		Ok(TeamMembership {
			team_id: TeamId::new(team_id),
			user_id: UserId::new(user_id),
			created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
				.map_err(|e| DbError::Internal(format!("Invalid created_at: {e}")))?
				.with_timezone(&Utc),
		})
	}
}

#[async_trait]
impl TeamStore for TeamRepository {
	/// Create a team.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if the name is taken within the organization.
	#[tracing::instrument(skip(self, team), fields(team_id = %team.id, org_id = %team.org_id))]
	async fn create_team(&self, team: &Team) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO teams (id, org_id, name, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(team.id.to_string())
		.bind(team.org_id.to_string())
		.bind(&team.name)
		.bind(team.created_at.to_rfc3339())
		.bind(team.updated_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(team_id = %team.id, "team created");
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(team_id = %id))]
	async fn get_team(&self, id: &TeamId) -> Result<Option<Team>, DbError> {
		let row = sqlx::query("SELECT id, org_id, name, created_at, updated_at FROM teams WHERE id = ?")
			.bind(id.to_string())
			.fetch_optional(&self.pool)
			.await?;

		row.map(|r| self.row_to_team(&r)).transpose()
	}

	/// List an organization's teams ordered by name.
	#[tracing::instrument(skip(self), fields(org_id = %org_id))]
	async fn list_teams(&self, org_id: &OrgId) -> Result<Vec<Team>, DbError> {
		let rows = sqlx::query(
			"SELECT id, org_id, name, created_at, updated_at FROM teams WHERE org_id = ? ORDER BY name ASC",
		)
		.bind(org_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(|r| self.row_to_team(r)).collect()
	}

	/// Rename a team.
	///
	/// # Errors
	/// - `DbError::NotFound` if the team does not exist
	/// - `DbError::Conflict` if the new name is taken within the organization
	#[tracing::instrument(skip(self), fields(team_id = %id, name = %name))]
	async fn update_team(&self, id: &TeamId, name: &str) -> Result<(), DbError> {
		let result = sqlx::query("UPDATE teams SET name = ?, updated_at = ? WHERE id = ?")
			.bind(name)
			.bind(Utc::now().to_rfc3339())
			.bind(id.to_string())
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("team {id}")));
		}

		tracing::debug!(team_id = %id, "team renamed");
		Ok(())
	}

	/// Delete a team and its memberships. Returns false if it did not exist.
	#[tracing::instrument(skip(self), fields(team_id = %id))]
	async fn delete_team(&self, id: &TeamId) -> Result<bool, DbError> {
		let mut tx = self.pool.begin().await?;

		sqlx::query("DELETE FROM team_memberships WHERE team_id = ?")
			.bind(id.to_string())
			.execute(&mut *tx)
			.await?;
		let result = sqlx::query("DELETE FROM teams WHERE id = ?")
			.bind(id.to_string())
			.execute(&mut *tx)
			.await?;

		tx.commit().await?;

		tracing::debug!(team_id = %id, "team deleted");
		Ok(result.rows_affected() > 0)
	}

	/// Add a user to a team.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if the user is already on the team.
	#[tracing::instrument(skip(self), fields(team_id = %team_id, user_id = %user_id))]
	async fn add_team_member(&self, team_id: &TeamId, user_id: &UserId) -> Result<(), DbError> {
		sqlx::query("INSERT INTO team_memberships (team_id, user_id, created_at) VALUES (?, ?, ?)")
			.bind(team_id.to_string())
			.bind(user_id.to_string())
			.bind(Utc::now().to_rfc3339())
			.execute(&self.pool)
			.await?;

		tracing::debug!(team_id = %team_id, user_id = %user_id, "team member added");
		Ok(())
	}

	/// Remove a user from a team. Returns false if they were not a member.
	#[tracing::instrument(skip(self), fields(team_id = %team_id, user_id = %user_id))]
	async fn remove_team_member(&self, team_id: &TeamId, user_id: &UserId) -> Result<bool, DbError> {
		let result = sqlx::query("DELETE FROM team_memberships WHERE team_id = ? AND user_id = ?")
			.bind(team_id.to_string())
			.bind(user_id.to_string())
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected() > 0)
	}

	/// List a team's memberships, oldest first.
	#[tracing::instrument(skip(self), fields(team_id = %team_id))]
	async fn list_team_members(&self, team_id: &TeamId) -> Result<Vec<TeamMembership>, DbError> {
		let rows = sqlx::query(
			"SELECT team_id, user_id, created_at FROM team_memberships WHERE team_id = ? ORDER BY created_at ASC",
		)
		.bind(team_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(|r| self.row_to_team_membership(r)).collect()
	}

	#[tracing::instrument(skip(self), fields(team_id = %team_id, user_id = %user_id))]
	async fn is_team_member(&self, team_id: &TeamId, user_id: &UserId) -> Result<bool, DbError> {
		let row = sqlx::query(
			"SELECT COUNT(*) as count FROM team_memberships WHERE team_id = ? AND user_id = ?",
		)
		.bind(team_id.to_string())
		.bind(user_id.to_string())
		.fetch_one(&self.pool)
		.await?;

		let count: i64 = row.get("count");
		Ok(count > 0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::org::{OrgRepository, OrgStore};
	use crate::testing::create_test_pool;
	use crate::user::{UserRepository, UserStore};
	use trellis_server_auth::{Organization, SystemRole, User};

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

	async fn seed_org(pool: &SqlitePool, slug: &str) -> Organization {
		let org = Organization::new(slug.to_uppercase(), slug);
		OrgRepository::new(pool.clone()).create_org(&org).await.unwrap();
		org
	}

	#[tokio::test]
	async fn team_crud() {
		let pool = create_test_pool().await;
		let org = seed_org(&pool, "crud").await;
		let repo = TeamRepository::new(pool);

		let team = Team::new(org.id, "Platform");
		repo.create_team(&team).await.unwrap();

		let fetched = repo.get_team(&team.id).await.unwrap().unwrap();
		assert_eq!(fetched.name, "Platform");

		repo.update_team(&team.id, "Infra").await.unwrap();
		assert_eq!(repo.get_team(&team.id).await.unwrap().unwrap().name, "Infra");

		assert!(repo.delete_team(&team.id).await.unwrap());
		assert!(repo.get_team(&team.id).await.unwrap().is_none());
		assert!(!repo.delete_team(&team.id).await.unwrap());
	}

	#[tokio::test]
	async fn duplicate_name_in_org_is_a_conflict() {
		let pool = create_test_pool().await;
		let org = seed_org(&pool, "names").await;
		let repo = TeamRepository::new(pool);

		repo.create_team(&Team::new(org.id, "Core")).await.unwrap();
		let err = repo.create_team(&Team::new(org.id, "Core")).await.unwrap_err();
		assert!(err.is_conflict());
	}

	#[tokio::test]
	async fn same_name_across_orgs_is_fine() {
		let pool = create_test_pool().await;
		let a = seed_org(&pool, "org-a").await;
		let b = seed_org(&pool, "org-b").await;
		let repo = TeamRepository::new(pool);

		repo.create_team(&Team::new(a.id, "Core")).await.unwrap();
		repo.create_team(&Team::new(b.id, "Core")).await.unwrap();

		assert_eq!(repo.list_teams(&a.id).await.unwrap().len(), 1);
		assert_eq!(repo.list_teams(&b.id).await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn membership_roundtrip() {
		let pool = create_test_pool().await;
		let org = seed_org(&pool, "members").await;
		let user = seed_user(&pool, "tm@example.com").await;
		let repo = TeamRepository::new(pool);

		let team = Team::new(org.id, "Squad");
		repo.create_team(&team).await.unwrap();

		repo.add_team_member(&team.id, &user).await.unwrap();
		assert!(repo.is_team_member(&team.id, &user).await.unwrap());
		assert_eq!(repo.list_team_members(&team.id).await.unwrap().len(), 1);

		let err = repo.add_team_member(&team.id, &user).await.unwrap_err();
		assert!(err.is_conflict());

		assert!(repo.remove_team_member(&team.id, &user).await.unwrap());
		assert!(!repo.is_team_member(&team.id, &user).await.unwrap());
		assert!(!repo.remove_team_member(&team.id, &user).await.unwrap());
	}

	#[tokio::test]
	async fn deleting_team_removes_memberships() {
		let pool = create_test_pool().await;
		let org = seed_org(&pool, "cleanup").await;
		let user = seed_user(&pool, "gone@example.com").await;
		let repo = TeamRepository::new(pool);

		let team = Team::new(org.id, "Doomed");
		repo.create_team(&team).await.unwrap();
		repo.add_team_member(&team.id, &user).await.unwrap();

		repo.delete_team(&team.id).await.unwrap();
		assert!(repo.list_team_members(&team.id).await.unwrap().is_empty());
	}
}
