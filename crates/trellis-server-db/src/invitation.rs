// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Invitation repository.
//!
//! Invitations are rows with a status column rather than deletable records,
//! so the history of cancelled and accepted invitations is queryable.
//! Acceptance is transactional: the status flip and the membership insert
//! commit together or not at all.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{sqlite::SqlitePool, Row};
use trellis_server_auth::{
	Invitation, InvitationId, InvitationStatus, OrgId, OrgMembership, UserId,
	INVITATION_EXPIRY_HOURS,
};
use uuid::Uuid;

use crate::error::DbError;

#[async_trait]
pub trait InvitationStore: Send + Sync {
	async fn create_invitation(&self, invitation: &Invitation) -> Result<(), DbError>;
	async fn get_invitation(&self, id: &InvitationId) -> Result<Option<Invitation>, DbError>;
	async fn list_pending_invitations(&self, org_id: &OrgId) -> Result<Vec<Invitation>, DbError>;
	async fn find_pending_by_email(
		&self,
		org_id: &OrgId,
		email: &str,
	) -> Result<Option<Invitation>, DbError>;
	async fn cancel_invitation(&self, id: &InvitationId) -> Result<(), DbError>;
	async fn resend_invitation(&self, id: &InvitationId) -> Result<Invitation, DbError>;
	async fn accept_invitation(
		&self,
		id: &InvitationId,
		user_id: &UserId,
		now: DateTime<Utc>,
	) -> Result<OrgMembership, DbError>;
	async fn expire_stale_invitations(&self, now: DateTime<Utc>) -> Result<u64, DbError>;
}

/// Repository for invitation database operations.
#[derive(Clone)]
pub struct InvitationRepository {
	pool: SqlitePool,
}

impl InvitationRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	fn row_to_invitation(&self, row: &sqlx::sqlite::SqliteRow) -> Result<Invitation, DbError> {
		let id_str: String = row.get("id");
		let org_id_str: String = row.get("org_id");
		let inviter_id_str: String = row.get("inviter_id");
		let status_str: String = row.get("status");
		let expires_at: String = row.get("expires_at");
		let created_at: String = row.get("created_at");

		let id = Uuid::parse_str(&id_str)
			.map_err(|e| DbError::Internal(format!("Invalid invitation ID: {e}")))?;
		let org_id = Uuid::parse_str(&org_id_str)
			.map_err(|e| DbError::Internal(format!("Invalid org_id: {e}")))?;
		let inviter_id = Uuid::parse_str(&inviter_id_str)
			.map_err(|e| DbError::Internal(format!("Invalid inviter_id: {e}")))?;
		let status = status_str
			.parse::<InvitationStatus>()
			.map_err(|e| DbError::Internal(format!("Invalid status: {e}")))?;

		Ok(Invitation {
			id: InvitationId::new(id),
			org_id: OrgId::new(org_id),
			email: row.get("email"),
			role: row.get("role"),
			inviter_id: UserId::new(inviter_id),
			status,
			expires_at: chrono::DateTime::parse_from_rfc3339(&expires_at)
				.map_err(|e| DbError::Internal(format!("Invalid expires_at: {e}")))?
				.with_timezone(&Utc),
			created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
				.map_err(|e| DbError::Internal(format!("Invalid created_at: {e}")))?
				.with_timezone(&Utc),
		})
	}
}

#[async_trait]
impl InvitationStore for InvitationRepository {
	#[tracing::instrument(skip(self, invitation), fields(invitation_id = %invitation.id, org_id = %invitation.org_id))]
	async fn create_invitation(&self, invitation: &Invitation) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO invitations (id, org_id, email, role, inviter_id, status, expires_at, created_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(invitation.id.to_string())
		.bind(invitation.org_id.to_string())
		.bind(&invitation.email)
		.bind(&invitation.role)
		.bind(invitation.inviter_id.to_string())
		.bind(invitation.status.to_string())
		.bind(invitation.expires_at.to_rfc3339())
		.bind(invitation.created_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(invitation_id = %invitation.id, "invitation created");
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(invitation_id = %id))]
	async fn get_invitation(&self, id: &InvitationId) -> Result<Option<Invitation>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, org_id, email, role, inviter_id, status, expires_at, created_at
			FROM invitations
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_invitation(&r)).transpose()
	}

	/// List pending invitations for an organization, newest first.
	#[tracing::instrument(skip(self), fields(org_id = %org_id))]
	async fn list_pending_invitations(&self, org_id: &OrgId) -> Result<Vec<Invitation>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, org_id, email, role, inviter_id, status, expires_at, created_at
			FROM invitations
			WHERE org_id = ? AND status = 'pending'
			ORDER BY created_at DESC
			"#,
		)
		.bind(org_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(|r| self.row_to_invitation(r)).collect()
	}

	/// Find a pending invitation for an email address in an organization.
	///
	/// Used to reject duplicate invitations before creating a new one.
	#[tracing::instrument(skip(self), fields(org_id = %org_id))]
	async fn find_pending_by_email(
		&self,
		org_id: &OrgId,
		email: &str,
	) -> Result<Option<Invitation>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, org_id, email, role, inviter_id, status, expires_at, created_at
			FROM invitations
			WHERE org_id = ? AND email = ? AND status = 'pending'
			"#,
		)
		.bind(org_id.to_string())
		.bind(email)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| self.row_to_invitation(&r)).transpose()
	}

	/// Cancel a pending invitation.
	///
	/// # Errors
	/// Returns `DbError::NotFound` if the invitation does not exist or is
	/// no longer pending.
	#[tracing::instrument(skip(self), fields(invitation_id = %id))]
	async fn cancel_invitation(&self, id: &InvitationId) -> Result<(), DbError> {
		let result =
			sqlx::query("UPDATE invitations SET status = 'cancelled' WHERE id = ? AND status = 'pending'")
				.bind(id.to_string())
				.execute(&self.pool)
				.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("pending invitation {id}")));
		}

		tracing::debug!(invitation_id = %id, "invitation cancelled");
		Ok(())
	}

	/// Reset a pending invitation's expiry to a fresh window.
	///
	/// # Errors
	/// Returns `DbError::NotFound` if the invitation does not exist or is
	/// no longer pending.
	#[tracing::instrument(skip(self), fields(invitation_id = %id))]
	async fn resend_invitation(&self, id: &InvitationId) -> Result<Invitation, DbError> {
		let new_expiry = (Utc::now() + Duration::hours(INVITATION_EXPIRY_HOURS)).to_rfc3339();
		let result =
			sqlx::query("UPDATE invitations SET expires_at = ? WHERE id = ? AND status = 'pending'")
				.bind(&new_expiry)
				.bind(id.to_string())
				.execute(&self.pool)
				.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("pending invitation {id}")));
		}

		let invitation = self
			.get_invitation(id)
			.await?
			.ok_or_else(|| DbError::NotFound(format!("invitation {id}")))?;

		tracing::debug!(invitation_id = %id, "invitation resent");
		Ok(invitation)
	}

	/// Accept an invitation and create the membership in one transaction.
	///
	/// # Errors
	/// - `DbError::NotFound` if the invitation does not exist or is not pending
	/// - `DbError::InvitationExpired` if the expiry deadline has passed
	/// - `DbError::Conflict` if the user is already a member
	#[tracing::instrument(skip(self), fields(invitation_id = %id, user_id = %user_id))]
	async fn accept_invitation(
		&self,
		id: &InvitationId,
		user_id: &UserId,
		now: DateTime<Utc>,
	) -> Result<OrgMembership, DbError> {
		let mut tx = self.pool.begin().await?;

		let row = sqlx::query(
			r#"
			SELECT id, org_id, email, role, inviter_id, status, expires_at, created_at
			FROM invitations
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&mut *tx)
		.await?;

		let invitation = row
			.map(|r| self.row_to_invitation(&r))
			.transpose()?
			.ok_or_else(|| DbError::NotFound(format!("invitation {id}")))?;

		if !invitation.status.is_pending() {
			return Err(DbError::NotFound(format!("pending invitation {id}")));
		}
		if invitation.is_expired(now) {
			// Mark it so later reads see the terminal state.
			sqlx::query("UPDATE invitations SET status = 'expired' WHERE id = ?")
				.bind(id.to_string())
				.execute(&mut *tx)
				.await?;
			tx.commit().await?;
			return Err(DbError::InvitationExpired);
		}

		sqlx::query("UPDATE invitations SET status = 'accepted' WHERE id = ?")
			.bind(id.to_string())
			.execute(&mut *tx)
			.await?;

		let membership = OrgMembership::new(invitation.org_id, *user_id, &invitation.role);
		sqlx::query(
			r#"
			INSERT INTO org_memberships (id, org_id, user_id, role, created_at)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(membership.id.to_string())
		.bind(membership.org_id.to_string())
		.bind(membership.user_id.to_string())
		.bind(&membership.role)
		.bind(membership.created_at.to_rfc3339())
		.execute(&mut *tx)
		.await?;

		tx.commit().await?;

		tracing::info!(invitation_id = %id, org_id = %membership.org_id, user_id = %user_id, "invitation accepted");
		Ok(membership)
	}

	/// Flip pending invitations past their deadline to expired.
	#[tracing::instrument(skip(self))]
	async fn expire_stale_invitations(&self, now: DateTime<Utc>) -> Result<u64, DbError> {
		let result = sqlx::query(
			"UPDATE invitations SET status = 'expired' WHERE status = 'pending' AND expires_at <= ?",
		)
		.bind(now.to_rfc3339())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() > 0 {
			tracing::debug!(count = result.rows_affected(), "stale invitations expired");
		}
		Ok(result.rows_affected())
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
	async fn create_and_list_pending() {
		let pool = create_test_pool().await;
		let inviter = seed_user(&pool, "inviter@example.com").await;
		let org = seed_org(&pool, "inv").await;
		let repo = InvitationRepository::new(pool);

		let inv = Invitation::new(org.id, "new@example.com", "member", inviter);
		repo.create_invitation(&inv).await.unwrap();

		let pending = repo.list_pending_invitations(&org.id).await.unwrap();
		assert_eq!(pending.len(), 1);
		assert_eq!(pending[0].email, "new@example.com");

		let found = repo
			.find_pending_by_email(&org.id, "new@example.com")
			.await
			.unwrap();
		assert!(found.is_some());
	}

	#[tokio::test]
	async fn cancelled_invitation_leaves_pending_list() {
		let pool = create_test_pool().await;
		let inviter = seed_user(&pool, "i2@example.com").await;
		let org = seed_org(&pool, "cancel").await;
		let repo = InvitationRepository::new(pool);

		let inv = Invitation::new(org.id, "x@example.com", "member", inviter);
		repo.create_invitation(&inv).await.unwrap();
		repo.cancel_invitation(&inv.id).await.unwrap();

		assert!(repo.list_pending_invitations(&org.id).await.unwrap().is_empty());
		let stored = repo.get_invitation(&inv.id).await.unwrap().unwrap();
		assert_eq!(stored.status, InvitationStatus::Cancelled);

		// A second cancel finds nothing pending.
		let err = repo.cancel_invitation(&inv.id).await.unwrap_err();
		assert!(matches!(err, DbError::NotFound(_)));
	}

	#[tokio::test]
	async fn resend_extends_expiry() {
		let pool = create_test_pool().await;
		let inviter = seed_user(&pool, "i3@example.com").await;
		let org = seed_org(&pool, "resend").await;
		let repo = InvitationRepository::new(pool);

		let mut inv = Invitation::new(org.id, "slow@example.com", "member", inviter);
		inv.expires_at = Utc::now() + Duration::hours(1);
		repo.create_invitation(&inv).await.unwrap();

		let resent = repo.resend_invitation(&inv.id).await.unwrap();
		assert!(resent.expires_at > inv.expires_at);
		assert_eq!(resent.status, InvitationStatus::Pending);
	}

	#[tokio::test]
	async fn accept_creates_membership_and_flips_status() {
		let pool = create_test_pool().await;
		let inviter = seed_user(&pool, "i4@example.com").await;
		let invitee = seed_user(&pool, "joiner@example.com").await;
		let org = seed_org(&pool, "join").await;
		let repo = InvitationRepository::new(pool.clone());

		let inv = Invitation::new(org.id, "joiner@example.com", "moderator", inviter);
		repo.create_invitation(&inv).await.unwrap();

		let membership = repo
			.accept_invitation(&inv.id, &invitee, Utc::now())
			.await
			.unwrap();
		assert_eq!(membership.role, "moderator");
		assert_eq!(membership.org_id, org.id);

		let stored = repo.get_invitation(&inv.id).await.unwrap().unwrap();
		assert_eq!(stored.status, InvitationStatus::Accepted);

		let orgs = OrgRepository::new(pool);
		assert!(orgs.get_membership(&org.id, &invitee).await.unwrap().is_some());
	}

	#[tokio::test]
	async fn accept_expired_fails_and_marks_expired() {
		let pool = create_test_pool().await;
		let inviter = seed_user(&pool, "i5@example.com").await;
		let invitee = seed_user(&pool, "late@example.com").await;
		let org = seed_org(&pool, "late").await;
		let repo = InvitationRepository::new(pool.clone());

		let mut inv = Invitation::new(org.id, "late@example.com", "member", inviter);
		inv.expires_at = Utc::now() - Duration::hours(1);
		repo.create_invitation(&inv).await.unwrap();

		let err = repo
			.accept_invitation(&inv.id, &invitee, Utc::now())
			.await
			.unwrap_err();
		assert!(matches!(err, DbError::InvitationExpired));

		let stored = repo.get_invitation(&inv.id).await.unwrap().unwrap();
		assert_eq!(stored.status, InvitationStatus::Expired);

		// No membership was created.
		let orgs = OrgRepository::new(pool);
		assert!(orgs.get_membership(&org.id, &invitee).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn accept_when_already_member_rolls_back() {
		let pool = create_test_pool().await;
		let inviter = seed_user(&pool, "i6@example.com").await;
		let invitee = seed_user(&pool, "dup@example.com").await;
		let org = seed_org(&pool, "dupinv").await;
		let orgs = OrgRepository::new(pool.clone());
		orgs.add_member(&org.id, &invitee, "member").await.unwrap();

		let repo = InvitationRepository::new(pool);
		let inv = Invitation::new(org.id, "dup@example.com", "member", inviter);
		repo.create_invitation(&inv).await.unwrap();

		let err = repo
			.accept_invitation(&inv.id, &invitee, Utc::now())
			.await
			.unwrap_err();
		assert!(err.is_conflict());

		// Status flip did not commit.
		let stored = repo.get_invitation(&inv.id).await.unwrap().unwrap();
		assert_eq!(stored.status, InvitationStatus::Pending);
	}

	#[tokio::test]
	async fn expire_stale_sweeps_past_deadline() {
		let pool = create_test_pool().await;
		let inviter = seed_user(&pool, "i7@example.com").await;
		let org = seed_org(&pool, "sweep").await;
		let repo = InvitationRepository::new(pool);

		let mut stale = Invitation::new(org.id, "old@example.com", "member", inviter);
		stale.expires_at = Utc::now() - Duration::hours(2);
		repo.create_invitation(&stale).await.unwrap();
		let fresh = Invitation::new(org.id, "fresh@example.com", "member", inviter);
		repo.create_invitation(&fresh).await.unwrap();

		let swept = repo.expire_stale_invitations(Utc::now()).await.unwrap();
		assert_eq!(swept, 1);
		assert_eq!(repo.list_pending_invitations(&org.id).await.unwrap().len(), 1);
	}
}
