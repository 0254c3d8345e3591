// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Database error taxonomy.
//!
//! Conflict detection is typed: unique-constraint violations are recognized
//! through the driver's error kind, never by matching on message text.

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(sqlx::Error),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Conflict: {0}")]
	Conflict(String),

	#[error("Organization already has {limit} custom roles")]
	RoleLimitExceeded { limit: usize },

	#[error("Invitation has expired")]
	InvitationExpired,

	#[error("Organization must retain at least one owner")]
	LastOwner,

	#[error("Internal: {0}")]
	Internal(String),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

impl From<sqlx::Error> for DbError {
	fn from(e: sqlx::Error) -> Self {
		if let Some(db_err) = e.as_database_error() {
			if db_err.is_unique_violation() {
				return DbError::Conflict(db_err.message().to_string());
			}
		}
		DbError::Sqlx(e)
	}
}

impl DbError {
	/// Returns true if this error is a uniqueness conflict.
	pub fn is_conflict(&self) -> bool {
		matches!(self, DbError::Conflict(_))
	}
}

pub type Result<T> = std::result::Result<T, DbError>;
