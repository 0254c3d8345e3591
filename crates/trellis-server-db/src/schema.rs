// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Schema initialization.
//!
//! All IDs are UUIDs stored as TEXT; timestamps are RFC 3339 TEXT. Statements
//! are idempotent so startup can run them unconditionally.

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

const SCHEMA: &[&str] = &[
	r#"
	CREATE TABLE IF NOT EXISTS users (
		id TEXT PRIMARY KEY,
		display_name TEXT NOT NULL,
		email TEXT NOT NULL UNIQUE,
		password_hash TEXT,
		system_role TEXT NOT NULL DEFAULT 'user',
		banned INTEGER NOT NULL DEFAULT 0,
		ban_reason TEXT,
		ban_expires_at TEXT,
		created_at TEXT NOT NULL,
		updated_at TEXT NOT NULL,
		deleted_at TEXT
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS sessions (
		id TEXT PRIMARY KEY,
		user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
		token_hash TEXT NOT NULL UNIQUE,
		active_org_id TEXT,
		active_team_id TEXT,
		impersonated_by TEXT,
		ip_address TEXT,
		user_agent TEXT,
		expires_at TEXT NOT NULL,
		created_at TEXT NOT NULL,
		revoked_at TEXT
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS organizations (
		id TEXT PRIMARY KEY,
		name TEXT NOT NULL,
		slug TEXT NOT NULL UNIQUE,
		created_at TEXT NOT NULL,
		updated_at TEXT NOT NULL,
		deleted_at TEXT
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS org_memberships (
		id TEXT PRIMARY KEY,
		org_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
		user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
		role TEXT NOT NULL,
		created_at TEXT NOT NULL,
		UNIQUE(org_id, user_id)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS invitations (
		id TEXT PRIMARY KEY,
		org_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
		email TEXT NOT NULL,
		role TEXT NOT NULL,
		inviter_id TEXT NOT NULL REFERENCES users(id),
		status TEXT NOT NULL DEFAULT 'pending',
		expires_at TEXT NOT NULL,
		created_at TEXT NOT NULL
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS teams (
		id TEXT PRIMARY KEY,
		org_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
		name TEXT NOT NULL,
		created_at TEXT NOT NULL,
		updated_at TEXT NOT NULL,
		UNIQUE(org_id, name)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS team_memberships (
		team_id TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
		user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
		created_at TEXT NOT NULL,
		PRIMARY KEY(team_id, user_id)
	)
	"#,
	r#"
	CREATE TABLE IF NOT EXISTS org_roles (
		id TEXT PRIMARY KEY,
		org_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
		name TEXT NOT NULL,
		permissions TEXT NOT NULL,
		description TEXT,
		color TEXT NOT NULL,
		level INTEGER NOT NULL DEFAULT 0,
		is_system_role INTEGER NOT NULL DEFAULT 0,
		created_at TEXT NOT NULL,
		updated_at TEXT NOT NULL,
		UNIQUE(org_id, name)
	)
	"#,
	r#"
	CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id)
	"#,
	r#"
	CREATE INDEX IF NOT EXISTS idx_memberships_user ON org_memberships(user_id)
	"#,
	r#"
	CREATE INDEX IF NOT EXISTS idx_invitations_org ON invitations(org_id, status)
	"#,
];

/// Create all tables and indexes if they do not exist.
#[tracing::instrument(skip(pool))]
pub async fn init_schema(pool: &SqlitePool) -> Result<(), DbError> {
	for statement in SCHEMA {
		sqlx::query(statement).execute(pool).await?;
	}
	tracing::debug!("database schema initialized");
	Ok(())
}
