// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for the Trellis server.
//!
//! Each domain area gets a store trait and a repository implementation over
//! a shared [`sqlx::SqlitePool`]:
//!
//! - [`user`] - user records, bans, system roles, password hashes
//! - [`session`] - session records, token lookup, impersonation
//! - [`org`] - organizations and memberships, including ownership transfer
//! - [`invitation`] - invitation lifecycle
//! - [`team`] - teams and team membership
//! - [`role`] - custom role definitions with persisted grants
//!
//! Conventions: IDs are UUID strings, timestamps are RFC 3339 TEXT, deletes
//! of users and organizations are soft. Uniqueness violations surface as
//! [`DbError::Conflict`] via the driver's error code, never by matching
//! message text.

pub mod error;
pub mod invitation;
pub mod org;
pub mod pool;
pub mod role;
pub mod schema;
pub mod session;
pub mod team;
pub mod testing;
pub mod user;

pub use error::{DbError, Result};
pub use invitation::{InvitationRepository, InvitationStore};
pub use org::{OrgRepository, OrgStore};
pub use pool::create_pool;
pub use role::{RoleRepository, RoleStore};
pub use schema::init_schema;
pub use session::{SessionRecord, SessionRepository, SessionStore};
pub use team::{TeamRepository, TeamStore};
pub use user::{UserRepository, UserStore};
