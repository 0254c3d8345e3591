// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Role definitions: built-in grant sets and custom organization roles.
//!
//! Three built-in roles exist, fixed at compile time and immutable:
//!
//! - `owner` — full control of the organization, including deleting it and
//!   managing custom roles.
//! - `moderator` — management rights short of deleting the organization or
//!   touching access control. Named `moderator` (not `admin`) to avoid
//!   confusion with the platform-wide system admin role.
//! - `member` — read-mostly access plus ticket creation.
//!
//! Custom roles are created at runtime per organization, persisted with
//! metadata (description, color, sort level, system-role flag) and subject
//! to a per-organization cap. Their grants are validated against the
//! statement at parse time; unknown names fail closed.

use crate::statement::{Action, Resource, UnknownAction, UnknownResource};
use crate::types::{OrgId, RoleId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Maximum number of custom roles a single organization may define.
pub const MAX_CUSTOM_ROLES_PER_ORG: usize = 10;

/// Default UI color assigned to new custom roles.
pub const DEFAULT_ROLE_COLOR: &str = "#6366f1";

// =============================================================================
// Role Grants
// =============================================================================

/// The set of resource/action grants held by a role.
///
/// Serializes as a `{resource: [actions]}` object, which is also the
/// persisted format for custom role permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleGrants(BTreeMap<Resource, BTreeSet<Action>>);

impl RoleGrants {
	/// Creates an empty grant set.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder: grant `actions` on `resource`.
	pub fn grant(mut self, resource: Resource, actions: &[Action]) -> Self {
		self
			.0
			.entry(resource)
			.or_default()
			.extend(actions.iter().copied());
		self
	}

	/// Returns true if `action` is granted on `resource`.
	pub fn allows(&self, resource: Resource, action: Action) -> bool {
		self
			.0
			.get(&resource)
			.map(|actions| actions.contains(&action))
			.unwrap_or(false)
	}

	/// Returns true if every action in `actions` is granted on `resource`.
	///
	/// An empty action list is vacuously allowed.
	pub fn allows_all(&self, resource: Resource, actions: &[Action]) -> bool {
		actions.iter().all(|a| self.allows(resource, *a))
	}

	/// Returns true if no grants are held.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterates over (resource, granted actions) pairs.
	pub fn iter(&self) -> impl Iterator<Item = (&Resource, &BTreeSet<Action>)> {
		self.0.iter()
	}

	/// Validates every grant against the statement.
	///
	/// A grant naming an action the statement does not declare for that
	/// resource (e.g. `member:archive`) is invalid.
	pub fn validate(&self) -> Result<(), GrantParseError> {
		for (resource, actions) in &self.0 {
			for action in actions {
				if !resource.declares(*action) {
					return Err(GrantParseError::ActionNotInStatement {
						resource: *resource,
						action: *action,
					});
				}
			}
		}
		Ok(())
	}

	/// Parses grants from a string-keyed permission map, failing closed.
	///
	/// This is the boundary where persisted custom-role permissions (and any
	/// client-supplied permission maps) enter the typed world: an unknown
	/// resource name, an unknown action name, or an action outside the
	/// statement for its resource is an error, never a silent skip.
	pub fn parse(raw: &BTreeMap<String, Vec<String>>) -> Result<Self, GrantParseError> {
		let mut grants = RoleGrants::new();
		for (resource_name, action_names) in raw {
			let resource = Resource::from_str(resource_name)?;
			let entry = grants.0.entry(resource).or_default();
			for action_name in action_names {
				let action = Action::from_str(action_name)?;
				if !resource.declares(action) {
					return Err(GrantParseError::ActionNotInStatement { resource, action });
				}
				entry.insert(action);
			}
		}
		Ok(grants)
	}

	/// Parses grants from a JSON value holding a `{resource: [actions]}` map.
	pub fn parse_json(value: &serde_json::Value) -> Result<Self, GrantParseError> {
		let raw: BTreeMap<String, Vec<String>> = serde_json::from_value(value.clone())
			.map_err(|e| GrantParseError::InvalidShape(e.to_string()))?;
		Self::parse(&raw)
	}
}

/// Error parsing or validating a permission grant map. Always a denial.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrantParseError {
	#[error(transparent)]
	UnknownResource(#[from] UnknownResource),

	#[error(transparent)]
	UnknownAction(#[from] UnknownAction),

	#[error("action '{action}' is not in the statement for resource '{resource}'")]
	ActionNotInStatement { resource: Resource, action: Action },

	#[error("permission map has invalid shape: {0}")]
	InvalidShape(String),
}

// =============================================================================
// Built-in Organization Roles
// =============================================================================

/// Built-in roles within an organization.
///
/// These are compile-time fixed; organizations additionally define custom
/// roles by name (see [`RoleDefinition`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgRole {
	/// Full organization control, including delete and custom roles.
	Owner,
	/// Management rights short of deleting the org or editing roles.
	Moderator,
	/// Standard read-mostly membership.
	Member,
}

impl OrgRole {
	/// Returns all built-in organization roles.
	pub fn all() -> &'static [OrgRole] {
		&[OrgRole::Owner, OrgRole::Moderator, OrgRole::Member]
	}

	/// Hierarchy level for sorting: owner > moderator > member.
	pub fn level(&self) -> i64 {
		match self {
			OrgRole::Owner => 3,
			OrgRole::Moderator => 2,
			OrgRole::Member => 1,
		}
	}

	/// Returns true if this role sits at or above `other` in the hierarchy.
	pub fn has_permission_of(&self, other: &OrgRole) -> bool {
		self.level() >= other.level()
	}

	/// The immutable grant set for this built-in role.
	pub fn grants(&self) -> &'static RoleGrants {
		match self {
			OrgRole::Owner => &OWNER_GRANTS,
			OrgRole::Moderator => &MODERATOR_GRANTS,
			OrgRole::Member => &MEMBER_GRANTS,
		}
	}
}

impl fmt::Display for OrgRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OrgRole::Owner => write!(f, "owner"),
			OrgRole::Moderator => write!(f, "moderator"),
			OrgRole::Member => write!(f, "member"),
		}
	}
}

impl FromStr for OrgRole {
	type Err = crate::types::UnknownRole;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"owner" => Ok(OrgRole::Owner),
			"moderator" => Ok(OrgRole::Moderator),
			"member" => Ok(OrgRole::Member),
			other => Err(crate::types::UnknownRole(other.to_string())),
		}
	}
}

static OWNER_GRANTS: LazyLock<RoleGrants> = LazyLock::new(|| {
	RoleGrants::new()
		.grant(
			Resource::Organization,
			&[
				Action::Update,
				Action::Delete,
				Action::ManageSettings,
				Action::ViewAnalytics,
			],
		)
		.grant(
			Resource::Member,
			&[
				Action::Create,
				Action::Update,
				Action::Delete,
				Action::UpdateRole,
				Action::View,
			],
		)
		.grant(
			Resource::Invitation,
			&[Action::Create, Action::Cancel, Action::Resend, Action::View],
		)
		.grant(
			Resource::Team,
			&[
				Action::Create,
				Action::Update,
				Action::Delete,
				Action::View,
				Action::ManageMembers,
			],
		)
		.grant(
			Resource::Project,
			&[
				Action::Create,
				Action::Update,
				Action::Delete,
				Action::View,
				Action::Share,
				Action::Archive,
			],
		)
		.grant(
			Resource::Billing,
			&[Action::View, Action::Update, Action::Manage, Action::Export],
		)
		.grant(
			Resource::Tickets,
			&[
				Action::Create,
				Action::Update,
				Action::Delete,
				Action::View,
				Action::Assign,
			],
		)
		.grant(
			Resource::AccessControl,
			&[Action::Create, Action::Update, Action::Delete, Action::View],
		)
});

static MODERATOR_GRANTS: LazyLock<RoleGrants> = LazyLock::new(|| {
	RoleGrants::new()
		.grant(
			Resource::Organization,
			&[Action::Update, Action::ManageSettings, Action::ViewAnalytics],
		)
		.grant(
			Resource::Member,
			&[Action::Create, Action::Update, Action::Delete, Action::View],
		)
		.grant(
			Resource::Invitation,
			&[Action::Create, Action::Cancel, Action::Resend, Action::View],
		)
		.grant(
			Resource::Team,
			&[
				Action::Create,
				Action::Update,
				Action::Delete,
				Action::View,
				Action::ManageMembers,
			],
		)
		.grant(
			Resource::Project,
			&[
				Action::Create,
				Action::Update,
				Action::Delete,
				Action::View,
				Action::Share,
				Action::Archive,
			],
		)
		.grant(
			Resource::Billing,
			&[Action::View, Action::Update, Action::Export],
		)
		.grant(
			Resource::Tickets,
			&[
				Action::Create,
				Action::Update,
				Action::Delete,
				Action::View,
				Action::Assign,
			],
		)
});

static MEMBER_GRANTS: LazyLock<RoleGrants> = LazyLock::new(|| {
	RoleGrants::new()
		.grant(Resource::Organization, &[Action::ViewAnalytics])
		.grant(Resource::Member, &[Action::View])
		.grant(Resource::Team, &[Action::View])
		.grant(Resource::Project, &[Action::View])
		.grant(Resource::Billing, &[Action::View])
		.grant(Resource::Tickets, &[Action::Create, Action::View])
});

// =============================================================================
// Custom Roles
// =============================================================================

/// A custom role defined at runtime within one organization.
///
/// Custom roles layer on top of the built-in definitions without modifying
/// them; a member's `role` column may name either kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleDefinition {
	pub id: RoleId,
	pub org_id: OrgId,
	pub name: String,
	pub grants: RoleGrants,
	pub description: Option<String>,
	pub color: String,
	pub level: i64,
	/// System roles are managed by the platform and cannot be deleted.
	pub is_system_role: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl RoleDefinition {
	/// Creates a new custom role with default metadata.
	pub fn new(org_id: OrgId, name: impl Into<String>, grants: RoleGrants) -> Self {
		let now = Utc::now();
		Self {
			id: RoleId::generate(),
			org_id,
			name: name.into(),
			grants,
			description: None,
			color: DEFAULT_ROLE_COLOR.to_string(),
			level: 0,
			is_system_role: false,
			created_at: now,
			updated_at: now,
		}
	}
}

/// Returns true if `name` collides with a built-in role name.
///
/// Custom roles must not shadow `owner`, `moderator` or `member`; the member
/// role column disambiguates purely by name.
pub fn is_builtin_role_name(name: &str) -> bool {
	OrgRole::from_str(name).is_ok()
}

#[cfg(test)]
mod tests {
	use super::*;

	mod grants {
		use super::*;

		#[test]
		fn empty_grants_allow_nothing() {
			let grants = RoleGrants::new();
			assert!(!grants.allows(Resource::Team, Action::View));
			assert!(grants.is_empty());
		}

		#[test]
		fn granted_action_is_allowed() {
			let grants = RoleGrants::new().grant(Resource::Team, &[Action::View]);
			assert!(grants.allows(Resource::Team, Action::View));
			assert!(!grants.allows(Resource::Team, Action::Delete));
			assert!(!grants.allows(Resource::Project, Action::View));
		}

		#[test]
		fn allows_all_requires_every_action() {
			let grants = RoleGrants::new().grant(Resource::Team, &[Action::View, Action::Update]);
			assert!(grants.allows_all(Resource::Team, &[Action::View]));
			assert!(grants.allows_all(Resource::Team, &[Action::View, Action::Update]));
			assert!(!grants.allows_all(Resource::Team, &[Action::View, Action::Delete]));
		}

		#[test]
		fn empty_action_list_is_vacuously_allowed() {
			let grants = RoleGrants::new();
			assert!(grants.allows_all(Resource::Team, &[]));
		}

		#[test]
		fn serializes_as_permission_map() {
			let grants = RoleGrants::new().grant(Resource::Team, &[Action::ManageMembers]);
			let json = serde_json::to_value(&grants).unwrap();
			assert_eq!(json, serde_json::json!({ "team": ["manage-members"] }));
		}
	}

	mod parsing {
		use super::*;

		fn raw(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
			entries
				.iter()
				.map(|(r, actions)| {
					(
						r.to_string(),
						actions.iter().map(|a| a.to_string()).collect(),
					)
				})
				.collect()
		}

		#[test]
		fn parses_valid_grant_map() {
			let grants =
				RoleGrants::parse(&raw(&[("team", &["view", "manage-members"]), ("ac", &["view"])]))
					.unwrap();
			assert!(grants.allows(Resource::Team, Action::ManageMembers));
			assert!(grants.allows(Resource::AccessControl, Action::View));
		}

		#[test]
		fn unknown_resource_fails_closed() {
			let err = RoleGrants::parse(&raw(&[("workspace", &["view"])])).unwrap_err();
			assert!(matches!(err, GrantParseError::UnknownResource(_)));
		}

		#[test]
		fn unknown_action_fails_closed() {
			let err = RoleGrants::parse(&raw(&[("team", &["fly"])])).unwrap_err();
			assert!(matches!(err, GrantParseError::UnknownAction(_)));
		}

		#[test]
		fn action_outside_statement_fails_closed() {
			// "archive" is a real action, but not one the statement declares
			// for members.
			let err = RoleGrants::parse(&raw(&[("member", &["archive"])])).unwrap_err();
			assert_eq!(
				err,
				GrantParseError::ActionNotInStatement {
					resource: Resource::Member,
					action: Action::Archive,
				}
			);
		}

		#[test]
		fn parse_json_rejects_non_map_shapes() {
			let err = RoleGrants::parse_json(&serde_json::json!(["team"])).unwrap_err();
			assert!(matches!(err, GrantParseError::InvalidShape(_)));
		}

		#[test]
		fn parse_json_roundtrips_serialized_grants() {
			let grants = OrgRole::Moderator.grants().clone();
			let json = serde_json::to_value(&grants).unwrap();
			assert_eq!(RoleGrants::parse_json(&json).unwrap(), grants);
		}
	}

	mod builtin_roles {
		use super::*;

		#[test]
		fn hierarchy_levels() {
			assert_eq!(OrgRole::Owner.level(), 3);
			assert_eq!(OrgRole::Moderator.level(), 2);
			assert_eq!(OrgRole::Member.level(), 1);

			assert!(OrgRole::Owner.has_permission_of(&OrgRole::Moderator));
			assert!(OrgRole::Moderator.has_permission_of(&OrgRole::Member));
			assert!(!OrgRole::Member.has_permission_of(&OrgRole::Moderator));
		}

		#[test]
		fn owner_holds_the_full_statement() {
			let grants = OrgRole::Owner.grants();
			for resource in Resource::all() {
				for action in resource.valid_actions() {
					assert!(
						grants.allows(*resource, *action),
						"owner missing {resource}:{action}"
					);
				}
			}
		}

		#[test]
		fn moderator_cannot_delete_org_or_touch_access_control() {
			let grants = OrgRole::Moderator.grants();
			assert!(grants.allows(Resource::Organization, Action::Update));
			assert!(!grants.allows(Resource::Organization, Action::Delete));
			assert!(!grants.allows(Resource::Member, Action::UpdateRole));
			assert!(!grants.allows(Resource::Billing, Action::Manage));
			assert!(!grants.allows(Resource::AccessControl, Action::Create));
			assert!(!grants.allows(Resource::AccessControl, Action::View));
		}

		#[test]
		fn member_is_read_mostly() {
			let grants = OrgRole::Member.grants();
			assert!(grants.allows(Resource::Organization, Action::ViewAnalytics));
			assert!(grants.allows(Resource::Member, Action::View));
			assert!(grants.allows(Resource::Team, Action::View));
			assert!(grants.allows(Resource::Tickets, Action::Create));
			assert!(!grants.allows(Resource::Team, Action::ManageMembers));
			assert!(!grants.allows(Resource::Member, Action::Create));
			assert!(!grants.allows(Resource::Organization, Action::Update));
		}

		#[test]
		fn builtin_grants_are_statement_valid() {
			for role in OrgRole::all() {
				role.grants().validate().expect("builtin grants valid");
			}
		}

		#[test]
		fn role_names_roundtrip() {
			for role in OrgRole::all() {
				assert_eq!(role.to_string().parse::<OrgRole>().unwrap(), *role);
			}
			assert!("admin".parse::<OrgRole>().is_err());
		}
	}

	mod custom_roles {
		use super::*;

		#[test]
		fn new_role_has_default_metadata() {
			let role = RoleDefinition::new(
				OrgId::generate(),
				"support",
				RoleGrants::new().grant(Resource::Tickets, &[Action::View, Action::Assign]),
			);
			assert_eq!(role.color, DEFAULT_ROLE_COLOR);
			assert_eq!(role.level, 0);
			assert!(!role.is_system_role);
			assert!(role.description.is_none());
		}

		#[test]
		fn builtin_names_are_reserved() {
			assert!(is_builtin_role_name("owner"));
			assert!(is_builtin_role_name("moderator"));
			assert!(is_builtin_role_name("member"));
			assert!(!is_builtin_role_name("support"));
		}
	}
}
