// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The permission statement: which actions exist for which resources.
//!
//! The statement is the single source of truth for the permission
//! vocabulary. Every grant held by a role (built-in or custom) must name an
//! action that the statement declares for that resource; anything else is
//! rejected at parse time so that permission evaluation can stay a pure
//! lookup over closed enums.
//!
//! Naming convention on the wire is `<resource>:<action>` with kebab-case
//! action names (e.g. `organization:manage-settings`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A domain entity subject to access control.
///
/// The set is closed per deployment; unknown resource names fail closed at
/// the parsing boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
	Organization,
	Member,
	Invitation,
	Team,
	Project,
	Billing,
	Tickets,
	/// Access-control management (creating and editing custom roles).
	#[serde(rename = "ac")]
	AccessControl,
}

impl Resource {
	/// Returns all resources in statement order.
	pub fn all() -> &'static [Resource] {
		&[
			Resource::Organization,
			Resource::Member,
			Resource::Invitation,
			Resource::Team,
			Resource::Project,
			Resource::Billing,
			Resource::Tickets,
			Resource::AccessControl,
		]
	}

	/// Returns the actions the statement declares for this resource.
	pub fn valid_actions(&self) -> &'static [Action] {
		match self {
			Resource::Organization => &[
				Action::Update,
				Action::Delete,
				Action::ManageSettings,
				Action::ViewAnalytics,
			],
			Resource::Member => &[
				Action::Create,
				Action::Update,
				Action::Delete,
				Action::UpdateRole,
				Action::View,
			],
			Resource::Invitation => &[Action::Create, Action::Cancel, Action::Resend, Action::View],
			Resource::Team => &[
				Action::Create,
				Action::Update,
				Action::Delete,
				Action::View,
				Action::ManageMembers,
			],
			Resource::Project => &[
				Action::Create,
				Action::Update,
				Action::Delete,
				Action::View,
				Action::Share,
				Action::Archive,
			],
			Resource::Billing => &[Action::View, Action::Update, Action::Manage, Action::Export],
			Resource::Tickets => &[
				Action::Create,
				Action::Update,
				Action::Delete,
				Action::View,
				Action::Assign,
			],
			Resource::AccessControl => {
				&[Action::Create, Action::Update, Action::Delete, Action::View]
			}
		}
	}

	/// Returns true if the statement declares `action` for this resource.
	pub fn declares(&self, action: Action) -> bool {
		self.valid_actions().contains(&action)
	}
}

impl fmt::Display for Resource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Resource::Organization => "organization",
			Resource::Member => "member",
			Resource::Invitation => "invitation",
			Resource::Team => "team",
			Resource::Project => "project",
			Resource::Billing => "billing",
			Resource::Tickets => "tickets",
			Resource::AccessControl => "ac",
		};
		write!(f, "{s}")
	}
}

impl FromStr for Resource {
	type Err = UnknownResource;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"organization" => Ok(Resource::Organization),
			"member" => Ok(Resource::Member),
			"invitation" => Ok(Resource::Invitation),
			"team" => Ok(Resource::Team),
			"project" => Ok(Resource::Project),
			"billing" => Ok(Resource::Billing),
			"tickets" => Ok(Resource::Tickets),
			"ac" => Ok(Resource::AccessControl),
			other => Err(UnknownResource(other.to_string())),
		}
	}
}

/// Error for a resource name the statement does not declare.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resource: {0}")]
pub struct UnknownResource(pub String);

/// A verb that can be granted on a resource.
///
/// Actions share a single enum across resources; the statement scopes which
/// actions are meaningful for which resource (e.g. `Assign` exists only on
/// tickets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
	Create,
	Update,
	Delete,
	View,
	Manage,
	ManageSettings,
	ManageMembers,
	ViewAnalytics,
	UpdateRole,
	Cancel,
	Resend,
	Share,
	Archive,
	Export,
	Assign,
}

impl fmt::Display for Action {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Action::Create => "create",
			Action::Update => "update",
			Action::Delete => "delete",
			Action::View => "view",
			Action::Manage => "manage",
			Action::ManageSettings => "manage-settings",
			Action::ManageMembers => "manage-members",
			Action::ViewAnalytics => "view-analytics",
			Action::UpdateRole => "update-role",
			Action::Cancel => "cancel",
			Action::Resend => "resend",
			Action::Share => "share",
			Action::Archive => "archive",
			Action::Export => "export",
			Action::Assign => "assign",
		};
		write!(f, "{s}")
	}
}

impl FromStr for Action {
	type Err = UnknownAction;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"create" => Ok(Action::Create),
			"update" => Ok(Action::Update),
			"delete" => Ok(Action::Delete),
			"view" => Ok(Action::View),
			"manage" => Ok(Action::Manage),
			"manage-settings" => Ok(Action::ManageSettings),
			"manage-members" => Ok(Action::ManageMembers),
			"view-analytics" => Ok(Action::ViewAnalytics),
			"update-role" => Ok(Action::UpdateRole),
			"cancel" => Ok(Action::Cancel),
			"resend" => Ok(Action::Resend),
			"share" => Ok(Action::Share),
			"archive" => Ok(Action::Archive),
			"export" => Ok(Action::Export),
			"assign" => Ok(Action::Assign),
			other => Err(UnknownAction(other.to_string())),
		}
	}
}

/// Error for an action name the statement does not declare.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action: {0}")]
pub struct UnknownAction(pub String);

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn every_resource_declares_at_least_one_action() {
		for resource in Resource::all() {
			assert!(
				!resource.valid_actions().is_empty(),
				"{resource} has no actions"
			);
		}
	}

	#[test]
	fn statement_matches_vocabulary() {
		assert_eq!(Resource::Organization.valid_actions().len(), 4);
		assert_eq!(Resource::Member.valid_actions().len(), 5);
		assert_eq!(Resource::Invitation.valid_actions().len(), 4);
		assert_eq!(Resource::Team.valid_actions().len(), 5);
		assert_eq!(Resource::Project.valid_actions().len(), 6);
		assert_eq!(Resource::Billing.valid_actions().len(), 4);
		assert_eq!(Resource::Tickets.valid_actions().len(), 5);
		assert_eq!(Resource::AccessControl.valid_actions().len(), 4);
	}

	#[test]
	fn declares_rejects_out_of_scope_actions() {
		assert!(Resource::Team.declares(Action::ManageMembers));
		assert!(!Resource::Team.declares(Action::Assign));
		assert!(Resource::Tickets.declares(Action::Assign));
		assert!(!Resource::Member.declares(Action::Archive));
		assert!(!Resource::Organization.declares(Action::Create));
	}

	#[test]
	fn resource_roundtrips_through_strings() {
		for resource in Resource::all() {
			assert_eq!(
				resource.to_string().parse::<Resource>().unwrap(),
				*resource
			);
		}
	}

	#[test]
	fn access_control_uses_short_name() {
		assert_eq!(Resource::AccessControl.to_string(), "ac");
		assert_eq!("ac".parse::<Resource>().unwrap(), Resource::AccessControl);
		let json = serde_json::to_string(&Resource::AccessControl).unwrap();
		assert_eq!(json, "\"ac\"");
	}

	#[test]
	fn action_roundtrips_through_strings() {
		for resource in Resource::all() {
			for action in resource.valid_actions() {
				assert_eq!(action.to_string().parse::<Action>().unwrap(), *action);
			}
		}
	}

	#[test]
	fn action_serde_uses_kebab_case() {
		let json = serde_json::to_string(&Action::ManageSettings).unwrap();
		assert_eq!(json, "\"manage-settings\"");
		let back: Action = serde_json::from_str("\"update-role\"").unwrap();
		assert_eq!(back, Action::UpdateRole);
	}

	#[test]
	fn unknown_names_fail_closed() {
		assert!("workspace".parse::<Resource>().is_err());
		assert!("impersonate".parse::<Action>().is_err());
	}
}
