// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Pure permission evaluation.
//!
//! Evaluation is a lookup over a role's grant set with no I/O, no clock and
//! no ambient state. Callers resolve the subject's grants first (built-in
//! role or custom role loaded from storage) and then ask whether a
//! [`PermissionRequest`] is satisfied.
//!
//! Semantics:
//!
//! - A request may span multiple resources; **every** listed action on
//!   **every** listed resource must be granted (AND across the whole
//!   request).
//! - [`any_allowed`] answers the weaker question of whether at least one
//!   single-statement check in a list passes.
//! - Missing grants deny. There is no wildcard and no implicit inheritance.

use crate::roles::RoleGrants;
use crate::statement::{Action, Resource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A permission check request: actions required per resource.
///
/// On the wire this is the same `{resource: [actions]}` shape as a grant
/// map, e.g. `{"team": ["update", "manage-members"]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionRequest(BTreeMap<Resource, Vec<Action>>);

impl PermissionRequest {
	/// Creates an empty request.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder: require `actions` on `resource`.
	pub fn require(mut self, resource: Resource, actions: &[Action]) -> Self {
		self
			.0
			.entry(resource)
			.or_default()
			.extend(actions.iter().copied());
		self
	}

	/// Convenience constructor for a single resource/action pair.
	pub fn single(resource: Resource, action: Action) -> Self {
		Self::new().require(resource, &[action])
	}

	/// Returns true if the request names no actions at all.
	pub fn is_empty(&self) -> bool {
		self.0.values().all(|actions| actions.is_empty())
	}

	/// Iterates over (resource, required actions) pairs.
	pub fn iter(&self) -> impl Iterator<Item = (&Resource, &Vec<Action>)> {
		self.0.iter()
	}
}

/// Returns true if `grants` satisfies every statement in `request`.
///
/// An empty request is vacuously allowed; any single missing grant denies
/// the whole request.
pub fn is_allowed(grants: &RoleGrants, request: &PermissionRequest) -> bool {
	request
		.iter()
		.all(|(resource, actions)| grants.allows_all(*resource, actions))
}

/// Returns true if `grants` satisfies at least one of `requests`.
///
/// An empty request list denies: "any of nothing" is not a grant.
pub fn any_allowed(grants: &RoleGrants, requests: &[PermissionRequest]) -> bool {
	!requests.is_empty() && requests.iter().any(|request| is_allowed(grants, request))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::roles::OrgRole;
	use proptest::prelude::*;

	mod all_semantics {
		use super::*;

		#[test]
		fn empty_request_is_vacuously_allowed() {
			assert!(is_allowed(&RoleGrants::new(), &PermissionRequest::new()));
			assert!(is_allowed(OrgRole::Member.grants(), &PermissionRequest::new()));
		}

		#[test]
		fn single_granted_action_passes() {
			let request = PermissionRequest::single(Resource::Tickets, Action::Create);
			assert!(is_allowed(OrgRole::Member.grants(), &request));
		}

		#[test]
		fn single_missing_action_denies() {
			let request = PermissionRequest::single(Resource::Tickets, Action::Delete);
			assert!(!is_allowed(OrgRole::Member.grants(), &request));
		}

		#[test]
		fn one_missing_action_denies_the_whole_request() {
			// Member holds tickets:create and tickets:view but not tickets:assign.
			let request =
				PermissionRequest::new().require(Resource::Tickets, &[Action::Create, Action::Assign]);
			assert!(!is_allowed(OrgRole::Member.grants(), &request));
		}

		#[test]
		fn multi_resource_request_requires_all_resources() {
			let request = PermissionRequest::new()
				.require(Resource::Team, &[Action::View])
				.require(Resource::Billing, &[Action::Manage]);
			// Moderator can view teams but cannot manage billing.
			assert!(!is_allowed(OrgRole::Moderator.grants(), &request));
			assert!(is_allowed(OrgRole::Owner.grants(), &request));
		}

		#[test]
		fn unlisted_resource_denies() {
			let request = PermissionRequest::single(Resource::AccessControl, Action::View);
			assert!(!is_allowed(OrgRole::Moderator.grants(), &request));
		}
	}

	mod any_semantics {
		use super::*;

		#[test]
		fn empty_list_denies() {
			assert!(!any_allowed(OrgRole::Owner.grants(), &[]));
		}

		#[test]
		fn one_passing_request_is_enough() {
			let requests = [
				PermissionRequest::single(Resource::AccessControl, Action::View),
				PermissionRequest::single(Resource::Team, Action::View),
			];
			assert!(any_allowed(OrgRole::Member.grants(), &requests));
		}

		#[test]
		fn all_failing_requests_deny() {
			let requests = [
				PermissionRequest::single(Resource::AccessControl, Action::View),
				PermissionRequest::single(Resource::Organization, Action::Delete),
			];
			assert!(!any_allowed(OrgRole::Moderator.grants(), &requests));
		}
	}

	mod request_wire_format {
		use super::*;

		#[test]
		fn deserializes_permission_map() {
			let request: PermissionRequest =
				serde_json::from_value(serde_json::json!({ "team": ["update", "manage-members"] }))
					.unwrap();
			assert!(is_allowed(OrgRole::Moderator.grants(), &request));
			assert!(!is_allowed(OrgRole::Member.grants(), &request));
		}

		#[test]
		fn rejects_unknown_names() {
			let result: Result<PermissionRequest, _> =
				serde_json::from_value(serde_json::json!({ "team": ["fly"] }));
			assert!(result.is_err());

			let result: Result<PermissionRequest, _> =
				serde_json::from_value(serde_json::json!({ "workspace": ["view"] }));
			assert!(result.is_err());
		}
	}

	mod properties {
		use super::*;

		fn arb_resource() -> impl Strategy<Value = Resource> {
			prop::sample::select(Resource::all().to_vec())
		}

		proptest! {
				#[test]
				fn owner_satisfies_any_statement_request(
						resource in arb_resource()
				) {
						for action in resource.valid_actions() {
								let request = PermissionRequest::single(resource, *action);
								prop_assert!(is_allowed(OrgRole::Owner.grants(), &request));
						}
				}

				#[test]
				fn higher_role_satisfies_lower_role_requests(
						resource in arb_resource()
				) {
						// Any request the member role passes, moderator and owner
						// pass too; same for moderator vs owner.
						for action in resource.valid_actions() {
								let request = PermissionRequest::single(resource, *action);
								if is_allowed(OrgRole::Member.grants(), &request) {
										prop_assert!(is_allowed(OrgRole::Moderator.grants(), &request));
								}
								if is_allowed(OrgRole::Moderator.grants(), &request) {
										prop_assert!(is_allowed(OrgRole::Owner.grants(), &request));
								}
						}
				}

				#[test]
				fn empty_grants_deny_every_statement(
						resource in arb_resource()
				) {
						let grants = RoleGrants::new();
						for action in resource.valid_actions() {
								let request = PermissionRequest::single(resource, *action);
								prop_assert!(!is_allowed(&grants, &request));
						}
				}
		}
	}
}
