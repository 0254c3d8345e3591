// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core event types for audit logging.
//!
//! This module provides the foundational types for the audit system:
//!
//! - [`AuditEventType`]: Enumeration of all auditable events
//! - [`AuditSeverity`]: RFC 5424-compatible severity levels
//! - [`AuditLogEntry`]: Complete audit record with correlation IDs
//! - [`AuditLogBuilder`]: Fluent API for constructing entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use trellis_server_auth::UserId;
use uuid::Uuid;

/// Default retention period for audit logs in days.
pub const DEFAULT_AUDIT_RETENTION_DAYS: i64 = 90;

/// Types of events that can be recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
	// Session events
	SessionCreated,
	SessionRevoked,
	SessionExpired,

	// Access control events
	AccessGranted,
	AccessDenied,

	// Organization events
	OrgCreated,
	OrgUpdated,
	OrgDeleted,
	OwnershipTransferred,
	MemberAdded,
	MemberRemoved,
	MemberRoleChanged,

	// Invitation events
	InvitationCreated,
	InvitationCancelled,
	InvitationResent,
	InvitationAccepted,

	// Team events
	TeamCreated,
	TeamUpdated,
	TeamDeleted,
	TeamMemberAdded,
	TeamMemberRemoved,

	// Custom role events
	RoleCreated,
	RoleUpdated,
	RoleDeleted,

	// Admin events
	UserCreated,
	UserUpdated,
	UserRemoved,
	UserPasswordSet,
	SystemRoleChanged,
	UserBanned,
	UserUnbanned,
	ImpersonationStarted,
	ImpersonationEnded,
}

impl fmt::Display for AuditEventType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			// Session events
			AuditEventType::SessionCreated => "session_created",
			AuditEventType::SessionRevoked => "session_revoked",
			AuditEventType::SessionExpired => "session_expired",

			// Access control events
			AuditEventType::AccessGranted => "access_granted",
			AuditEventType::AccessDenied => "access_denied",

			// Organization events
			AuditEventType::OrgCreated => "org_created",
			AuditEventType::OrgUpdated => "org_updated",
			AuditEventType::OrgDeleted => "org_deleted",
			AuditEventType::OwnershipTransferred => "ownership_transferred",
			AuditEventType::MemberAdded => "member_added",
			AuditEventType::MemberRemoved => "member_removed",
			AuditEventType::MemberRoleChanged => "member_role_changed",

			// Invitation events
			AuditEventType::InvitationCreated => "invitation_created",
			AuditEventType::InvitationCancelled => "invitation_cancelled",
			AuditEventType::InvitationResent => "invitation_resent",
			AuditEventType::InvitationAccepted => "invitation_accepted",

			// Team events
			AuditEventType::TeamCreated => "team_created",
			AuditEventType::TeamUpdated => "team_updated",
			AuditEventType::TeamDeleted => "team_deleted",
			AuditEventType::TeamMemberAdded => "team_member_added",
			AuditEventType::TeamMemberRemoved => "team_member_removed",

			// Custom role events
			AuditEventType::RoleCreated => "role_created",
			AuditEventType::RoleUpdated => "role_updated",
			AuditEventType::RoleDeleted => "role_deleted",

			// Admin events
			AuditEventType::UserCreated => "user_created",
			AuditEventType::UserUpdated => "user_updated",
			AuditEventType::UserRemoved => "user_removed",
			AuditEventType::UserPasswordSet => "user_password_set",
			AuditEventType::SystemRoleChanged => "system_role_changed",
			AuditEventType::UserBanned => "user_banned",
			AuditEventType::UserUnbanned => "user_unbanned",
			AuditEventType::ImpersonationStarted => "impersonation_started",
			AuditEventType::ImpersonationEnded => "impersonation_ended",
		};
		write!(f, "{s}")
	}
}

impl AuditEventType {
	/// Returns the default severity for this event type.
	///
	/// Mapping follows RFC 5424 conventions:
	/// - `Info`: Normal operations (session created, resource created)
	/// - `Warning`: Security-relevant failures (access denied)
	/// - `Notice`: Administrative actions (deletions, bans, impersonation)
	pub fn default_severity(&self) -> AuditSeverity {
		match self {
			// Info: Normal successful operations
			AuditEventType::SessionCreated
			| AuditEventType::AccessGranted
			| AuditEventType::OrgCreated
			| AuditEventType::OrgUpdated
			| AuditEventType::MemberAdded
			| AuditEventType::InvitationCreated
			| AuditEventType::InvitationResent
			| AuditEventType::InvitationAccepted
			| AuditEventType::TeamCreated
			| AuditEventType::TeamUpdated
			| AuditEventType::TeamMemberAdded
			| AuditEventType::RoleCreated
			| AuditEventType::RoleUpdated
			| AuditEventType::UserCreated
			| AuditEventType::UserUpdated => AuditSeverity::Info,

			// Warning: Security-relevant failures
			AuditEventType::AccessDenied => AuditSeverity::Warning,

			// Notice: Administrative/destructive actions
			AuditEventType::SessionRevoked
			| AuditEventType::SessionExpired
			| AuditEventType::OrgDeleted
			| AuditEventType::OwnershipTransferred
			| AuditEventType::MemberRemoved
			| AuditEventType::MemberRoleChanged
			| AuditEventType::InvitationCancelled
			| AuditEventType::TeamDeleted
			| AuditEventType::TeamMemberRemoved
			| AuditEventType::RoleDeleted
			| AuditEventType::UserRemoved
			| AuditEventType::UserPasswordSet
			| AuditEventType::SystemRoleChanged
			| AuditEventType::UserBanned
			| AuditEventType::UserUnbanned
			| AuditEventType::ImpersonationStarted
			| AuditEventType::ImpersonationEnded => AuditSeverity::Notice,
		}
	}
}

/// Severity levels for audit events, compatible with RFC 5424 syslog.
///
/// The numeric values correspond to syslog severity codes, allowing
/// direct mapping when forwarding to syslog-based SIEM systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSeverity {
	Debug = 7,
	#[default]
	Info = 6,
	Notice = 5,
	Warning = 4,
	Error = 3,
	Critical = 2,
}

impl AuditSeverity {
	/// Returns the RFC 5424 numeric severity code.
	pub fn as_syslog_code(&self) -> u8 {
		*self as u8
	}

	/// Returns all severity levels from most to least severe.
	pub fn all() -> &'static [AuditSeverity] {
		&[
			AuditSeverity::Critical,
			AuditSeverity::Error,
			AuditSeverity::Warning,
			AuditSeverity::Notice,
			AuditSeverity::Info,
			AuditSeverity::Debug,
		]
	}
}

impl PartialOrd for AuditSeverity {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for AuditSeverity {
	fn cmp(&self, other: &Self) -> Ordering {
		// Lower numeric value = higher severity (Critical=2 > Debug=7)
		(*other as u8).cmp(&(*self as u8))
	}
}

impl fmt::Display for AuditSeverity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			AuditSeverity::Debug => "debug",
			AuditSeverity::Info => "info",
			AuditSeverity::Notice => "notice",
			AuditSeverity::Warning => "warning",
			AuditSeverity::Error => "error",
			AuditSeverity::Critical => "critical",
		};
		write!(f, "{s}")
	}
}

/// An entry in the audit log recording a security-relevant event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
	/// Unique identifier for this audit entry.
	pub id: Uuid,
	/// When the event occurred.
	pub timestamp: DateTime<Utc>,
	/// The type of event.
	pub event_type: AuditEventType,
	/// The severity level of this event.
	pub severity: AuditSeverity,

	/// The user who performed the action (if known).
	pub actor_user_id: Option<UserId>,
	/// If the actor is impersonating another user, this is the real admin's ID.
	pub impersonating_user_id: Option<UserId>,

	/// The type of resource affected (e.g., "organization", "member", "role").
	pub resource_type: Option<String>,
	/// The ID of the resource affected.
	pub resource_id: Option<String>,

	/// Human-readable description of the action.
	pub action: String,
	/// IP address of the request origin.
	pub ip_address: Option<String>,
	/// User agent string from the request.
	pub user_agent: Option<String>,
	/// Additional event-specific details.
	pub details: serde_json::Value,

	/// Application-level request ID for correlation.
	pub request_id: Option<String>,
}

impl AuditLogEntry {
	/// Create a new audit log builder for the given event type.
	pub fn builder(event_type: AuditEventType) -> AuditLogBuilder {
		AuditLogBuilder::new(event_type)
	}
}

/// Builder for constructing audit log entries with a fluent API.
#[derive(Debug, Clone)]
pub struct AuditLogBuilder {
	event_type: AuditEventType,
	severity: Option<AuditSeverity>,
	actor_user_id: Option<UserId>,
	impersonating_user_id: Option<UserId>,
	resource_type: Option<String>,
	resource_id: Option<String>,
	action: Option<String>,
	ip_address: Option<String>,
	user_agent: Option<String>,
	details: serde_json::Value,
	request_id: Option<String>,
}

impl AuditLogBuilder {
	/// Create a new builder for the given event type.
	pub fn new(event_type: AuditEventType) -> Self {
		Self {
			event_type,
			severity: None,
			actor_user_id: None,
			impersonating_user_id: None,
			resource_type: None,
			resource_id: None,
			action: None,
			ip_address: None,
			user_agent: None,
			details: serde_json::Value::Null,
			request_id: None,
		}
	}

	/// Set the severity level. Defaults to the event type's default severity.
	pub fn severity(mut self, severity: AuditSeverity) -> Self {
		self.severity = Some(severity);
		self
	}

	/// Set the user who performed the action.
	pub fn actor(mut self, user_id: UserId) -> Self {
		self.actor_user_id = Some(user_id);
		self
	}

	/// Set the real admin's ID if the actor is impersonating another user.
	pub fn impersonating(mut self, admin_user_id: UserId) -> Self {
		self.impersonating_user_id = Some(admin_user_id);
		self
	}

	/// Set the resource type and ID affected by this event.
	pub fn resource(
		mut self,
		resource_type: impl Into<String>,
		resource_id: impl Into<String>,
	) -> Self {
		self.resource_type = Some(resource_type.into());
		self.resource_id = Some(resource_id.into());
		self
	}

	/// Set the human-readable action description.
	pub fn action(mut self, action: impl Into<String>) -> Self {
		self.action = Some(action.into());
		self
	}

	/// Set the IP address of the request origin.
	pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
		self.ip_address = Some(ip.into());
		self
	}

	/// Set the user agent string from the request.
	pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
		self.user_agent = Some(ua.into());
		self
	}

	/// Set additional event-specific details.
	pub fn details(mut self, details: serde_json::Value) -> Self {
		self.details = details;
		self
	}

	/// Set the application-level request ID.
	pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
		self.request_id = Some(request_id.into());
		self
	}

	/// Build the audit log entry.
	pub fn build(self) -> AuditLogEntry {
		AuditLogEntry {
			id: Uuid::new_v4(),
			timestamp: Utc::now(),
			event_type: self.event_type,
			severity: self
				.severity
				.unwrap_or_else(|| self.event_type.default_severity()),
			actor_user_id: self.actor_user_id,
			impersonating_user_id: self.impersonating_user_id,
			resource_type: self.resource_type,
			resource_id: self.resource_id,
			action: self.action.unwrap_or_else(|| self.event_type.to_string()),
			ip_address: self.ip_address,
			user_agent: self.user_agent,
			details: self.details,
			request_id: self.request_id,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use serde_json::json;

	mod audit_event_type {
		use super::*;

		#[test]
		fn display_returns_snake_case() {
			assert_eq!(
				AuditEventType::SessionCreated.to_string(),
				"session_created"
			);
			assert_eq!(AuditEventType::AccessDenied.to_string(), "access_denied");
			assert_eq!(
				AuditEventType::OwnershipTransferred.to_string(),
				"ownership_transferred"
			);
			assert_eq!(
				AuditEventType::ImpersonationStarted.to_string(),
				"impersonation_started"
			);
			assert_eq!(
				AuditEventType::MemberRoleChanged.to_string(),
				"member_role_changed"
			);
			assert_eq!(
				AuditEventType::SystemRoleChanged.to_string(),
				"system_role_changed"
			);
		}

		#[test]
		fn serializes_snake_case() {
			let event = AuditEventType::UserBanned;
			let json = serde_json::to_string(&event).unwrap();
			assert_eq!(json, "\"user_banned\"");
		}

		#[test]
		fn deserializes_snake_case() {
			let event: AuditEventType = serde_json::from_str("\"access_denied\"").unwrap();
			assert_eq!(event, AuditEventType::AccessDenied);
		}

		const ALL_EVENT_TYPES: [AuditEventType; 32] = [
			AuditEventType::SessionCreated,
			AuditEventType::SessionRevoked,
			AuditEventType::SessionExpired,
			AuditEventType::AccessGranted,
			AuditEventType::AccessDenied,
			AuditEventType::OrgCreated,
			AuditEventType::OrgUpdated,
			AuditEventType::OrgDeleted,
			AuditEventType::OwnershipTransferred,
			AuditEventType::MemberAdded,
			AuditEventType::MemberRemoved,
			AuditEventType::MemberRoleChanged,
			AuditEventType::InvitationCreated,
			AuditEventType::InvitationCancelled,
			AuditEventType::InvitationResent,
			AuditEventType::InvitationAccepted,
			AuditEventType::TeamCreated,
			AuditEventType::TeamUpdated,
			AuditEventType::TeamDeleted,
			AuditEventType::TeamMemberAdded,
			AuditEventType::TeamMemberRemoved,
			AuditEventType::RoleCreated,
			AuditEventType::RoleUpdated,
			AuditEventType::RoleDeleted,
			AuditEventType::UserCreated,
			AuditEventType::UserUpdated,
			AuditEventType::UserRemoved,
			AuditEventType::UserPasswordSet,
			AuditEventType::SystemRoleChanged,
			AuditEventType::UserBanned,
			AuditEventType::UserUnbanned,
			AuditEventType::ImpersonationStarted,
		];

		#[test]
		fn all_event_types_serialize_deserialize() {
			for event in ALL_EVENT_TYPES {
				let json = serde_json::to_string(&event).unwrap();
				let roundtrip: AuditEventType = serde_json::from_str(&json).unwrap();
				assert_eq!(event, roundtrip);
			}
		}

		#[test]
		fn default_severity_mapping() {
			assert_eq!(
				AuditEventType::SessionCreated.default_severity(),
				AuditSeverity::Info
			);
			assert_eq!(
				AuditEventType::OrgCreated.default_severity(),
				AuditSeverity::Info
			);
			assert_eq!(
				AuditEventType::AccessDenied.default_severity(),
				AuditSeverity::Warning
			);
			assert_eq!(
				AuditEventType::OrgDeleted.default_severity(),
				AuditSeverity::Notice
			);
			assert_eq!(
				AuditEventType::OwnershipTransferred.default_severity(),
				AuditSeverity::Notice
			);
			assert_eq!(
				AuditEventType::ImpersonationStarted.default_severity(),
				AuditSeverity::Notice
			);
			assert_eq!(
				AuditEventType::UserBanned.default_severity(),
				AuditSeverity::Notice
			);
		}
	}

	mod audit_severity {
		use super::*;

		#[test]
		fn ordering_higher_severity_is_greater() {
			assert!(AuditSeverity::Critical > AuditSeverity::Error);
			assert!(AuditSeverity::Error > AuditSeverity::Warning);
			assert!(AuditSeverity::Warning > AuditSeverity::Notice);
			assert!(AuditSeverity::Notice > AuditSeverity::Info);
			assert!(AuditSeverity::Info > AuditSeverity::Debug);
		}

		#[test]
		fn syslog_codes() {
			assert_eq!(AuditSeverity::Debug.as_syslog_code(), 7);
			assert_eq!(AuditSeverity::Info.as_syslog_code(), 6);
			assert_eq!(AuditSeverity::Notice.as_syslog_code(), 5);
			assert_eq!(AuditSeverity::Warning.as_syslog_code(), 4);
			assert_eq!(AuditSeverity::Error.as_syslog_code(), 3);
			assert_eq!(AuditSeverity::Critical.as_syslog_code(), 2);
		}

		#[test]
		fn default_is_info() {
			assert_eq!(AuditSeverity::default(), AuditSeverity::Info);
		}

		#[test]
		fn all_returns_sorted_by_severity() {
			let all = AuditSeverity::all();
			assert_eq!(all.len(), 6);
			for i in 0..all.len() - 1 {
				assert!(
					all[i] > all[i + 1],
					"Expected {:?} > {:?}",
					all[i],
					all[i + 1]
				);
			}
		}
	}

	mod audit_log_builder {
		use super::*;

		#[test]
		fn builds_minimal_entry() {
			let entry = AuditLogBuilder::new(AuditEventType::SessionRevoked).build();

			assert_eq!(entry.event_type, AuditEventType::SessionRevoked);
			assert_eq!(entry.severity, AuditSeverity::Notice);
			assert!(entry.actor_user_id.is_none());
			assert!(entry.impersonating_user_id.is_none());
			assert!(entry.resource_type.is_none());
			assert_eq!(entry.action, "session_revoked");
			assert_eq!(entry.details, serde_json::Value::Null);
		}

		#[test]
		fn builds_full_entry() {
			let actor = UserId::generate();
			let admin = UserId::generate();

			let entry = AuditLogBuilder::new(AuditEventType::MemberRoleChanged)
				.actor(actor)
				.impersonating(admin)
				.resource("member", "mem-456")
				.action("Changed role from member to moderator")
				.ip_address("10.0.0.1")
				.user_agent("Mozilla/5.0")
				.details(json!({"old_role": "member", "new_role": "moderator"}))
				.severity(AuditSeverity::Warning)
				.request_id("req-789")
				.build();

			assert_eq!(entry.event_type, AuditEventType::MemberRoleChanged);
			assert_eq!(entry.severity, AuditSeverity::Warning);
			assert_eq!(entry.actor_user_id, Some(actor));
			assert_eq!(entry.impersonating_user_id, Some(admin));
			assert_eq!(entry.resource_type, Some("member".to_string()));
			assert_eq!(entry.resource_id, Some("mem-456".to_string()));
			assert_eq!(entry.action, "Changed role from member to moderator");
			assert_eq!(entry.ip_address, Some("10.0.0.1".to_string()));
			assert_eq!(entry.request_id, Some("req-789".to_string()));
			assert_eq!(entry.details["new_role"], "moderator");
		}

		#[test]
		fn generates_unique_ids() {
			let entry1 = AuditLogBuilder::new(AuditEventType::OrgCreated).build();
			let entry2 = AuditLogBuilder::new(AuditEventType::OrgCreated).build();
			assert_ne!(entry1.id, entry2.id);
		}

		#[test]
		fn default_severity_from_event_type() {
			let entry = AuditLogBuilder::new(AuditEventType::AccessDenied).build();
			assert_eq!(entry.severity, AuditSeverity::Warning);
		}

		#[test]
		fn custom_severity_overrides_default() {
			let entry = AuditLogBuilder::new(AuditEventType::OrgCreated)
				.severity(AuditSeverity::Critical)
				.build();
			assert_eq!(entry.severity, AuditSeverity::Critical);
		}

		#[test]
		fn impersonation_tracking() {
			let target_user = UserId::generate();
			let admin_user = UserId::generate();

			let entry = AuditLogBuilder::new(AuditEventType::ImpersonationStarted)
				.actor(target_user)
				.impersonating(admin_user)
				.details(json!({"reason": "Investigating reported issue"}))
				.build();

			assert_eq!(entry.actor_user_id, Some(target_user));
			assert_eq!(entry.impersonating_user_id, Some(admin_user));
		}
	}

	mod serde_roundtrip {
		use super::*;

		#[test]
		fn entry_roundtrips_through_json() {
			let original = AuditLogEntry::builder(AuditEventType::AccessDenied)
				.actor(UserId::generate())
				.resource("organization", "org-123")
				.action("User attempted to delete organization")
				.request_id("req-456")
				.build();

			let json = serde_json::to_string(&original).unwrap();
			let restored: AuditLogEntry = serde_json::from_str(&json).unwrap();

			assert_eq!(restored.id, original.id);
			assert_eq!(restored.event_type, AuditEventType::AccessDenied);
			assert_eq!(restored.severity, AuditSeverity::Warning);
			assert_eq!(restored.resource_id, Some("org-123".to_string()));
			assert_eq!(restored.request_id, Some("req-456".to_string()));
		}
	}

	mod proptest_tests {
		use super::*;

		fn arb_severity() -> impl Strategy<Value = AuditSeverity> {
			prop_oneof![
				Just(AuditSeverity::Debug),
				Just(AuditSeverity::Info),
				Just(AuditSeverity::Notice),
				Just(AuditSeverity::Warning),
				Just(AuditSeverity::Error),
				Just(AuditSeverity::Critical),
			]
		}

		proptest! {
			#[test]
			fn severity_ordering_is_transitive(a in arb_severity(), b in arb_severity(), c in arb_severity()) {
				if a <= b && b <= c {
					prop_assert!(a <= c);
				}
			}

			#[test]
			fn severity_ordering_is_total(a in arb_severity(), b in arb_severity()) {
				prop_assert!(a <= b || b <= a);
			}

			#[test]
			fn severity_serde_roundtrip(severity in arb_severity()) {
				let json = serde_json::to_string(&severity).unwrap();
				let roundtrip: AuditSeverity = serde_json::from_str(&json).unwrap();
				prop_assert_eq!(severity, roundtrip);
			}
		}
	}
}
