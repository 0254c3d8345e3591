// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Audit sinks: destinations for processed audit events.

use crate::error::AuditSinkError;
use crate::event::{AuditLogEntry, AuditSeverity};
use async_trait::async_trait;
use std::sync::Arc;

/// A destination for audit events.
///
/// Sinks receive every event at or above their minimum severity. Publish
/// failures are logged and never propagate back to request handling.
#[async_trait]
pub trait AuditSink: Send + Sync {
	/// Name used in diagnostics when this sink fails.
	fn name(&self) -> &str;

	/// Minimum severity this sink accepts.
	fn min_severity(&self) -> AuditSeverity {
		AuditSeverity::Debug
	}

	async fn publish(&self, event: Arc<AuditLogEntry>) -> Result<(), AuditSinkError>;
}

/// Sink that emits audit events as structured tracing events.
///
/// The default sink. Events land in the server's log stream with the
/// `audit` target so they can be routed independently.
#[derive(Debug, Default)]
pub struct TracingAuditSink {
	min_severity: AuditSeverity,
}

impl TracingAuditSink {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_min_severity(min_severity: AuditSeverity) -> Self {
		Self { min_severity }
	}
}

#[async_trait]
impl AuditSink for TracingAuditSink {
	fn name(&self) -> &str {
		"tracing"
	}

	fn min_severity(&self) -> AuditSeverity {
		self.min_severity
	}

	async fn publish(&self, event: Arc<AuditLogEntry>) -> Result<(), AuditSinkError> {
		let actor = event
			.actor_user_id
			.map(|id| id.to_string())
			.unwrap_or_default();
		let resource = event.resource_id.clone().unwrap_or_default();

		match event.severity {
			AuditSeverity::Critical | AuditSeverity::Error => tracing::error!(
				target: "audit",
				event_type = %event.event_type,
				severity = %event.severity,
				%actor,
				%resource,
				action = %event.action,
				"audit event"
			),
			AuditSeverity::Warning => tracing::warn!(
				target: "audit",
				event_type = %event.event_type,
				severity = %event.severity,
				%actor,
				%resource,
				action = %event.action,
				"audit event"
			),
			_ => tracing::info!(
				target: "audit",
				event_type = %event.event_type,
				severity = %event.severity,
				%actor,
				%resource,
				action = %event.action,
				"audit event"
			),
		}
		Ok(())
	}
}

/// In-memory sink retaining every published event.
///
/// Used by tests asserting which events an operation produced.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
	events: std::sync::Mutex<Vec<AuditLogEntry>>,
}

impl MemoryAuditSink {
	pub fn new() -> Self {
		Self::default()
	}

	/// Snapshot of the events published so far.
	pub fn events(&self) -> Vec<AuditLogEntry> {
		self
			.events
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.clone()
	}
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
	fn name(&self) -> &str {
		"memory"
	}

	async fn publish(&self, event: Arc<AuditLogEntry>) -> Result<(), AuditSinkError> {
		self
			.events
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.push((*event).clone());
		Ok(())
	}
}
