// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub mod error;
pub mod event;
pub mod pipeline;
pub mod sink;

pub use error::{AuditError, AuditResult, AuditSinkError};
pub use event::{
	AuditEventType, AuditLogBuilder, AuditLogEntry, AuditSeverity, DEFAULT_AUDIT_RETENTION_DAYS,
};
pub use pipeline::{AuditService, QueueOverflowPolicy, DEFAULT_QUEUE_CAPACITY};
pub use sink::{AuditSink, MemoryAuditSink, TracingAuditSink};
