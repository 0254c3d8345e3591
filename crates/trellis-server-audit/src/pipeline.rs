// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The audit pipeline: bounded queue feeding a fan-out to sinks.
//!
//! Handlers call [`AuditService::log`] and never wait on sink I/O. A
//! background task drains the queue and publishes each event to every sink
//! whose minimum severity it meets.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::SendError};
use tracing::{instrument, warn};

use crate::event::AuditLogEntry;
use crate::sink::AuditSink;

/// Default capacity of the in-flight event queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// What to do when the event queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueOverflowPolicy {
	/// Queue the send on a task; the event will eventually be delivered.
	Block,
	/// Drop the new event when the queue is full.
	#[default]
	DropNewest,
}

pub struct AuditService {
	tx: mpsc::Sender<AuditLogEntry>,
	overflow_policy: QueueOverflowPolicy,
}

impl AuditService {
	pub fn new(
		queue_capacity: usize,
		overflow_policy: QueueOverflowPolicy,
		sinks: Vec<Arc<dyn AuditSink>>,
	) -> Self {
		let (tx, rx) = mpsc::channel(queue_capacity);

		tokio::spawn(Self::background_task(rx, sinks));

		Self {
			tx,
			overflow_policy,
		}
	}

	/// A service with the default queue and the given sinks.
	pub fn with_sinks(sinks: Vec<Arc<dyn AuditSink>>) -> Self {
		Self::new(DEFAULT_QUEUE_CAPACITY, QueueOverflowPolicy::default(), sinks)
	}

	async fn background_task(
		mut rx: mpsc::Receiver<AuditLogEntry>,
		sinks: Vec<Arc<dyn AuditSink>>,
	) {
		while let Some(entry) = rx.recv().await {
			let event = Arc::new(entry);

			for sink in &sinks {
				if event.severity < sink.min_severity() {
					continue;
				}

				let sink = Arc::clone(sink);
				let event = Arc::clone(&event);

				tokio::spawn(async move {
					if let Err(e) = sink.publish(event).await {
						warn!(sink = sink.name(), error = %e, "audit sink publish failed");
					}
				});
			}
		}
	}

	/// Log an audit event to the queue for processing.
	///
	/// Returns `true` if the event was successfully queued, `false` if dropped.
	#[instrument(skip(self, entry), fields(event_type = %entry.event_type))]
	pub fn log(&self, entry: AuditLogEntry) -> bool {
		match self.overflow_policy {
			QueueOverflowPolicy::Block => {
				let tx = self.tx.clone();
				tokio::spawn(async move {
					let _ = tx.send(entry).await;
				});
				true
			}
			QueueOverflowPolicy::DropNewest => self.tx.try_send(entry).is_ok(),
		}
	}

	/// Log an audit event, waiting for queue capacity.
	pub async fn log_blocking(&self, entry: AuditLogEntry) -> Result<(), SendError<AuditLogEntry>> {
		self.tx.send(entry).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::AuditSinkError;
	use crate::event::{AuditEventType, AuditSeverity};
	use async_trait::async_trait;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use tokio::time::{sleep, Duration};

	struct CountingSink {
		min_severity: AuditSeverity,
		publish_count: Arc<AtomicUsize>,
	}

	impl CountingSink {
		fn new(min_severity: AuditSeverity) -> (Arc<Self>, Arc<AtomicUsize>) {
			let count = Arc::new(AtomicUsize::new(0));
			let sink = Arc::new(Self {
				min_severity,
				publish_count: Arc::clone(&count),
			});
			(sink, count)
		}
	}

	#[async_trait]
	impl AuditSink for CountingSink {
		fn name(&self) -> &str {
			"counting"
		}

		fn min_severity(&self) -> AuditSeverity {
			self.min_severity
		}

		async fn publish(&self, _event: Arc<AuditLogEntry>) -> Result<(), AuditSinkError> {
			self.publish_count.fetch_add(1, Ordering::SeqCst);
			Ok(())
		}
	}

	struct FailingSink;

	#[async_trait]
	impl AuditSink for FailingSink {
		fn name(&self) -> &str {
			"failing"
		}

		async fn publish(&self, _event: Arc<AuditLogEntry>) -> Result<(), AuditSinkError> {
			Err(AuditSinkError::Transient("sink unavailable".to_string()))
		}
	}

	async fn wait_for_count(count: &AtomicUsize, expected: usize) {
		for _ in 0..100 {
			if count.load(Ordering::SeqCst) >= expected {
				return;
			}
			sleep(Duration::from_millis(10)).await;
		}
		panic!(
			"sink never reached {expected} events (got {})",
			count.load(Ordering::SeqCst)
		);
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn events_reach_all_sinks() {
		let (sink_a, count_a) = CountingSink::new(AuditSeverity::Debug);
		let (sink_b, count_b) = CountingSink::new(AuditSeverity::Debug);
		let service = AuditService::with_sinks(vec![sink_a, sink_b]);

		let entry = AuditLogEntry::builder(AuditEventType::OrgCreated).build();
		assert!(service.log(entry));

		wait_for_count(&count_a, 1).await;
		wait_for_count(&count_b, 1).await;
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn severity_filter_skips_low_severity_events() {
		let (sink, count) = CountingSink::new(AuditSeverity::Warning);
		let service = AuditService::with_sinks(vec![sink]);

		// Info event, below the sink's Warning floor.
		service
			.log_blocking(AuditLogEntry::builder(AuditEventType::OrgCreated).build())
			.await
			.unwrap();
		// Warning event, at the floor.
		service
			.log_blocking(AuditLogEntry::builder(AuditEventType::AccessDenied).build())
			.await
			.unwrap();

		wait_for_count(&count, 1).await;
		sleep(Duration::from_millis(50)).await;
		assert_eq!(count.load(Ordering::SeqCst), 1);
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn failing_sink_does_not_block_others() {
		let (sink, count) = CountingSink::new(AuditSeverity::Debug);
		let service = AuditService::with_sinks(vec![Arc::new(FailingSink), sink]);

		service
			.log_blocking(AuditLogEntry::builder(AuditEventType::SessionRevoked).build())
			.await
			.unwrap();

		wait_for_count(&count, 1).await;
	}

	// Current-thread runtime: the consumer task cannot run between the
	// synchronous log() calls, so the capacity-1 queue must overflow.
	#[tokio::test]
	async fn drop_newest_rejects_when_queue_full() {
		let (sink, _count) = CountingSink::new(AuditSeverity::Debug);
		let service = AuditService::new(1, QueueOverflowPolicy::DropNewest, vec![sink]);

		let mut accepted = 0;
		for _ in 0..50 {
			if service.log(AuditLogEntry::builder(AuditEventType::OrgCreated).build()) {
				accepted += 1;
			}
		}
		assert_eq!(accepted, 1);
	}
}
