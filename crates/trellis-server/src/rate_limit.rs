// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Sliding-window rate limiting keyed by `user_id:path`.
//!
//! Two tiers: standard for org-scoped routes, strict for the admin surface.
//! Excess requests are rejected with 429; nothing queues. The window state
//! lives in one process-wide mutex, which is the only shared mutable state
//! in request handling.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Requests allowed per window on the standard tier.
pub const STANDARD_LIMIT: usize = 100;
/// Requests allowed per window on the strict (admin) tier.
pub const STRICT_LIMIT: usize = 10;
/// Window length for both tiers.
pub const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitTier {
	Standard,
	Strict,
}

impl RateLimitTier {
	pub fn limit(&self) -> usize {
		match self {
			RateLimitTier::Standard => STANDARD_LIMIT,
			RateLimitTier::Strict => STRICT_LIMIT,
		}
	}
}

/// Process-wide sliding-window limiter.
pub struct RateLimiter {
	windows: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
	pub fn new() -> Self {
		Self {
			windows: Mutex::new(HashMap::new()),
		}
	}

	/// Record a request under `key` and return whether it is within the
	/// tier's limit.
	pub fn check(&self, key: &str, tier: RateLimitTier) -> bool {
		self.check_at(key, tier, Instant::now())
	}

	fn check_at(&self, key: &str, tier: RateLimitTier, now: Instant) -> bool {
		let mut windows = match self.windows.lock() {
			Ok(guard) => guard,
			// A poisoned lock means a panic elsewhere; failing open here
			// would silently disable limiting, so fail closed.
			Err(_) => return false,
		};
		let window = windows.entry(key.to_string()).or_default();

		while let Some(front) = window.front() {
			if now.duration_since(*front) >= WINDOW {
				window.pop_front();
			} else {
				break;
			}
		}

		if window.len() >= tier.limit() {
			tracing::debug!(key, ?tier, "rate limit exceeded");
			return false;
		}
		window.push_back(now);
		true
	}

	/// Drop window entries that have fully aged out.
	pub fn prune(&self) {
		let now = Instant::now();
		if let Ok(mut windows) = self.windows.lock() {
			windows.retain(|_, window| {
				window
					.back()
					.is_some_and(|last| now.duration_since(*last) < WINDOW)
			});
		}
	}
}

impl Default for RateLimiter {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn allows_up_to_the_limit() {
		let limiter = RateLimiter::new();
		let now = Instant::now();
		for _ in 0..STRICT_LIMIT {
			assert!(limiter.check_at("u:/api/admin/users", RateLimitTier::Strict, now));
		}
		assert!(!limiter.check_at("u:/api/admin/users", RateLimitTier::Strict, now));
	}

	#[test]
	fn window_slides() {
		let limiter = RateLimiter::new();
		let start = Instant::now();
		for _ in 0..STRICT_LIMIT {
			assert!(limiter.check_at("k", RateLimitTier::Strict, start));
		}
		assert!(!limiter.check_at("k", RateLimitTier::Strict, start));

		// Just past the window, the oldest entries age out.
		let later = start + WINDOW + Duration::from_millis(1);
		assert!(limiter.check_at("k", RateLimitTier::Strict, later));
	}

	#[test]
	fn keys_are_independent() {
		let limiter = RateLimiter::new();
		let now = Instant::now();
		for _ in 0..STRICT_LIMIT {
			assert!(limiter.check_at("a:/x", RateLimitTier::Strict, now));
		}
		assert!(!limiter.check_at("a:/x", RateLimitTier::Strict, now));
		assert!(limiter.check_at("b:/x", RateLimitTier::Strict, now));
	}

	#[test]
	fn tiers_have_distinct_limits() {
		let limiter = RateLimiter::new();
		let now = Instant::now();
		for _ in 0..STANDARD_LIMIT {
			assert!(limiter.check_at("std", RateLimitTier::Standard, now));
		}
		assert!(!limiter.check_at("std", RateLimitTier::Standard, now));
	}

	#[test]
	fn prune_clears_stale_windows() {
		let limiter = RateLimiter::new();
		let old = Instant::now() - WINDOW - Duration::from_secs(1);
		limiter.check_at("stale", RateLimitTier::Standard, old);
		limiter.prune();
		let windows = limiter.windows.lock().unwrap();
		assert!(!windows.contains_key("stale"));
	}
}
