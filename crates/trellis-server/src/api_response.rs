// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! API response helpers and macros.
//!
//! This module provides common response patterns for HTTP handlers:
//! - Error response helpers (bad_request, conflict, not_found, internal_error)
//! - Typed mappings from [`GuardError`] and [`DbError`] to HTTP responses
//! - Macros for early-return error handling (parse_id!, guard!)

use axum::{http::StatusCode, Json};
use serde::Serialize;
use trellis_server_auth::GuardError;
use trellis_server_db::DbError;

use crate::validation::IdParseError;

/// Trait for API error response types that have `error` and `message` fields.
pub trait ApiErrorResponse: Serialize + Send {
	fn new(error: impl Into<String>, message: impl Into<String>) -> Self;
}

/// Implement `ApiErrorResponse` for a struct with `error` and `message` fields.
///
/// # Example
///
/// ```ignore
/// impl_api_error_response!(OrgErrorResponse);
/// ```
#[macro_export]
macro_rules! impl_api_error_response {
	($ty:ty) => {
		impl $crate::api_response::ApiErrorResponse for $ty {
			fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
				Self {
					error: error.into(),
					message: message.into(),
				}
			}
		}
	};
}

/// Parse an ID and return early with a 400 response if parsing fails.
///
/// # Example
///
/// ```ignore
/// let org_id = parse_id!(OrgErrorResponse, parse_org_id(&org_id));
/// ```
#[macro_export]
macro_rules! parse_id {
	($error_ty:ty, $parse_expr:expr) => {
		match $parse_expr {
			Ok(id) => id,
			Err(e) => {
				return $crate::api_response::id_parse_error::<$error_ty>(e).into_response();
			}
		}
	};
}

/// Run a guard and return early with its mapped response on denial.
///
/// # Example
///
/// ```ignore
/// let member = guard!(TeamErrorResponse, require_permission(&ctx, &request));
/// ```
#[macro_export]
macro_rules! guard {
	($error_ty:ty, $guard_expr:expr) => {
		match $guard_expr {
			Ok(value) => value,
			Err(e) => {
				return $crate::api_response::guard_error::<$error_ty>(e).into_response();
			}
		}
	};
}

/// Create a 400 Bad Request response from an IdParseError.
pub fn id_parse_error<T: ApiErrorResponse>(e: IdParseError) -> (StatusCode, Json<T>) {
	(StatusCode::BAD_REQUEST, Json(T::new(e.error, e.message)))
}

/// Map a guard denial to its HTTP response.
///
/// `Unauthorized` is the only 401; every other denial is an authenticated
/// caller lacking rights, which is 403.
pub fn guard_error<T: ApiErrorResponse>(e: GuardError) -> (StatusCode, Json<T>) {
	let (status, code) = match &e {
		GuardError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
		GuardError::NoActiveOrganization => (StatusCode::FORBIDDEN, "no_active_organization"),
		GuardError::NotAMember => (StatusCode::FORBIDDEN, "not_a_member"),
		GuardError::SystemRoleRequired { .. } => (StatusCode::FORBIDDEN, "system_role_required"),
		GuardError::RoleRequired { .. } => (StatusCode::FORBIDDEN, "role_required"),
		GuardError::PermissionDenied { .. } => (StatusCode::FORBIDDEN, "permission_denied"),
	};
	(status, Json(T::new(code, e.to_string())))
}

/// Map a database error to its HTTP response.
///
/// Driver and internal errors log the detail and return a generic message.
pub fn db_error<T: ApiErrorResponse>(e: DbError) -> (StatusCode, Json<T>) {
	match e {
		DbError::NotFound(what) => (
			StatusCode::NOT_FOUND,
			Json(T::new("not_found", format!("{what} not found"))),
		),
		DbError::Conflict(message) => (StatusCode::CONFLICT, Json(T::new("conflict", message))),
		DbError::LastOwner => (
			StatusCode::CONFLICT,
			Json(T::new(
				"last_owner",
				"an organization must keep at least one owner",
			)),
		),
		DbError::RoleLimitExceeded { limit } => (
			StatusCode::CONFLICT,
			Json(T::new(
				"role_limit_exceeded",
				format!("an organization may define at most {limit} custom roles"),
			)),
		),
		DbError::InvitationExpired => (
			StatusCode::GONE,
			Json(T::new("invitation_expired", "the invitation has expired")),
		),
		other => {
			tracing::error!(error = %other, "database error while handling request");
			(
				StatusCode::INTERNAL_SERVER_ERROR,
				Json(T::new("internal_error", "internal server error")),
			)
		}
	}
}

/// Create a 400 Bad Request response.
pub fn bad_request<T: ApiErrorResponse>(
	error: impl Into<String>,
	message: impl Into<String>,
) -> (StatusCode, Json<T>) {
	(StatusCode::BAD_REQUEST, Json(T::new(error, message)))
}

/// Create a 409 Conflict response.
pub fn conflict<T: ApiErrorResponse>(
	error: impl Into<String>,
	message: impl Into<String>,
) -> (StatusCode, Json<T>) {
	(StatusCode::CONFLICT, Json(T::new(error, message)))
}

/// Create a 404 Not Found response.
pub fn not_found<T: ApiErrorResponse>(message: impl Into<String>) -> (StatusCode, Json<T>) {
	(StatusCode::NOT_FOUND, Json(T::new("not_found", message)))
}

/// Create a 500 Internal Server Error response.
pub fn internal_error<T: ApiErrorResponse>(message: impl Into<String>) -> (StatusCode, Json<T>) {
	(
		StatusCode::INTERNAL_SERVER_ERROR,
		Json(T::new("internal_error", message)),
	)
}

/// Create a 403 Forbidden response.
pub fn forbidden<T: ApiErrorResponse>(
	error: impl Into<String>,
	message: impl Into<String>,
) -> (StatusCode, Json<T>) {
	(StatusCode::FORBIDDEN, Json(T::new(error, message)))
}

/// Create a 401 Unauthorized response.
pub fn unauthorized<T: ApiErrorResponse>(
	error: impl Into<String>,
	message: impl Into<String>,
) -> (StatusCode, Json<T>) {
	(StatusCode::UNAUTHORIZED, Json(T::new(error, message)))
}

#[cfg(test)]
mod tests {
	use super::*;
	use trellis_server_auth::{Action, PermissionRequest, Resource, SystemRole};

	#[derive(Serialize)]
	struct TestError {
		error: String,
		message: String,
	}

	impl ApiErrorResponse for TestError {
		fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
			Self {
				error: error.into(),
				message: message.into(),
			}
		}
	}

	#[test]
	fn unauthorized_guard_maps_to_401() {
		let (status, _) = guard_error::<TestError>(GuardError::Unauthorized);
		assert_eq!(status, StatusCode::UNAUTHORIZED);
	}

	#[test]
	fn other_guard_denials_map_to_403() {
		for e in [
			GuardError::NoActiveOrganization,
			GuardError::NotAMember,
			GuardError::SystemRoleRequired {
				required: SystemRole::Admin,
			},
			GuardError::RoleRequired {
				required: vec!["owner".to_string()],
			},
			GuardError::PermissionDenied {
				required: PermissionRequest::single(Resource::Team, Action::Delete),
			},
		] {
			let (status, _) = guard_error::<TestError>(e);
			assert_eq!(status, StatusCode::FORBIDDEN);
		}
	}

	#[test]
	fn db_errors_map_to_expected_statuses() {
		let (status, _) = db_error::<TestError>(DbError::NotFound("org".to_string()));
		assert_eq!(status, StatusCode::NOT_FOUND);
		let (status, _) = db_error::<TestError>(DbError::Conflict("slug taken".to_string()));
		assert_eq!(status, StatusCode::CONFLICT);
		let (status, _) = db_error::<TestError>(DbError::LastOwner);
		assert_eq!(status, StatusCode::CONFLICT);
		let (status, _) = db_error::<TestError>(DbError::RoleLimitExceeded { limit: 10 });
		assert_eq!(status, StatusCode::CONFLICT);
		let (status, _) = db_error::<TestError>(DbError::InvitationExpired);
		assert_eq!(status, StatusCode::GONE);
		let (status, _) = db_error::<TestError>(DbError::Internal("boom".to_string()));
		assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	}
}
