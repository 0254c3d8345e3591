// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Authentication middleware for Axum.
//!
//! The [`auth_layer`] middleware resolves the session cookie or bearer
//! token into a [`CurrentUser`] plus a fully resolved [`GuardContext`] and
//! stores both as a request extension. Handlers pull them out with the
//! [`RequireAuth`] extractor and pass the context to the guard functions;
//! no guard reads ambient state.
//!
//! # Security Properties
//!
//! - Tokens are hashed with SHA-256 before database lookup; raw tokens are
//!   never stored or logged.
//! - Session expiry and revocation are checked on every request.
//! - Banned accounts fail `require_auth` even with a live session.

use axum::{
	body::Body,
	extract::{FromRequestParts, State},
	http::{request::Parts, Request, StatusCode},
	middleware::Next,
	response::{IntoResponse, Response},
	Json,
};
use chrono::Utc;
use tracing::instrument;
use trellis_server_auth::{
	extract_bearer_token, extract_session_cookie_with_name, hash_session_token, ActiveMember,
	CurrentUser, GuardContext, OrgRole, RoleGrants, Session, SessionUser, User,
};
use trellis_server_db::{OrgStore, RoleStore, SessionStore, UserStore};

use crate::api::AppState;

/// Authentication state resolved once per request.
#[derive(Clone, Default)]
pub struct AuthContext {
	pub current_user: Option<CurrentUser>,
	pub guard: GuardContext,
}

impl AuthContext {
	pub fn unauthenticated() -> Self {
		Self::default()
	}

	pub fn authenticated(current_user: CurrentUser, guard: GuardContext) -> Self {
		Self {
			current_user: Some(current_user),
			guard,
		}
	}
}

/// Authentication middleware that extracts auth context from requests.
///
/// Tries the session cookie first, then a bearer token carrying a session
/// token. Whatever the outcome, an [`AuthContext`] is stored as a request
/// extension; unauthenticated requests get an anonymous one so guards can
/// produce the 401 themselves.
#[instrument(
	name = "auth_layer",
	skip(state, request, next),
	fields(
		auth_method = tracing::field::Empty,
		user_id = tracing::field::Empty,
	)
)]
pub async fn auth_layer(
	State(state): State<AppState>,
	mut request: Request<Body>,
	next: Next,
) -> Response {
	let headers = request.headers();
	let span = tracing::Span::current();

	if let Some(token) =
		extract_session_cookie_with_name(headers, &state.auth_config.session_cookie_name)
	{
		if let Some(auth_ctx) = authenticate_session(&state, &token).await {
			if let Some(ref user) = auth_ctx.current_user {
				span.record("auth_method", "session_cookie");
				span.record("user_id", tracing::field::display(&user.user.id));
			}
			request.extensions_mut().insert(auth_ctx);
			return next.run(request).await;
		}
	}

	if let Some(token) = extract_bearer_token(headers) {
		if let Some(auth_ctx) = authenticate_session(&state, &token).await {
			if let Some(ref user) = auth_ctx.current_user {
				span.record("auth_method", "bearer");
				span.record("user_id", tracing::field::display(&user.user.id));
			}
			request.extensions_mut().insert(auth_ctx);
			return next.run(request).await;
		}
	}

	span.record("auth_method", "none");
	request
		.extensions_mut()
		.insert(AuthContext::unauthenticated());
	next.run(request).await
}

/// Authenticate a session token and resolve the full guard context.
#[instrument(skip(state, token), fields(session_id = tracing::field::Empty))]
async fn authenticate_session(state: &AppState, token: &str) -> Option<AuthContext> {
	let token_hash = hash_session_token(token);

	let record = match state.session_repo.get_session_by_token_hash(&token_hash).await {
		Ok(Some(record)) => record,
		Ok(None) => {
			tracing::debug!("session not found for token hash");
			return None;
		}
		Err(e) => {
			tracing::error!(error = %e, "failed to look up session");
			return None;
		}
	};

	tracing::Span::current().record("session_id", tracing::field::display(&record.id));

	let now = Utc::now();
	if !record.is_live(now) {
		tracing::debug!(session_id = %record.id, "session expired or revoked");
		return None;
	}

	// The session's user is the effective identity; when impersonating,
	// the real actor is `impersonated_by`.
	let effective_user = match state.user_repo.get_user_by_id(&record.user_id).await {
		Ok(Some(user)) => user,
		Ok(None) => {
			tracing::warn!(user_id = %record.user_id, "user not found for live session");
			return None;
		}
		Err(e) => {
			tracing::error!(error = %e, "failed to look up user");
			return None;
		}
	};

	let current_user = match record.impersonated_by {
		Some(admin_id) => {
			let admin = match state.user_repo.get_user_by_id(&admin_id).await {
				Ok(Some(user)) => user,
				Ok(None) => {
					tracing::warn!(user_id = %admin_id, "impersonating admin not found");
					return None;
				}
				Err(e) => {
					tracing::error!(error = %e, "failed to look up impersonating admin");
					return None;
				}
			};
			CurrentUser::from_session(admin, record.id).with_impersonation(effective_user.id)
		}
		None => CurrentUser::from_session(effective_user.clone(), record.id),
	};

	let session = Session {
		id: record.id,
		user: session_user(&effective_user),
		active_org_id: record.active_org_id,
		active_team_id: record.active_team_id,
		impersonated_by: record.impersonated_by,
		expires_at: record.expires_at,
	};

	let mut guard = GuardContext::for_session(session);
	if let Some(org_id) = record.active_org_id {
		if let Some(member) = resolve_active_member(state, &org_id, &effective_user.id).await {
			guard = guard.with_member(member);
		}
	}

	Some(AuthContext::authenticated(current_user, guard))
}

/// Resolve the user's membership in the active organization, with grants.
///
/// Built-in role names use the static grant tables; anything else is a
/// custom role looked up in the organization. A membership whose role no
/// longer resolves keeps the membership but carries no grants.
async fn resolve_active_member(
	state: &AppState,
	org_id: &trellis_server_auth::OrgId,
	user_id: &trellis_server_auth::UserId,
) -> Option<ActiveMember> {
	let membership = match state.org_repo.get_membership(org_id, user_id).await {
		Ok(Some(m)) => m,
		Ok(None) => {
			tracing::debug!(%org_id, %user_id, "active org set but user is not a member");
			return None;
		}
		Err(e) => {
			tracing::error!(error = %e, %org_id, "failed to look up membership");
			return None;
		}
	};

	let grants = match membership.role.parse::<OrgRole>() {
		Ok(builtin) => builtin.grants().clone(),
		Err(_) => match state.role_repo.get_role_by_name(org_id, &membership.role).await {
			Ok(Some(role)) => role.grants,
			Ok(None) => {
				tracing::warn!(%org_id, role = %membership.role, "membership role has no definition, granting nothing");
				RoleGrants::new()
			}
			Err(e) => {
				tracing::error!(error = %e, %org_id, role = %membership.role, "failed to resolve custom role, granting nothing");
				RoleGrants::new()
			}
		},
	};

	Some(ActiveMember {
		member_id: membership.id,
		user_id: membership.user_id,
		org_id: membership.org_id,
		role_name: membership.role,
		grants,
	})
}

fn session_user(user: &User) -> SessionUser {
	SessionUser {
		id: user.id,
		display_name: user.display_name.clone(),
		email: user.email.clone(),
		system_role: user.system_role,
		banned: user.banned,
		ban_expires_at: user.ban_expires_at,
	}
}

/// Middleware that rejects unauthenticated requests before routing.
pub async fn require_auth_layer(request: Request<Body>, next: Next) -> Response {
	let auth_ctx = request
		.extensions()
		.get::<AuthContext>()
		.cloned()
		.unwrap_or_else(AuthContext::unauthenticated);

	if auth_ctx.current_user.is_some() {
		next.run(request).await
	} else {
		(
			StatusCode::UNAUTHORIZED,
			Json(serde_json::json!({
				"error": "unauthorized",
				"message": "Authentication required",
			})),
		)
			.into_response()
	}
}

/// Extractor that requires authentication.
///
/// Yields the [`CurrentUser`] and the resolved [`GuardContext`]. Returns
/// 401 if the request carries no valid session; the error response leaks
/// no authentication detail.
pub struct RequireAuth(pub CurrentUser, pub GuardContext);

impl<S> FromRequestParts<S> for RequireAuth
where
	S: Send + Sync,
{
	type Rejection = Response;

	#[instrument(name = "RequireAuth::from_request_parts", skip_all)]
	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		let auth_ctx = parts
			.extensions
			.get::<AuthContext>()
			.cloned()
			.unwrap_or_else(AuthContext::unauthenticated);

		match auth_ctx.current_user {
			Some(user) => {
				tracing::debug!(user_id = %user.user.id, "authentication required: success");
				Ok(RequireAuth(user, auth_ctx.guard))
			}
			None => {
				tracing::debug!("authentication required: no valid credentials");
				let response = (
					StatusCode::UNAUTHORIZED,
					Json(serde_json::json!({
						"error": "unauthorized",
						"message": "Authentication required",
					})),
				);
				Err(response.into_response())
			}
		}
	}
}

/// Extractor for optional authentication. Always succeeds.
pub struct OptionalAuth(pub Option<CurrentUser>, pub GuardContext);

impl<S> FromRequestParts<S> for OptionalAuth
where
	S: Send + Sync,
{
	type Rejection = std::convert::Infallible;

	#[instrument(name = "OptionalAuth::from_request_parts", skip_all)]
	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		let auth_ctx = parts
			.extensions
			.get::<AuthContext>()
			.cloned()
			.unwrap_or_else(AuthContext::unauthenticated);

		Ok(OptionalAuth(auth_ctx.current_user, auth_ctx.guard))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{body::Body, http::Request, middleware, routing::get, Router};
	use trellis_server_auth::{SessionId, SystemRole, UserId};
	use tower::ServiceExt;

	fn test_user() -> User {
		let now = Utc::now();
		User {
			id: UserId::generate(),
			display_name: "Test User".to_string(),
			email: "test@example.com".to_string(),
			system_role: SystemRole::User,
			banned: false,
			ban_reason: None,
			ban_expires_at: None,
			created_at: now,
			updated_at: now,
			deleted_at: None,
		}
	}

	async fn dummy_handler() -> &'static str {
		"ok"
	}

	#[tokio::test]
	async fn require_auth_layer_with_valid_auth_proceeds() {
		let app = Router::new()
			.route("/test", get(dummy_handler))
			.layer(middleware::from_fn(require_auth_layer));

		let user = test_user();
		let current_user = CurrentUser::from_session(user, SessionId::generate());
		let auth_ctx = AuthContext::authenticated(current_user, GuardContext::anonymous());

		let mut request = Request::builder().uri("/test").body(Body::empty()).unwrap();
		request.extensions_mut().insert(auth_ctx);

		let response = app.oneshot(request).await.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
	}

	#[tokio::test]
	async fn require_auth_layer_unauthenticated_returns_401() {
		let app = Router::new()
			.route("/test", get(dummy_handler))
			.layer(middleware::from_fn(require_auth_layer));

		let mut request = Request::builder().uri("/test").body(Body::empty()).unwrap();
		request.extensions_mut().insert(AuthContext::unauthenticated());

		let response = app.oneshot(request).await.unwrap();
		assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	}

	#[tokio::test]
	async fn require_auth_layer_no_context_returns_401() {
		let app = Router::new()
			.route("/test", get(dummy_handler))
			.layer(middleware::from_fn(require_auth_layer));

		let request = Request::builder().uri("/test").body(Body::empty()).unwrap();

		let response = app.oneshot(request).await.unwrap();
		assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	}
}
