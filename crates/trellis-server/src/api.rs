// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Application state and router assembly.
//!
//! Request flow for `/api/*`: auth resolution, then the authentication
//! requirement, then rate limiting keyed by the caller, then the handler.
//! The admin surface nests under `/api/admin` with the strict rate-limit
//! tier on top.

use std::sync::Arc;

use axum::{
	body::Body,
	extract::State,
	http::{Request, StatusCode},
	middleware::{self, Next},
	response::{IntoResponse, Response},
	routing::{delete, get, patch, post},
	Json, Router,
};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;
use trellis_server_audit::{AuditService, TracingAuditSink};
use trellis_server_auth::AuthConfig;
use trellis_server_db::{
	InvitationRepository, OrgRepository, RoleRepository, SessionRepository, TeamRepository,
	UserRepository,
};

use crate::{
	auth_middleware::{auth_layer, require_auth_layer, AuthContext},
	rate_limit::{RateLimitTier, RateLimiter},
	routes,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
	pub pool: SqlitePool,
	pub user_repo: Arc<UserRepository>,
	pub session_repo: Arc<SessionRepository>,
	pub org_repo: Arc<OrgRepository>,
	pub invitation_repo: Arc<InvitationRepository>,
	pub team_repo: Arc<TeamRepository>,
	pub role_repo: Arc<RoleRepository>,
	pub audit: Arc<AuditService>,
	pub auth_config: AuthConfig,
	pub rate_limiter: Arc<RateLimiter>,
}

/// Build application state from a database pool.
pub fn create_app_state(pool: SqlitePool, auth_config: AuthConfig) -> AppState {
	let audit = AuditService::with_sinks(vec![Arc::new(TracingAuditSink::new())]);
	AppState {
		user_repo: Arc::new(UserRepository::new(pool.clone())),
		session_repo: Arc::new(SessionRepository::new(pool.clone())),
		org_repo: Arc::new(OrgRepository::new(pool.clone())),
		invitation_repo: Arc::new(InvitationRepository::new(pool.clone())),
		team_repo: Arc::new(TeamRepository::new(pool.clone())),
		role_repo: Arc::new(RoleRepository::new(pool.clone())),
		audit: Arc::new(audit),
		auth_config,
		rate_limiter: Arc::new(RateLimiter::new()),
		pool,
	}
}

fn rate_limited() -> Response {
	(
		StatusCode::TOO_MANY_REQUESTS,
		Json(serde_json::json!({
			"error": "rate_limited",
			"message": "Too many requests, try again later",
		})),
	)
		.into_response()
}

fn rate_limit_key(request: &Request<Body>) -> String {
	let user = request
		.extensions()
		.get::<AuthContext>()
		.and_then(|ctx| ctx.current_user.as_ref())
		.map(|u| u.effective_user_id().to_string())
		.unwrap_or_else(|| "anonymous".to_string());
	format!("{}:{}", user, request.uri().path())
}

/// Standard-tier rate limiting, keyed by `user_id:path`.
pub async fn standard_rate_limit(
	State(state): State<AppState>,
	request: Request<Body>,
	next: Next,
) -> Response {
	let key = rate_limit_key(&request);
	if !state.rate_limiter.check(&key, RateLimitTier::Standard) {
		return rate_limited();
	}
	next.run(request).await
}

/// Strict-tier rate limiting for the admin surface.
pub async fn strict_rate_limit(
	State(state): State<AppState>,
	request: Request<Body>,
	next: Next,
) -> Response {
	let key = rate_limit_key(&request);
	if !state.rate_limiter.check(&key, RateLimitTier::Strict) {
		return rate_limited();
	}
	next.run(request).await
}

fn admin_routes(state: AppState) -> Router<AppState> {
	Router::new()
		.route("/users", get(routes::admin::list_users))
		.route("/users", post(routes::admin::create_user))
		.route("/users/{user_id}", get(routes::admin::get_user))
		.route("/users/{user_id}", delete(routes::admin::remove_user))
		.route(
			"/users/{user_id}/system-role",
			patch(routes::admin::set_system_role),
		)
		.route("/users/{user_id}/ban", post(routes::admin::ban_user))
		.route("/users/{user_id}/unban", post(routes::admin::unban_user))
		.route("/users/{user_id}/password", post(routes::admin::set_password))
		.route(
			"/users/{user_id}/sessions",
			get(routes::admin::list_user_sessions),
		)
		.route(
			"/users/{user_id}/sessions",
			delete(routes::admin::revoke_user_sessions),
		)
		.route(
			"/users/{user_id}/impersonate",
			post(routes::admin::impersonate_user),
		)
		.route("/users/{user_id}/orgs", get(routes::admin::list_user_orgs))
		.route("/sessions/{session_id}", delete(routes::admin::revoke_session))
		.route("/impersonation/stop", post(routes::admin::stop_impersonation))
		.route("/orgs", get(routes::admin::list_all_orgs))
		.route("/orgs/{org_id}", get(routes::admin::get_org_detail))
		.route(
			"/orgs/{org_id}/invitations",
			get(routes::admin::list_org_invitations),
		)
		.route("/orgs/{org_id}/owner", post(routes::admin::set_org_owner))
		.route(
			"/permissions/check",
			post(routes::admin::check_permission),
		)
		.layer(middleware::from_fn_with_state(state, strict_rate_limit))
}

fn org_routes() -> Router<AppState> {
	Router::new()
		.route("/orgs", get(routes::orgs::list_orgs))
		.route("/orgs", post(routes::orgs::create_org))
		.route("/orgs/{org_id}", get(routes::orgs::get_org))
		.route("/orgs/{org_id}", patch(routes::orgs::update_org))
		.route("/orgs/{org_id}", delete(routes::orgs::delete_org))
		.route("/orgs/{org_id}/members", get(routes::orgs::list_members))
		.route("/orgs/{org_id}/members", post(routes::orgs::add_member))
		.route(
			"/orgs/{org_id}/members/{user_id}",
			patch(routes::orgs::update_member_role),
		)
		.route(
			"/orgs/{org_id}/members/{user_id}",
			delete(routes::orgs::remove_member),
		)
		.route(
			"/orgs/{org_id}/transfer-ownership",
			post(routes::orgs::transfer_ownership),
		)
		.route("/me/active-org", post(routes::orgs::set_active_org))
		.route("/me/active-member", get(routes::orgs::get_active_member))
		.route("/me/permissions/check", post(routes::orgs::check_permission))
}

fn invitation_routes() -> Router<AppState> {
	Router::new()
		.route(
			"/orgs/{org_id}/invitations",
			get(routes::invitations::list_invitations),
		)
		.route(
			"/orgs/{org_id}/invitations",
			post(routes::invitations::create_invitation),
		)
		.route(
			"/orgs/{org_id}/invitations/{invitation_id}",
			delete(routes::invitations::cancel_invitation),
		)
		.route(
			"/orgs/{org_id}/invitations/{invitation_id}/resend",
			post(routes::invitations::resend_invitation),
		)
		.route(
			"/invitations/{invitation_id}/accept",
			post(routes::invitations::accept_invitation),
		)
}

fn team_routes() -> Router<AppState> {
	Router::new()
		.route("/orgs/{org_id}/teams", get(routes::teams::list_teams))
		.route("/orgs/{org_id}/teams", post(routes::teams::create_team))
		.route(
			"/orgs/{org_id}/teams/{team_id}",
			get(routes::teams::get_team),
		)
		.route(
			"/orgs/{org_id}/teams/{team_id}",
			patch(routes::teams::update_team),
		)
		.route(
			"/orgs/{org_id}/teams/{team_id}",
			delete(routes::teams::delete_team),
		)
		.route(
			"/orgs/{org_id}/teams/{team_id}/members",
			get(routes::teams::list_team_members),
		)
		.route(
			"/orgs/{org_id}/teams/{team_id}/members",
			post(routes::teams::add_team_member),
		)
		.route(
			"/orgs/{org_id}/teams/{team_id}/members/{user_id}",
			delete(routes::teams::remove_team_member),
		)
}

fn role_routes() -> Router<AppState> {
	Router::new()
		.route("/orgs/{org_id}/roles", get(routes::roles::list_roles))
		.route("/orgs/{org_id}/roles", post(routes::roles::create_role))
		.route(
			"/orgs/{org_id}/roles/{role_id}",
			patch(routes::roles::update_role),
		)
		.route(
			"/orgs/{org_id}/roles/{role_id}",
			delete(routes::roles::delete_role),
		)
}

/// Build the full application router.
pub fn create_router(state: AppState) -> Router {
	let api = org_routes()
		.merge(invitation_routes())
		.merge(team_routes())
		.merge(role_routes())
		.layer(middleware::from_fn_with_state(
			state.clone(),
			standard_rate_limit,
		))
		.nest("/admin", admin_routes(state.clone()))
		.layer(middleware::from_fn(require_auth_layer))
		.layer(middleware::from_fn_with_state(state.clone(), auth_layer));

	Router::new()
		.route("/health", get(routes::health::health_check))
		.route("/openapi.json", get(crate::api_docs::openapi_json))
		.nest("/api", api)
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}
