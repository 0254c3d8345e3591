// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Trellis HTTP server.
//!
//! Wires the authorization core, persistence, and audit pipeline into an
//! Axum application: authentication middleware, permission-guarded route
//! handlers, rate limiting, and the OpenAPI document.

pub mod api;
pub mod api_docs;
pub mod api_response;
pub mod auth_middleware;
pub mod rate_limit;
pub mod routes;
pub mod validation;

pub use api::{create_app_state, create_router, AppState};
pub use auth_middleware::{auth_layer, require_auth_layer, AuthContext, OptionalAuth, RequireAuth};
