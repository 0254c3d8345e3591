// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Trellis authorization server binary.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tower_http::cors::{Any, CorsLayer};
use trellis_server::{create_app_state, create_router, AppState};
use trellis_server_auth::AuthConfig;
use trellis_server_db::{init_schema, InvitationStore, SessionStore};

/// Trellis server - multi-tenant authorization and organization management.
#[derive(Parser, Debug)]
#[command(
	name = "trellis-server",
	about = "Multi-tenant authorization server",
	version
)]
struct Args {
	/// Address to bind the HTTP listener to.
	#[arg(long, env = "TRELLIS_SERVER_BIND", default_value = "127.0.0.1:8080")]
	bind: String,

	/// SQLite database URL.
	#[arg(
		long,
		env = "TRELLIS_SERVER_DATABASE_URL",
		default_value = "sqlite:trellis.db?mode=rwc"
	)]
	database_url: String,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version information
	Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("trellis-server {}", env!("CARGO_PKG_VERSION"));
		return Ok(());
	}

	// Load .env file if present
	dotenvy::dotenv().ok();

	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| "info".into()),
		)
		.init();

	tracing::info!(bind = %args.bind, database = %args.database_url, "starting trellis-server");

	let pool = trellis_server_db::create_pool(&args.database_url).await?;
	init_schema(&pool).await?;

	let state = create_app_state(pool, AuthConfig::from_env());
	spawn_maintenance(state.clone());

	let app = create_router(state).layer(
		CorsLayer::new()
			.allow_origin(Any)
			.allow_methods(Any)
			.allow_headers(Any),
	);

	let listener = tokio::net::TcpListener::bind(&args.bind).await?;
	tracing::info!("listening on {}", args.bind);

	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("received shutdown signal");
		}
	}

	tracing::info!("server shutdown complete");
	Ok(())
}

/// Hourly maintenance: expired sessions and stale invitations are swept,
/// and the rate limiter drops aged windows.
fn spawn_maintenance(state: AppState) {
	let session_repo = Arc::clone(&state.session_repo);
	let invitation_repo = Arc::clone(&state.invitation_repo);
	let rate_limiter = Arc::clone(&state.rate_limiter);

	tokio::spawn(async move {
		let mut interval = tokio::time::interval(Duration::from_secs(60 * 60));
		loop {
			interval.tick().await;

			match session_repo.delete_expired_sessions().await {
				Ok(deleted) if deleted > 0 => {
					tracing::info!(deleted, "deleted expired sessions");
				}
				Ok(_) => {}
				Err(e) => tracing::error!(error = %e, "failed to delete expired sessions"),
			}

			match invitation_repo.expire_stale_invitations(chrono::Utc::now()).await {
				Ok(expired) if expired > 0 => {
					tracing::info!(expired, "marked stale invitations expired");
				}
				Ok(_) => {}
				Err(e) => tracing::error!(error = %e, "failed to expire stale invitations"),
			}

			rate_limiter.prune();
		}
	});
}
