use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
	extract::{DefaultBodyLimit, Request},
	http::header::ORIGIN,
	middleware::{self, Next},
	response::Response,
	routing::{get, post},
	Router,
};
use log::info;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;

use crate::{
	auth, cars,
	config::{Backend, Config},
	cors::{self, OriginPolicy},
	error, file_server, health,
	state::AppState,
	subscribe,
};

pub fn router(state: AppState) -> Router {
	let policy = Arc::new(OriginPolicy::from_config(&state.config));

	let mut app = Router::new()
		.route("/", get(health::root))
		.route("/api/ping", get(health::ping))
		.nest("/api/auth", auth::routes::router())
		.nest("/api/cars", cars::router())
		.route("/api/subscribe", post(subscribe::subscribe));

	if state.config.backend != Backend::Supabase {
		app = app.route("/uploads/*path", get(file_server::file_handler));
	}

	app.fallback(health::not_found)
		.layer(DefaultBodyLimit::max(state.config.body_limit))
		.layer(CatchPanicLayer::custom(error::handle_panic))
		.layer(middleware::from_fn(log_request))
		.layer(policy.clone().cors_layer())
		.layer(middleware::from_fn_with_state(policy, cors::reject_disallowed_origin))
		.with_state(state)
}

async fn log_request(req: Request, next: Next) -> Response {
	let origin = req.headers().get(ORIGIN).and_then(|o| o.to_str().ok()).unwrap_or("No Origin");
	info!("{} {} - Origin: {}", req.method(), req.uri(), origin);
	next.run(req).await
}

pub async fn serve(config: Config) -> anyhow::Result<()> {
	let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
	let state = AppState::connect(config).await?;
	let app = router(state);

	let listener = TcpListener::bind(addr).await.with_context(|| format!("binding {addr}"))?;
	info!("Server running on {}", addr);

	axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await.context("server error")?;
	info!("Server stopped");
	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			log::error!("Failed to listen for ctrl-c: {}", e);
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			}
			Err(e) => {
				log::error!("Failed to listen for SIGTERM: {}", e);
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
	info!("Shutdown signal received");
}
