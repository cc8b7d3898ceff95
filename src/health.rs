use axum::{
	extract::{OriginalUri, State},
	http::{Method, StatusCode},
	response::IntoResponse,
	Json,
};
use serde_json::{json, Value};

use crate::state::AppState;

const SERVICE: &str = "xlentcar-backend";

pub async fn ping(State(state): State<AppState>) -> Json<Value> {
	Json(json!({
		"ok": true,
		"message": "Server is running",
		"timestamp": chrono::Utc::now().to_rfc3339(),
		"environment": state.config.environment.as_str(),
		"backend": state.config.backend.as_str(),
		"version": env!("CARGO_PKG_VERSION"),
		"service": SERVICE,
	}))
}

pub async fn root() -> Json<Value> {
	Json(json!({
		"message": "XlentCar Backend API",
		"version": env!("CARGO_PKG_VERSION"),
		"documentation": "Visit /api/ping for health check",
		"endpoints": {
			"auth": "/api/auth",
			"cars": "/api/cars",
			"health": "/api/ping",
		}
	}))
}

pub async fn not_found(method: Method, OriginalUri(uri): OriginalUri) -> impl IntoResponse {
	(
		StatusCode::NOT_FOUND,
		Json(json!({
			"error": "Not Found",
			"message": format!("Cannot {} {}", method, uri.path()),
			"availableEndpoints": ["/api/auth", "/api/cars", "/api/ping"],
		})),
	)
}
