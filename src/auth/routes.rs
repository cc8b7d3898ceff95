use axum::{
	extract::State,
	http::{HeaderMap, StatusCode},
	response::{IntoResponse, Response},
	routing::{get, post},
	Json, Router,
};
use log::info;
use serde_json::json;

use super::bearer_token;
use crate::{
	error::{ApiJson, AppError},
	state::AppState,
	users::{LoginRequest, RegisterRequest},
};

pub fn router() -> Router<AppState> {
	Router::new()
		.route("/register", post(register))
		.route("/login", post(login))
		.route("/me", get(me))
		.route("/logout", post(logout))
}

async fn register(State(state): State<AppState>, ApiJson(request): ApiJson<RegisterRequest>) -> Result<Response, AppError> {
	let user = request.validate()?;
	let registered = state.auth.register(user).await?;
	Ok((StatusCode::CREATED, Json(registered)).into_response())
}

async fn login(State(state): State<AppState>, ApiJson(request): ApiJson<LoginRequest>) -> Result<Response, AppError> {
	let (email, password) = request.credentials()?;
	let session = state.auth.login(&email, &password).await?;
	info!("User {} logged in", session.user.id);
	Ok(Json(session).into_response())
}

async fn me(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
	let unauthenticated = || (StatusCode::UNAUTHORIZED, Json(json!({ "authenticated": false }))).into_response();

	let Ok(Some(token)) = bearer_token(&headers) else {
		return Ok(unauthenticated());
	};
	let identity = match state.auth.verify(&token).await {
		Ok(identity) => identity,
		Err(AppError::Unauthorized(_)) => return Ok(unauthenticated()),
		Err(e) => return Err(e),
	};

	let user = match state.auth.profile(&identity).await? {
		Some(profile) => serde_json::to_value(profile).map_err(anyhow::Error::from)?,
		None => json!({ "id": identity.user_id, "email": identity.email }),
	};
	Ok(Json(json!({ "authenticated": true, "user": user })).into_response())
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, AppError> {
	if let Ok(Some(token)) = bearer_token(&headers) {
		state.auth.logout(&token).await?;
	}
	Ok(Json(json!({ "message": "Logged out successfully" })))
}
