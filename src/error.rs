use std::any::Any;

use axum::{
	async_trait,
	extract::{multipart::MultipartError, rejection::JsonRejection, FromRequest, Request},
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use log::{error, warn};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
	#[error("{0}")]
	Validation(String),

	#[error("{0}")]
	Unauthorized(String),

	#[error("{0}")]
	Forbidden(String),

	#[error("{0}")]
	NotFound(String),

	#[error("{0}")]
	Conflict(String),

	#[error("{0}")]
	PayloadTooLarge(String),

	#[error("{0}")]
	UnsupportedMedia(String),

	/// An external service (Supabase, SMTP) answered with an error.
	#[error("{0}")]
	Upstream(String),

	#[error("upstream request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("database error: {0}")]
	Database(#[from] tokio_postgres::Error),

	#[error("internal error: {0}")]
	Internal(#[from] anyhow::Error),
}

impl AppError {
	pub fn status(&self) -> StatusCode {
		match self {
			AppError::Validation(_) => StatusCode::BAD_REQUEST,
			AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
			AppError::Forbidden(_) => StatusCode::FORBIDDEN,
			AppError::NotFound(_) => StatusCode::NOT_FOUND,
			AppError::Conflict(_) => StatusCode::CONFLICT,
			AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
			AppError::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
			AppError::Upstream(_) | AppError::Http(_) => StatusCode::BAD_GATEWAY,
			AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl IntoResponse for AppError {
	fn into_response(self) -> Response {
		let status = self.status();
		let message = match &self {
			AppError::Database(e) => {
				error!("Database error: {}", e);
				"Something went wrong".to_string()
			}
			AppError::Internal(e) => {
				error!("Internal error: {:#}", e);
				"Something went wrong".to_string()
			}
			AppError::Http(e) => {
				error!("Upstream request failed: {}", e);
				"Upstream service unavailable".to_string()
			}
			AppError::Upstream(msg) => {
				error!("Upstream error: {}", msg);
				msg.clone()
			}
			other => {
				warn!("{} {}", status.as_u16(), other);
				other.to_string()
			}
		};

		let body = Json(json!({
			"error": status.canonical_reason().unwrap_or("Error"),
			"message": message,
		}));

		(status, body).into_response()
	}
}

impl From<MultipartError> for AppError {
	fn from(e: MultipartError) -> Self {
		if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
			AppError::PayloadTooLarge("Request body too large".to_string())
		} else {
			AppError::Validation(e.body_text())
		}
	}
}

impl From<JsonRejection> for AppError {
	fn from(e: JsonRejection) -> Self {
		if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
			AppError::PayloadTooLarge("Request body too large".to_string())
		} else {
			AppError::Validation(e.body_text())
		}
	}
}

/// `Json` whose rejections use the API's JSON error body.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
	Json<T>: FromRequest<S, Rejection = JsonRejection>,
	S: Send + Sync,
{
	type Rejection = AppError;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		let Json(value) = Json::<T>::from_request(req, state).await?;
		Ok(ApiJson(value))
	}
}

/// Last-resort handler for panics inside request handlers.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
	let detail = if let Some(s) = err.downcast_ref::<String>() {
		s.clone()
	} else if let Some(s) = err.downcast_ref::<&str>() {
		s.to_string()
	} else {
		"unknown panic".to_string()
	};
	error!("Handler panicked: {}", detail);

	let body = Json(json!({
		"error": "Internal Server Error",
		"message": "Something went wrong",
		"timestamp": chrono::Utc::now().to_rfc3339(),
	}));
	(StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
}
