//! Authentication.
//!
//! Two interchangeable schemes sit behind [`Authenticator`]:
//!
//! - `local`: users in our own store, bcrypt password hashes, HS256 JWTs.
//! - `supabase`: Supabase Auth issues and validates the tokens.
//!
//! Handlers never look at tokens directly; they take [`AuthUser`] (token
//! required) or [`MaybeAuthUser`] (token optional) as an extractor.

use async_trait::async_trait;
use axum::{
	extract::FromRequestParts,
	http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::{
	error::AppError,
	state::AppState,
	users::{NewUser, Registered, Session, UserProfile},
};

pub mod jwt;
pub mod local;
pub mod routes;
pub mod supabase;

pub use local::LocalAuth;
pub use supabase::SupabaseAuth;

/// Who made an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
	pub user_id: Uuid,
	pub email: Option<String>,
}

#[async_trait]
pub trait Authenticator: Send + Sync {
	async fn register(&self, user: NewUser) -> Result<Registered, AppError>;

	async fn login(&self, email: &str, password: &str) -> Result<Session, AppError>;

	/// Fails with `Unauthorized` for bad signatures, expired or unknown tokens.
	async fn verify(&self, token: &str) -> Result<Identity, AppError>;

	async fn profile(&self, identity: &Identity) -> Result<Option<UserProfile>, AppError>;

	async fn logout(&self, token: &str) -> Result<(), AppError>;
}

pub(crate) fn invalid_token() -> AppError {
	AppError::Unauthorized("Invalid token".to_string())
}

/// Reads `Authorization: Bearer <token>`. `Ok(None)` when no token was sent.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<String>, AppError> {
	let Some(value) = headers.get(AUTHORIZATION) else {
		return Ok(None);
	};
	let value = value.to_str().map_err(|_| invalid_token())?.trim();
	if value.is_empty() || value.eq_ignore_ascii_case("bearer") {
		return Ok(None);
	}
	let (scheme, token) = value.split_once(' ').ok_or_else(invalid_token)?;
	if !scheme.eq_ignore_ascii_case("bearer") {
		return Err(invalid_token());
	}
	let token = token.trim();
	Ok((!token.is_empty()).then(|| token.to_string()))
}

pub struct AuthUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
	type Rejection = AppError;

	async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
		let token = bearer_token(&parts.headers)?.ok_or_else(|| AppError::Unauthorized("No token".to_string()))?;
		Ok(AuthUser(state.auth.verify(&token).await?))
	}
}

/// Like [`AuthUser`] but anonymous requests pass through. A token that is
/// present and invalid is still rejected.
pub struct MaybeAuthUser(pub Option<Identity>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
	type Rejection = AppError;

	async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
		match bearer_token(&parts.headers)? {
			Some(token) => Ok(MaybeAuthUser(Some(state.auth.verify(&token).await?))),
			None => Ok(MaybeAuthUser(None)),
		}
	}
}
