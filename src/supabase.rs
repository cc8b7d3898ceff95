//! Thin client for the Supabase REST surfaces (GoTrue auth, PostgREST, Storage).

use std::time::Duration;

use hyper::StatusCode;
use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;

use crate::{config::SupabaseConfig, error::AppError};

#[derive(Clone)]
pub struct SupabaseClient {
	http: reqwest::Client,
	base_url: String,
	anon_key: String,
	service_key: Option<String>,
}

impl SupabaseClient {
	pub fn new(config: &SupabaseConfig) -> Result<Self, reqwest::Error> {
		let http = reqwest::Client::builder().timeout(Duration::from_secs(15)).build()?;
		Ok(Self {
			http,
			base_url: config.url.trim_end_matches('/').to_string(),
			anon_key: config.anon_key.clone(),
			service_key: config.service_key.clone(),
		})
	}

	pub fn auth_url(&self, path: &str) -> String {
		format!("{}/auth/v1/{}", self.base_url, path)
	}

	pub fn rest_url(&self, table: &str) -> String {
		format!("{}/rest/v1/{}", self.base_url, table)
	}

	pub fn storage_url(&self, path: &str) -> String {
		format!("{}/storage/v1/{}", self.base_url, path)
	}

	pub fn public_object_prefix(&self, bucket: &str) -> String {
		format!("{}/storage/v1/object/public/{}/", self.base_url, bucket)
	}

	/// Request authorized as the server (service role when configured).
	pub fn request(&self, method: Method, url: String) -> RequestBuilder {
		let key = self.service_key.as_deref().unwrap_or(&self.anon_key);
		self.http.request(method, url).header("apikey", &self.anon_key).bearer_auth(key)
	}

	/// Request authorized as the end user holding `token`.
	pub fn user_request(&self, method: Method, url: String, token: &str) -> RequestBuilder {
		self.http.request(method, url).header("apikey", &self.anon_key).bearer_auth(token)
	}
}

/// Extracts Supabase's human readable error from a failed response.
pub async fn error_message(response: Response) -> (StatusCode, String) {
	let status = response.status();
	let body: Value = response.json().await.unwrap_or(Value::Null);
	let message = ["msg", "message", "error_description", "error"]
		.iter()
		.find_map(|key| body.get(*key).and_then(Value::as_str))
		.unwrap_or_else(|| status.canonical_reason().unwrap_or("Supabase request failed"))
		.to_string();
	(status, message)
}

/// Passes successful responses through and maps PostgREST failures onto API errors.
pub async fn check(response: Response, conflict_message: &str) -> Result<Response, AppError> {
	if response.status().is_success() {
		return Ok(response);
	}
	let (status, message) = error_message(response).await;
	Err(match status {
		StatusCode::CONFLICT => AppError::Conflict(conflict_message.to_string()),
		_ => AppError::Upstream(format!("Supabase returned {}: {}", status.as_u16(), message)),
	})
}
