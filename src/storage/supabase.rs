use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use serde_json::json;

use super::ObjectStore;
use crate::{
	error::AppError,
	supabase::{check, SupabaseClient},
};

/// Supabase Storage bucket with public read access.
pub struct SupabaseStorage {
	client: SupabaseClient,
	bucket: String,
}

impl SupabaseStorage {
	pub fn new(client: SupabaseClient, bucket: String) -> Self {
		Self { client, bucket }
	}
}

#[async_trait]
impl ObjectStore for SupabaseStorage {
	async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<String, AppError> {
		let url = self.client.storage_url(&format!("object/{}/{}", self.bucket, key));
		let response = self
			.client
			.request(Method::POST, url)
			.header("content-type", content_type)
			.header("x-upsert", "false")
			.body(bytes)
			.send()
			.await?;
		check(response, "Photo already exists").await?;
		Ok(format!("{}{}", self.client.public_object_prefix(&self.bucket), key))
	}

	async fn delete(&self, url: &str) -> Result<(), AppError> {
		let Some(key) = self.key_for_url(url) else {
			return Ok(());
		};
		let response = self
			.client
			.request(Method::DELETE, self.client.storage_url(&format!("object/{}", self.bucket)))
			.json(&json!({ "prefixes": [key] }))
			.send()
			.await?;
		check(response, "").await?;
		Ok(())
	}

	fn key_for_url<'a>(&self, url: &'a str) -> Option<&'a str> {
		url.strip_prefix(self.client.public_object_prefix(&self.bucket).as_str())
	}
}
