use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use crate::{encryption_engine::encode_stem, error::AppError};

pub mod local;
pub mod supabase;

pub use local::LocalDiskStore;
pub use supabase::SupabaseStorage;

/// Where car photos end up. `put` returns the public URL of the stored object.
#[async_trait]
pub trait ObjectStore: Send + Sync {
	async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<String, AppError>;

	/// Removes the object behind a URL previously returned by `put`.
	/// URLs this store does not own are ignored.
	async fn delete(&self, url: &str) -> Result<(), AppError>;

	/// The object key behind a public URL, if the URL points into this store.
	fn key_for_url<'a>(&self, url: &'a str) -> Option<&'a str>;
}

/// Whether `key` sits under the owner's prefix written by [`object_key`].
pub fn owned_by(key: &str, owner: Uuid) -> bool {
	key.strip_prefix(&format!("{owner}/"))
		.is_some_and(|rest| !rest.is_empty() && rest.split('/').all(|segment| !matches!(segment, "" | "." | "..")))
}

/// `<user_id>/<unix-millis>-<index>-<nonce>-<encoded stem>.<ext>`
pub fn object_key(user_id: Uuid, index: usize, file_name: Option<&str>, extension: &str) -> String {
	let stem = file_name
		.map(|name| name.rsplit(&['/', '\\'][..]).next().unwrap_or(name))
		.map(|name| name.rsplit_once('.').map_or(name, |(stem, _)| stem))
		.unwrap_or("photo");
	let nonce = Uuid::new_v4().simple().to_string();
	format!("{}/{}-{}-{}-{}.{}", user_id, Utc::now().timestamp_millis(), index, &nonce[..12], encode_stem(stem), extension)
}
