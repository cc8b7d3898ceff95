use std::{
	io::ErrorKind,
	path::{Component, Path, PathBuf},
};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use log::debug;

use super::ObjectStore;
use crate::{config::UploadConfig, error::AppError};

/// Stores photos on local disk; they are served back by `file_server`.
pub struct LocalDiskStore {
	root: PathBuf,
	public_prefix: String,
}

impl LocalDiskStore {
	pub fn new(config: &UploadConfig) -> Self {
		Self { root: config.dir.clone(), public_prefix: format!("{}/uploads/", config.public_base_url) }
	}
}

/// Joins `key` under `root`, refusing anything that could escape it.
pub fn safe_join(root: &Path, key: &str) -> Option<PathBuf> {
	let relative = Path::new(key);
	if key.is_empty() || !relative.components().all(|c| matches!(c, Component::Normal(_))) {
		return None;
	}
	Some(root.join(relative))
}

#[async_trait]
impl ObjectStore for LocalDiskStore {
	async fn put(&self, key: &str, bytes: Bytes, _content_type: &str) -> Result<String, AppError> {
		let path = safe_join(&self.root, key).ok_or_else(|| AppError::Validation("Invalid object key".to_string()))?;
		if let Some(parent) = path.parent() {
			tokio::fs::create_dir_all(parent).await.with_context(|| format!("creating {}", parent.display()))?;
		}
		tokio::fs::write(&path, &bytes).await.with_context(|| format!("writing {}", path.display()))?;
		debug!("Stored {} bytes at {}", bytes.len(), path.display());
		Ok(format!("{}{}", self.public_prefix, key))
	}

	async fn delete(&self, url: &str) -> Result<(), AppError> {
		let Some(path) = self.key_for_url(url).and_then(|key| safe_join(&self.root, key)) else {
			return Ok(());
		};
		match tokio::fs::remove_file(&path).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
			Err(e) => Err(anyhow::Error::new(e).context(format!("removing {}", path.display())).into()),
		}
	}

	fn key_for_url<'a>(&self, url: &'a str) -> Option<&'a str> {
		url.strip_prefix(self.public_prefix.as_str())
	}
}
