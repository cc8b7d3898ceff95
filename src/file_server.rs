use axum::{
	body::Body,
	extract::{Path, State},
	http::header,
	response::IntoResponse,
};
use image::ImageFormat;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::{error::AppError, state::AppState, storage::local::safe_join};

// GET /uploads/*path, photos written by LocalDiskStore
pub async fn file_handler(State(state): State<AppState>, Path(path): Path<String>) -> Result<impl IntoResponse, AppError> {
	let full_path = safe_join(&state.config.uploads.dir, &path).ok_or_else(|| AppError::Validation("Invalid path".to_string()))?;

	let stream = read_file_stream(&full_path).await.ok_or_else(|| AppError::NotFound("File not found".to_string()))?;
	let content_type = ImageFormat::from_path(&full_path).map(|f| f.to_mime_type()).unwrap_or("application/octet-stream");

	Ok(([(header::CONTENT_TYPE, content_type)], Body::from_stream(stream)))
}

pub async fn read_file_stream(path: &std::path::Path) -> Option<ReaderStream<File>> {
	let file = File::open(path).await.ok()?;
	if !file.metadata().await.ok()?.is_file() {
		return None;
	}
	Some(ReaderStream::new(file))
}
