use std::path::Path;

use async_trait::async_trait;
use axum::{
	extract::{multipart::Field, FromRequest, Multipart, Request},
	http::header::CONTENT_TYPE,
	Json,
};
use bytes::{Bytes, BytesMut};
use image::ImageFormat;
use log::debug;
use serde::Deserialize;

use super::car::NewCar;
use crate::{config::UploadConfig, error::AppError, state::AppState};

const ALLOWED_FORMATS: [ImageFormat; 4] = [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::WebP, ImageFormat::Gif];

/// A photo buffered in memory and already validated.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
	pub file_name: Option<String>,
	pub content_type: &'static str,
	pub extension: &'static str,
	pub bytes: Bytes,
}

/// Body of `POST /api/cars`, from either a multipart form or JSON.
#[derive(Debug, Default)]
pub struct CarSubmission {
	pub car_model: Option<String>,
	pub car_number: Option<String>,
	pub car_location: Option<String>,
	pub photo_urls: Vec<String>,
	pub uploads: Vec<PhotoUpload>,
}

impl CarSubmission {
	pub fn into_parts(self) -> Result<(NewCar, Vec<PhotoUpload>), AppError> {
		let new_car = NewCar::from_fields(self.car_model, self.car_number, self.car_location, self.photo_urls)?;
		Ok((new_car, self.uploads))
	}
}

#[derive(Debug, Deserialize)]
struct CarJson {
	#[serde(alias = "carName")]
	car_model: Option<String>,
	#[serde(alias = "vinNumber")]
	car_number: Option<String>,
	car_location: Option<String>,
	photos: Option<Vec<String>>,
}

#[async_trait]
impl FromRequest<AppState> for CarSubmission {
	type Rejection = AppError;

	async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
		let is_multipart = req
			.headers()
			.get(CONTENT_TYPE)
			.and_then(|v| v.to_str().ok())
			.is_some_and(|v| v.to_ascii_lowercase().starts_with("multipart/form-data"));

		if is_multipart {
			let multipart = Multipart::from_request(req, state).await.map_err(|e| AppError::Validation(e.body_text()))?;
			read_multipart(multipart, &state.config.uploads).await
		} else {
			let Json(body) = Json::<CarJson>::from_request(req, state).await?;
			Ok(CarSubmission {
				car_model: body.car_model,
				car_number: body.car_number,
				car_location: body.car_location,
				photo_urls: body.photos.unwrap_or_default(),
				uploads: Vec::new(),
			})
		}
	}
}

async fn read_multipart(mut multipart: Multipart, limits: &UploadConfig) -> Result<CarSubmission, AppError> {
	let mut submission = CarSubmission::default();

	while let Some(field) = multipart.next_field().await? {
		let name = field.name().unwrap_or_default().to_string();

		if field.file_name().is_some() {
			if let Some(upload) = read_photo(field, limits).await? {
				if submission.uploads.len() >= limits.max_files {
					return Err(AppError::Validation(format!("Too many photos (max {})", limits.max_files)));
				}
				submission.uploads.push(upload);
			}
			continue;
		}

		let value = field.text().await?;
		match name.as_str() {
			"car_model" | "carName" => submission.car_model = Some(value),
			"car_number" | "vinNumber" => submission.car_number = Some(value),
			"car_location" | "location" => submission.car_location = Some(value),
			"photos" => submission.photo_urls.push(value),
			other => debug!("Ignoring multipart field `{}`", other),
		}
	}

	Ok(submission)
}

/// Buffers one file part, enforcing the size limit while streaming. Empty parts yield `None`.
async fn read_photo(mut field: Field<'_>, limits: &UploadConfig) -> Result<Option<PhotoUpload>, AppError> {
	let file_name = field.file_name().map(str::to_string);
	let declared = field.content_type().unwrap_or("application/octet-stream").to_string();

	let mut buffer = BytesMut::new();
	while let Some(chunk) = field.chunk().await? {
		if buffer.len() + chunk.len() > limits.max_file_bytes {
			return Err(AppError::PayloadTooLarge(format!(
				"{} exceeds the {} byte limit",
				file_name.as_deref().unwrap_or("photo"),
				limits.max_file_bytes
			)));
		}
		buffer.extend_from_slice(&chunk);
	}
	if buffer.is_empty() {
		return Ok(None);
	}

	let bytes = buffer.freeze();
	let format = validate_photo(file_name.as_deref(), &declared, &bytes)?;
	Ok(Some(PhotoUpload { file_name, content_type: format.to_mime_type(), extension: extension_for(format), bytes }))
}

/// Checks the declared MIME type, the file extension and the magic bytes.
pub fn validate_photo(file_name: Option<&str>, declared: &str, bytes: &[u8]) -> Result<ImageFormat, AppError> {
	let declared = declared.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
	let declared = if declared == "image/jpg" { "image/jpeg".to_string() } else { declared };
	if !ImageFormat::from_mime_type(&declared).is_some_and(is_allowed) {
		return Err(AppError::UnsupportedMedia(format!("Unsupported file type: {declared}")));
	}

	if let Some(ext) = file_name.and_then(|n| Path::new(n).extension()).and_then(|e| e.to_str()) {
		if !ImageFormat::from_extension(ext).is_some_and(is_allowed) {
			return Err(AppError::UnsupportedMedia(format!("Unsupported file extension: .{ext}")));
		}
	}

	match image::guess_format(bytes) {
		Ok(format) if is_allowed(format) => Ok(format),
		_ => Err(AppError::UnsupportedMedia("File content is not a supported image".to_string())),
	}
}

fn is_allowed(format: ImageFormat) -> bool {
	ALLOWED_FORMATS.contains(&format)
}

fn extension_for(format: ImageFormat) -> &'static str {
	match format {
		ImageFormat::Jpeg => "jpg",
		ImageFormat::Png => "png",
		ImageFormat::WebP => "webp",
		ImageFormat::Gif => "gif",
		_ => "bin",
	}
}
