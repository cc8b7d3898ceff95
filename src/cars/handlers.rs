use axum::{
	extract::{Path, State},
	http::StatusCode,
	Json,
};
use log::{info, warn};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{
	car::{Car, CarList},
	upload::{CarSubmission, PhotoUpload},
};
use crate::{
	auth::{AuthUser, MaybeAuthUser},
	error::AppError,
	state::AppState,
	storage::{object_key, owned_by, ObjectStore},
};

pub async fn create_car(
	State(state): State<AppState>,
	AuthUser(identity): AuthUser,
	submission: CarSubmission,
) -> Result<(StatusCode, Json<Value>), AppError> {
	let (mut new_car, uploads) = submission.into_parts()?;

	if state.cars.car_number_exists(&new_car.car_number).await? {
		return Err(AppError::Conflict("Car number already exists".to_string()));
	}

	let uploaded = store_photos(state.storage.as_ref(), identity.user_id, uploads).await?;
	new_car.photos.extend(uploaded.iter().cloned());

	let car = Car::new(identity.user_id, new_car);
	if let Err(e) = state.cars.insert_car(&car).await {
		discard_photos(state.storage.as_ref(), &uploaded).await;
		return Err(e);
	}

	info!("Car {} ({}) added by {}", car.id, car.car_number, identity.user_id);
	Ok((StatusCode::CREATED, Json(json!({ "id": car.id, "message": "Car added successfully", "car": car }))))
}

/// Uploads in submission order. On failure the photos already stored are removed again.
async fn store_photos(storage: &dyn ObjectStore, owner: Uuid, uploads: Vec<PhotoUpload>) -> Result<Vec<String>, AppError> {
	let mut urls = Vec::with_capacity(uploads.len());
	for (index, upload) in uploads.into_iter().enumerate() {
		let key = object_key(owner, index, upload.file_name.as_deref(), upload.extension);
		match storage.put(&key, upload.bytes, upload.content_type).await {
			Ok(url) => urls.push(url),
			Err(e) => {
				discard_photos(storage, &urls).await;
				return Err(e);
			}
		}
	}
	Ok(urls)
}

async fn discard_photos(storage: &dyn ObjectStore, urls: &[String]) {
	for url in urls {
		if let Err(e) = storage.delete(url).await {
			warn!("Could not remove photo {}: {}", url, e);
		}
	}
}

/// With a valid token only the caller's cars; anonymous callers get every car.
pub async fn list_cars(State(state): State<AppState>, MaybeAuthUser(identity): MaybeAuthUser) -> Result<Json<CarList>, AppError> {
	let cars = state.cars.list_cars(identity.map(|i| i.user_id)).await?;
	Ok(Json(CarList { cars }))
}

pub async fn public_cars(State(state): State<AppState>) -> Result<Json<CarList>, AppError> {
	let cars = state.cars.list_cars(None).await?;
	Ok(Json(CarList { cars }))
}

fn car_not_found() -> AppError {
	AppError::NotFound("Car not found".to_string())
}

pub async fn get_car(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, AppError> {
	let id = Uuid::parse_str(&id).map_err(|_| car_not_found())?;
	let car = state.cars.get_car(id).await?.ok_or_else(car_not_found)?;
	Ok(Json(json!({ "car": car })))
}

pub async fn delete_car(
	State(state): State<AppState>,
	AuthUser(identity): AuthUser,
	Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
	let id = Uuid::parse_str(&id).map_err(|_| car_not_found())?;
	let car = state.cars.get_car(id).await?.ok_or_else(car_not_found)?;

	if car.user_id != identity.user_id {
		return Err(AppError::Forbidden("Unauthorized".to_string()));
	}

	if !state.cars.delete_car(id).await? {
		return Err(car_not_found());
	}
	// pasted photo URLs can point into other users' prefixes
	let own_photos: Vec<String> = car
		.photos
		.into_iter()
		.filter(|url| state.storage.key_for_url(url).is_some_and(|key| owned_by(key, identity.user_id)))
		.collect();
	discard_photos(state.storage.as_ref(), &own_photos).await;

	info!("Car {} deleted by {}", id, identity.user_id);
	Ok(Json(json!({ "message": "Car deleted" })))
}
