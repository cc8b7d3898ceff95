use chrono::{DateTime, Utc};
use postgres_from_row::FromRow;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Car {
	pub id: Uuid,
	pub user_id: Uuid,
	pub car_model: String,
	pub car_number: String,
	pub car_location: Option<String>,
	#[serde(default, deserialize_with = "nullable_list")]
	pub photos: Vec<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Car {
	pub fn new(user_id: Uuid, new_car: NewCar) -> Self {
		let now = Utc::now();
		Car {
			id: Uuid::new_v4(),
			user_id,
			car_model: new_car.car_model,
			car_number: new_car.car_number,
			car_location: new_car.car_location,
			photos: new_car.photos,
			created_at: now,
			updated_at: now,
		}
	}
}

/// A validated car submission, before ids and timestamps are assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCar {
	pub car_model: String,
	pub car_number: String,
	pub car_location: Option<String>,
	pub photos: Vec<String>,
}

impl NewCar {
	pub fn from_fields(
		car_model: Option<String>,
		car_number: Option<String>,
		car_location: Option<String>,
		photos: Vec<String>,
	) -> Result<Self, AppError> {
		let trimmed = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
		let (Some(car_model), Some(car_number)) = (trimmed(car_model), trimmed(car_number)) else {
			return Err(AppError::Validation("Missing car model or car number".to_string()));
		};
		Ok(NewCar {
			car_model,
			car_number,
			car_location: trimmed(car_location),
			photos: photos.into_iter().map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).collect(),
		})
	}
}

#[derive(Debug, Serialize)]
pub struct CarList {
	pub cars: Vec<Car>,
}

fn nullable_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
