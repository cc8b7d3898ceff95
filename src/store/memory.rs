use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CarStore, UserStore, DUPLICATE_CAR_NUMBER, DUPLICATE_EMAIL};
use crate::{
	cars::car::Car,
	error::AppError,
	users::{UserProfile, UserRecord},
};

/// Process-local store for development and tests. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
	users: RwLock<HashMap<Uuid, UserRecord>>,
	cars: RwLock<Vec<Car>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl UserStore for MemoryStore {
	async fn insert_user(&self, user: &UserRecord) -> Result<(), AppError> {
		let mut users = self.users.write().await;
		if users.values().any(|u| u.profile.email == user.profile.email) {
			return Err(AppError::Conflict(DUPLICATE_EMAIL.to_string()));
		}
		users.insert(user.profile.id, user.clone());
		Ok(())
	}

	async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
		let users = self.users.read().await;
		Ok(users.values().find(|u| u.profile.email == email).cloned())
	}

	async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserProfile>, AppError> {
		let users = self.users.read().await;
		Ok(users.get(&id).map(|u| u.profile.clone()))
	}
}

#[async_trait]
impl CarStore for MemoryStore {
	async fn insert_car(&self, car: &Car) -> Result<(), AppError> {
		let mut cars = self.cars.write().await;
		if cars.iter().any(|c| c.car_number == car.car_number) {
			return Err(AppError::Conflict(DUPLICATE_CAR_NUMBER.to_string()));
		}
		cars.push(car.clone());
		Ok(())
	}

	async fn list_cars(&self, owner: Option<Uuid>) -> Result<Vec<Car>, AppError> {
		let cars = self.cars.read().await;
		// reverse insertion order breaks created_at ties newest-first
		let mut listed: Vec<Car> =
			cars.iter().rev().filter(|c| owner.map_or(true, |o| c.user_id == o)).cloned().collect();
		listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
		Ok(listed)
	}

	async fn get_car(&self, id: Uuid) -> Result<Option<Car>, AppError> {
		let cars = self.cars.read().await;
		Ok(cars.iter().find(|c| c.id == id).cloned())
	}

	async fn car_number_exists(&self, car_number: &str) -> Result<bool, AppError> {
		let cars = self.cars.read().await;
		Ok(cars.iter().any(|c| c.car_number == car_number))
	}

	async fn delete_car(&self, id: Uuid) -> Result<bool, AppError> {
		let mut cars = self.cars.write().await;
		let before = cars.len();
		cars.retain(|c| c.id != id);
		Ok(cars.len() != before)
	}
}
