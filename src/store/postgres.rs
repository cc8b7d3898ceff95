use async_trait::async_trait;
use postgres_from_row::FromRow;
use tokio_postgres::error::SqlState;
use uuid::Uuid;

use super::{CarStore, UserStore, DUPLICATE_CAR_NUMBER, DUPLICATE_EMAIL};
use crate::{
	cars::car::Car,
	db_client::DbClient,
	error::AppError,
	users::{UserProfile, UserRecord},
};

const CAR_COLUMNS: &str = "id, user_id, car_model, car_number, car_location, photos, created_at, updated_at";
const PROFILE_COLUMNS: &str = "id, customer_name, email, phone_number, vehicle_reg_number, created_at";

pub struct PgStore {
	db: DbClient,
}

impl PgStore {
	pub fn new(db: DbClient) -> Self {
		Self { db }
	}
}

fn unique_violation(e: tokio_postgres::Error, message: &str) -> AppError {
	if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
		AppError::Conflict(message.to_string())
	} else {
		AppError::Database(e)
	}
}

#[async_trait]
impl UserStore for PgStore {
	async fn insert_user(&self, user: &UserRecord) -> Result<(), AppError> {
		let p = &user.profile;
		self.db
			.execute(
				"INSERT INTO users (id, customer_name, email, password_hash, phone_number, vehicle_reg_number, created_at) \
				 VALUES ($1, $2, $3, $4, $5, $6, $7)",
				&[&p.id, &p.customer_name, &p.email, &user.password_hash, &p.phone_number, &p.vehicle_reg_number, &p.created_at],
			)
			.await
			.map_err(|e| unique_violation(e, DUPLICATE_EMAIL))?;
		Ok(())
	}

	async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
		let query = format!("SELECT {PROFILE_COLUMNS}, password_hash FROM users WHERE email = $1");
		let row = self.db.query_opt(query.as_str(), &[&email]).await?;
		Ok(row.as_ref().map(UserRecord::try_from_row).transpose()?)
	}

	async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserProfile>, AppError> {
		let query = format!("SELECT {PROFILE_COLUMNS} FROM users WHERE id = $1");
		let row = self.db.query_opt(query.as_str(), &[&id]).await?;
		Ok(row.as_ref().map(UserProfile::try_from_row).transpose()?)
	}
}

#[async_trait]
impl CarStore for PgStore {
	async fn insert_car(&self, car: &Car) -> Result<(), AppError> {
		self.db
			.execute(
				"INSERT INTO cars (id, user_id, car_model, car_number, car_location, photos, created_at, updated_at) \
				 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
				&[
					&car.id,
					&car.user_id,
					&car.car_model,
					&car.car_number,
					&car.car_location,
					&car.photos,
					&car.created_at,
					&car.updated_at,
				],
			)
			.await
			.map_err(|e| unique_violation(e, DUPLICATE_CAR_NUMBER))?;
		Ok(())
	}

	async fn list_cars(&self, owner: Option<Uuid>) -> Result<Vec<Car>, AppError> {
		let rows = match owner {
			Some(user_id) => {
				let query = format!("SELECT {CAR_COLUMNS} FROM cars WHERE user_id = $1 ORDER BY created_at DESC");
				self.db.query(query.as_str(), &[&user_id]).await?
			}
			None => {
				let query = format!("SELECT {CAR_COLUMNS} FROM cars ORDER BY created_at DESC");
				self.db.query(query.as_str(), &[]).await?
			}
		};
		Ok(rows.iter().map(Car::try_from_row).collect::<Result<_, _>>()?)
	}

	async fn get_car(&self, id: Uuid) -> Result<Option<Car>, AppError> {
		let query = format!("SELECT {CAR_COLUMNS} FROM cars WHERE id = $1");
		let row = self.db.query_opt(query.as_str(), &[&id]).await?;
		Ok(row.as_ref().map(Car::try_from_row).transpose()?)
	}

	async fn car_number_exists(&self, car_number: &str) -> Result<bool, AppError> {
		let row = self.db.query_one("SELECT EXISTS(SELECT 1 FROM cars WHERE car_number = $1)", &[&car_number]).await?;
		Ok(row.try_get(0)?)
	}

	async fn delete_car(&self, id: Uuid) -> Result<bool, AppError> {
		let removed = self.db.execute("DELETE FROM cars WHERE id = $1", &[&id]).await?;
		Ok(removed > 0)
	}
}
