//! Persistence for users and cars.
//!
//! Handlers only see [`UserStore`] and [`CarStore`]; the backend chosen at
//! startup decides whether rows live in postgres, in Supabase (PostgREST) or
//! in process memory.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{cars::car::Car, error::AppError, users::{UserProfile, UserRecord}};

pub mod memory;
pub mod postgres;
pub mod supabase;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use supabase::SupabaseStore;

#[async_trait]
pub trait UserStore: Send + Sync {
	/// Fails with `Conflict` when the email is already taken.
	async fn insert_user(&self, user: &UserRecord) -> Result<(), AppError>;

	async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError>;

	async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserProfile>, AppError>;
}

#[async_trait]
pub trait CarStore: Send + Sync {
	/// Fails with `Conflict` when the car number is already registered.
	async fn insert_car(&self, car: &Car) -> Result<(), AppError>;

	/// Newest first. `owner` restricts the listing to one user's cars.
	async fn list_cars(&self, owner: Option<Uuid>) -> Result<Vec<Car>, AppError>;

	async fn get_car(&self, id: Uuid) -> Result<Option<Car>, AppError>;

	async fn car_number_exists(&self, car_number: &str) -> Result<bool, AppError>;

	/// Returns whether a row was removed.
	async fn delete_car(&self, id: Uuid) -> Result<bool, AppError>;
}

pub(crate) const DUPLICATE_EMAIL: &str = "Email already registered";
pub(crate) const DUPLICATE_CAR_NUMBER: &str = "Car number already exists";
