use async_trait::async_trait;
use reqwest::Method;
use serde::{
	de::{DeserializeOwned, IgnoredAny},
	Serialize,
};
use uuid::Uuid;

use super::{CarStore, UserStore, DUPLICATE_CAR_NUMBER, DUPLICATE_EMAIL};
use crate::{
	cars::car::Car,
	error::AppError,
	supabase::{check, SupabaseClient},
	users::{UserProfile, UserRecord},
};

/// PostgREST-backed tables: `profiles` for users, `cars` for listings.
pub struct SupabaseStore {
	client: SupabaseClient,
}

impl SupabaseStore {
	pub fn new(client: SupabaseClient) -> Self {
		Self { client }
	}

	async fn select<T>(&self, table: &str, filters: &[(&str, String)]) -> Result<Vec<T>, AppError>
	where
		T: DeserializeOwned + Send,
	{
		let response = self.client.request(Method::GET, self.client.rest_url(table)).query(filters).send().await?;
		Ok(check(response, "").await?.json().await?)
	}

	async fn insert<T: Serialize + Sync>(&self, table: &str, row: &T, conflict: &str) -> Result<(), AppError> {
		let response = self
			.client
			.request(Method::POST, self.client.rest_url(table))
			.header("Prefer", "return=minimal")
			.json(row)
			.send()
			.await?;
		check(response, conflict).await?;
		Ok(())
	}
}

#[async_trait]
impl UserStore for SupabaseStore {
	async fn insert_user(&self, user: &UserRecord) -> Result<(), AppError> {
		self.insert("profiles", user, DUPLICATE_EMAIL).await
	}

	async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, AppError> {
		let rows: Vec<UserRecord> =
			self.select("profiles", &[("select", "*".to_string()), ("email", format!("eq.{email}"))]).await?;
		Ok(rows.into_iter().next())
	}

	async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserProfile>, AppError> {
		let rows: Vec<UserProfile> = self.select("profiles", &[("select", "*".to_string()), ("id", format!("eq.{id}"))]).await?;
		Ok(rows.into_iter().next())
	}
}

#[async_trait]
impl CarStore for SupabaseStore {
	async fn insert_car(&self, car: &Car) -> Result<(), AppError> {
		self.insert("cars", car, DUPLICATE_CAR_NUMBER).await
	}

	async fn list_cars(&self, owner: Option<Uuid>) -> Result<Vec<Car>, AppError> {
		let mut filters = vec![("select", "*".to_string()), ("order", "created_at.desc".to_string())];
		if let Some(user_id) = owner {
			filters.push(("user_id", format!("eq.{user_id}")));
		}
		self.select("cars", &filters).await
	}

	async fn get_car(&self, id: Uuid) -> Result<Option<Car>, AppError> {
		let rows: Vec<Car> = self.select("cars", &[("select", "*".to_string()), ("id", format!("eq.{id}"))]).await?;
		Ok(rows.into_iter().next())
	}

	async fn car_number_exists(&self, car_number: &str) -> Result<bool, AppError> {
		let rows: Vec<IgnoredAny> = self
			.select(
				"cars",
				&[("select", "id".to_string()), ("car_number", format!("eq.{car_number}")), ("limit", "1".to_string())],
			)
			.await?;
		Ok(!rows.is_empty())
	}

	async fn delete_car(&self, id: Uuid) -> Result<bool, AppError> {
		let response = self
			.client
			.request(Method::DELETE, self.client.rest_url("cars"))
			.query(&[("id", format!("eq.{id}"))])
			.header("Prefer", "return=representation")
			.send()
			.await?;
		let removed: Vec<Car> = check(response, "").await?.json().await?;
		Ok(!removed.is_empty())
	}
}
