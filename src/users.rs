use chrono::{DateTime, Utc};
use postgres_from_row::FromRow;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserProfile {
	pub id: Uuid,
	pub customer_name: String,
	pub email: String,
	pub phone_number: Option<String>,
	pub vehicle_reg_number: Option<String>,
	pub created_at: DateTime<Utc>,
}

/// A stored user including the bcrypt hash. Never sent to clients.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
	#[serde(flatten)]
	#[from_row(flatten)]
	pub profile: UserProfile,
	pub password_hash: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct RegisterRequest {
	pub customer_name: Option<String>,
	pub email: Option<String>,
	pub password: Option<String>,
	pub phone_number: Option<String>,
	pub vehicle_reg_number: Option<String>,
}

/// Registration input after required-field and email checks.
#[derive(Debug, Clone)]
pub struct NewUser {
	pub customer_name: String,
	pub email: String,
	pub password: String,
	pub phone_number: Option<String>,
	pub vehicle_reg_number: Option<String>,
}

impl RegisterRequest {
	pub fn validate(self) -> Result<NewUser, AppError> {
		let customer_name = non_blank(self.customer_name);
		let email = non_blank(self.email);
		let password = self.password.filter(|p| !p.is_empty());

		let (Some(customer_name), Some(email), Some(password)) = (customer_name, email, password) else {
			return Err(AppError::Validation("Email, password, and customer name are required".to_string()));
		};

		let email = normalize_email(&email);
		if !is_valid_email(&email) {
			return Err(AppError::Validation("Invalid email".to_string()));
		}

		Ok(NewUser {
			customer_name,
			email,
			password,
			phone_number: non_blank(self.phone_number),
			vehicle_reg_number: non_blank(self.vehicle_reg_number),
		})
	}
}

#[derive(Debug, Deserialize, Default)]
pub struct LoginRequest {
	pub email: Option<String>,
	pub password: Option<String>,
}

impl LoginRequest {
	pub fn credentials(self) -> Result<(String, String), AppError> {
		match (non_blank(self.email), self.password.filter(|p| !p.is_empty())) {
			(Some(email), Some(password)) => Ok((normalize_email(&email), password)),
			_ => Err(AppError::Validation("Email and password required".to_string())),
		}
	}
}

#[derive(Debug, Serialize)]
pub struct Registered {
	pub message: String,
	pub user_id: Uuid,
	pub needs_email_confirmation: bool,
}

impl Registered {
	pub fn new(user_id: Uuid, needs_email_confirmation: bool) -> Self {
		let message = if needs_email_confirmation {
			"User registered successfully! Please check your email to confirm."
		} else {
			"User registered successfully!"
		};
		Registered { message: message.to_string(), user_id, needs_email_confirmation }
	}
}

#[derive(Debug, Serialize)]
pub struct Session {
	pub message: String,
	pub token: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<String>,
	pub expires_at: i64,
	pub user: UserProfile,
}

#[derive(Validate)]
struct EmailCheck {
	#[validate(email)]
	email: String,
}

pub fn is_valid_email(email: &str) -> bool {
	EmailCheck { email: email.to_string() }.validate().is_ok()
}

pub fn normalize_email(email: &str) -> String {
	email.trim().to_lowercase()
}

fn non_blank(value: Option<String>) -> Option<String> {
	value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
