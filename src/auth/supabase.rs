use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use log::{error, warn};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{invalid_token, local::hash_password, Authenticator, Identity};
use crate::{
	error::AppError,
	store::UserStore,
	supabase::{error_message, SupabaseClient},
	users::{NewUser, Registered, Session, UserProfile, UserRecord},
};

/// Supabase Auth (GoTrue) with user details mirrored into `profiles`.
pub struct SupabaseAuth {
	client: SupabaseClient,
	profiles: Arc<dyn UserStore>,
	bcrypt_cost: u32,
}

#[derive(Debug, Deserialize)]
struct GoTrueUser {
	id: Uuid,
	email: Option<String>,
	#[serde(default)]
	user_metadata: Value,
}

#[derive(Debug, Deserialize)]
struct SignUpResponse {
	access_token: Option<String>,
	user: Option<GoTrueUser>,
	// with email confirmation enabled GoTrue returns the bare user
	id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
	access_token: String,
	refresh_token: Option<String>,
	expires_at: Option<i64>,
	expires_in: Option<i64>,
	user: GoTrueUser,
}

impl SupabaseAuth {
	pub fn new(client: SupabaseClient, profiles: Arc<dyn UserStore>, bcrypt_cost: u32) -> Self {
		Self { client, profiles, bcrypt_cost }
	}

	async fn save_profile(&self, profile: UserProfile, password: &str) -> Result<(), AppError> {
		let password_hash = hash_password(password.to_string(), self.bcrypt_cost).await?;
		self.profiles.insert_user(&UserRecord { profile, password_hash }).await
	}
}

fn metadata_str(metadata: &Value, key: &str) -> Option<String> {
	metadata.get(key).and_then(Value::as_str).map(str::to_string)
}

#[async_trait]
impl Authenticator for SupabaseAuth {
	async fn register(&self, user: NewUser) -> Result<Registered, AppError> {
		let response = self
			.client
			.request(Method::POST, self.client.auth_url("signup"))
			.json(&json!({
				"email": user.email,
				"password": user.password,
				"data": {
					"customer_name": user.customer_name,
					"phone_number": user.phone_number,
					"vehicle_reg_number": user.vehicle_reg_number,
				}
			}))
			.send()
			.await?;

		if !response.status().is_success() {
			let (_, message) = error_message(response).await;
			warn!("Registration rejected by Supabase: {}", message);
			return Err(if message.to_lowercase().contains("already registered") {
				AppError::Conflict("Email already registered".to_string())
			} else {
				AppError::Validation(message)
			});
		}

		let signed_up: SignUpResponse = response.json().await?;
		let user_id = signed_up
			.user
			.as_ref()
			.map(|u| u.id)
			.or(signed_up.id)
			.ok_or_else(|| AppError::Upstream("Supabase signup returned no user".to_string()))?;

		let profile = UserProfile {
			id: user_id,
			customer_name: user.customer_name,
			email: user.email,
			phone_number: user.phone_number,
			vehicle_reg_number: user.vehicle_reg_number,
			created_at: Utc::now(),
		};
		if let Err(e) = self.save_profile(profile, &user.password).await {
			// the auth user exists; a missing profile is recreated at login
			error!("Profile creation failed for {}: {}", user_id, e);
		}

		Ok(Registered::new(user_id, signed_up.access_token.is_none()))
	}

	async fn login(&self, email: &str, password: &str) -> Result<Session, AppError> {
		let response = self
			.client
			.request(Method::POST, self.client.auth_url("token?grant_type=password"))
			.json(&json!({ "email": email, "password": password }))
			.send()
			.await?;

		if !response.status().is_success() {
			let (_, message) = error_message(response).await;
			warn!("Login rejected by Supabase: {}", message);
			let message = if message.contains("Invalid login credentials") {
				"Invalid email or password".to_string()
			} else if message.contains("Email not confirmed") {
				"Please confirm your email address first".to_string()
			} else {
				message
			};
			return Err(AppError::Unauthorized(message));
		}

		let session: TokenResponse = response.json().await?;
		let user = session.user;
		let profile = match self.profiles.find_user_by_id(user.id).await? {
			Some(profile) => profile,
			None => {
				let email = user.email.clone().unwrap_or_else(|| email.to_string());
				let profile = UserProfile {
					id: user.id,
					customer_name: metadata_str(&user.user_metadata, "customer_name")
						.unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string()),
					email,
					phone_number: metadata_str(&user.user_metadata, "phone_number"),
					vehicle_reg_number: metadata_str(&user.user_metadata, "vehicle_reg_number"),
					created_at: Utc::now(),
				};
				if let Err(e) = self.save_profile(profile.clone(), password).await {
					warn!("Could not backfill profile for {}: {}", user.id, e);
				}
				profile
			}
		};

		let expires_at =
			session.expires_at.unwrap_or_else(|| Utc::now().timestamp() + session.expires_in.unwrap_or(3600));
		Ok(Session {
			message: "Login successful".to_string(),
			token: session.access_token,
			refresh_token: session.refresh_token,
			expires_at,
			user: profile,
		})
	}

	async fn verify(&self, token: &str) -> Result<Identity, AppError> {
		let response = self.client.user_request(Method::GET, self.client.auth_url("user"), token).send().await?;
		if !response.status().is_success() {
			return Err(invalid_token());
		}
		let user: GoTrueUser = response.json().await.map_err(|_| invalid_token())?;
		Ok(Identity { user_id: user.id, email: user.email })
	}

	async fn profile(&self, identity: &Identity) -> Result<Option<UserProfile>, AppError> {
		self.profiles.find_user_by_id(identity.user_id).await
	}

	async fn logout(&self, token: &str) -> Result<(), AppError> {
		let response = self.client.user_request(Method::POST, self.client.auth_url("logout"), token).send().await?;
		if !response.status().is_success() {
			let (status, message) = error_message(response).await;
			warn!("Supabase logout returned {}: {}", status, message);
		}
		Ok(())
	}
}
