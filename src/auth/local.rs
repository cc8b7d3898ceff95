use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use log::info;
use tokio::sync::OnceCell;
use uuid::Uuid;

use super::{invalid_token, jwt::JwtKeys, Authenticator, Identity};
use crate::{
	error::AppError,
	store::UserStore,
	users::{NewUser, Registered, Session, UserProfile, UserRecord},
};

/// bcrypt + JWT against our own user table.
pub struct LocalAuth {
	users: Arc<dyn UserStore>,
	keys: JwtKeys,
	bcrypt_cost: u32,
	/// Checked against for unknown emails so both failure paths cost one bcrypt verify.
	dummy_hash: OnceCell<String>,
}

impl LocalAuth {
	pub fn new(users: Arc<dyn UserStore>, keys: JwtKeys, bcrypt_cost: u32) -> Self {
		Self { users, keys, bcrypt_cost, dummy_hash: OnceCell::new() }
	}

	async fn dummy_hash(&self) -> Result<String, AppError> {
		let hash = self.dummy_hash.get_or_try_init(|| hash_password(Uuid::new_v4().to_string(), self.bcrypt_cost)).await?;
		Ok(hash.clone())
	}
}

fn invalid_credentials() -> AppError {
	AppError::Unauthorized("Invalid email or password".to_string())
}

pub(crate) async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
	let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
		.await
		.context("password hashing task failed")?
		.context("hashing password")?;
	Ok(hash)
}

async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
	let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
		.await
		.context("password verification task failed")?
		.unwrap_or(false);
	Ok(matches)
}

#[async_trait]
impl Authenticator for LocalAuth {
	async fn register(&self, user: NewUser) -> Result<Registered, AppError> {
		if self.users.find_user_by_email(&user.email).await?.is_some() {
			return Err(AppError::Conflict("Email already registered".to_string()));
		}

		let password_hash = hash_password(user.password, self.bcrypt_cost).await?;
		let record = UserRecord {
			profile: UserProfile {
				id: Uuid::new_v4(),
				customer_name: user.customer_name,
				email: user.email,
				phone_number: user.phone_number,
				vehicle_reg_number: user.vehicle_reg_number,
				created_at: Utc::now(),
			},
			password_hash,
		};
		self.users.insert_user(&record).await?;

		info!("Registered user {}", record.profile.id);
		Ok(Registered::new(record.profile.id, false))
	}

	async fn login(&self, email: &str, password: &str) -> Result<Session, AppError> {
		let Some(record) = self.users.find_user_by_email(email).await? else {
			verify_password(password.to_string(), self.dummy_hash().await?).await?;
			return Err(invalid_credentials());
		};
		if !verify_password(password.to_string(), record.password_hash.clone()).await? {
			return Err(invalid_credentials());
		}

		let (token, expires_at) = self.keys.issue(record.profile.id, &record.profile.email).context("signing token")?;
		Ok(Session { message: "Login successful".to_string(), token, refresh_token: None, expires_at, user: record.profile })
	}

	async fn verify(&self, token: &str) -> Result<Identity, AppError> {
		let claims = self.keys.verify(token).map_err(|_| invalid_token())?;
		Ok(Identity { user_id: claims.id, email: Some(claims.email) })
	}

	async fn profile(&self, identity: &Identity) -> Result<Option<UserProfile>, AppError> {
		self.users.find_user_by_id(identity.user_id).await
	}

	async fn logout(&self, _token: &str) -> Result<(), AppError> {
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::MemoryStore;

	fn auth() -> LocalAuth {
		LocalAuth::new(Arc::new(MemoryStore::new()), JwtKeys::new("test-secret", 1), 4)
	}

	fn new_user(email: &str) -> NewUser {
		NewUser {
			customer_name: "Ada".to_string(),
			email: email.to_string(),
			password: "hunter22".to_string(),
			phone_number: None,
			vehicle_reg_number: Some("KDA 001A".to_string()),
		}
	}

	#[tokio::test]
	async fn register_login_verify() {
		let auth = auth();
		let registered = auth.register(new_user("ada@example.com")).await.unwrap();
		assert!(!registered.needs_email_confirmation);

		let session = auth.login("ada@example.com", "hunter22").await.unwrap();
		assert_eq!(session.user.id, registered.user_id);
		assert_eq!(session.user.vehicle_reg_number.as_deref(), Some("KDA 001A"));

		let identity = auth.verify(&session.token).await.unwrap();
		assert_eq!(identity.user_id, registered.user_id);
	}

	#[tokio::test]
	async fn duplicate_registration_conflicts() {
		let auth = auth();
		auth.register(new_user("ada@example.com")).await.unwrap();
		assert!(matches!(auth.register(new_user("ada@example.com")).await, Err(AppError::Conflict(_))));
	}

	#[tokio::test]
	async fn wrong_password_and_unknown_email_look_the_same() {
		let auth = auth();
		auth.register(new_user("ada@example.com")).await.unwrap();

		let wrong = auth.login("ada@example.com", "nope").await.unwrap_err();
		let unknown = auth.login("bob@example.com", "hunter22").await.unwrap_err();
		assert_eq!(wrong.to_string(), unknown.to_string());
		assert!(matches!(wrong, AppError::Unauthorized(_)));
	}

	#[tokio::test]
	async fn unknown_email_still_runs_a_bcrypt_check() {
		let auth = auth();
		assert!(auth.dummy_hash.get().is_none());

		let err = auth.login("ghost@example.com", "hunter22").await.unwrap_err();
		assert!(matches!(err, AppError::Unauthorized(_)));
		let hash = auth.dummy_hash.get().cloned().unwrap();
		assert!(hash.starts_with("$2"));

		auth.login("ghost@example.com", "hunter22").await.unwrap_err();
		assert_eq!(auth.dummy_hash.get(), Some(&hash));
	}

	#[tokio::test]
	async fn garbage_tokens_are_rejected() {
		assert!(matches!(auth().verify("not.a.jwt").await, Err(AppError::Unauthorized(_))));
	}
}
