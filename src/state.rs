use std::sync::Arc;

use anyhow::Context;
use log::info;

use crate::{
	auth::{jwt::JwtKeys, Authenticator, LocalAuth, SupabaseAuth},
	config::{Backend, Config},
	db_client::{self, DbClient},
	storage::{LocalDiskStore, ObjectStore, SupabaseStorage},
	store::{CarStore, MemoryStore, PgStore, SupabaseStore, UserStore},
	subscribe::{Mailer, SmtpMailer},
	supabase::SupabaseClient,
};

/// Everything a handler can reach. Immutable after startup.
#[derive(Clone)]
pub struct AppState {
	pub config: Arc<Config>,
	pub auth: Arc<dyn Authenticator>,
	pub cars: Arc<dyn CarStore>,
	pub storage: Arc<dyn ObjectStore>,
	pub mailer: Arc<dyn Mailer>,
}

impl AppState {
	/// Connects the backend selected by `STORE_BACKEND`.
	pub async fn connect(config: Config) -> anyhow::Result<Self> {
		let keys = JwtKeys::new(&config.jwt_secret, config.jwt_ttl_hours);
		let mailer: Arc<dyn Mailer> = Arc::new(SmtpMailer::new(&config.smtp).context("configuring SMTP")?);

		let (auth, cars, storage) = match config.backend {
			Backend::Postgres => {
				db_client::ensure_database(&config.database).await;
				let db = DbClient::connect(&config.database).await.context("Failed to connect to database")?;
				db.apply_schema().await.context("Failed to apply database schema")?;
				local_backend(Arc::new(PgStore::new(db)), keys, &config)
			}
			Backend::Memory => local_backend(Arc::new(MemoryStore::new()), keys, &config),
			Backend::Supabase => {
				let supabase = config.supabase.as_ref().context("Supabase backend selected without credentials")?;
				let client = SupabaseClient::new(supabase).context("building Supabase client")?;
				let store = Arc::new(SupabaseStore::new(client.clone()));
				let profiles: Arc<dyn UserStore> = store.clone();
				let auth: Arc<dyn Authenticator> = Arc::new(SupabaseAuth::new(client.clone(), profiles, config.bcrypt_cost));
				let cars: Arc<dyn CarStore> = store;
				let storage: Arc<dyn ObjectStore> = Arc::new(SupabaseStorage::new(client, supabase.bucket.clone()));
				(auth, cars, storage)
			}
		};

		info!("Using {} backend", config.backend.as_str());
		Ok(Self { config: Arc::new(config), auth, cars, storage, mailer })
	}

	pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
		self.mailer = mailer;
		self
	}
}

/// Users and cars in one store, our own JWTs, photos on local disk.
fn local_backend<S>(store: Arc<S>, keys: JwtKeys, config: &Config) -> (Arc<dyn Authenticator>, Arc<dyn CarStore>, Arc<dyn ObjectStore>)
where
	S: UserStore + CarStore + 'static,
{
	let users: Arc<dyn UserStore> = store.clone();
	let auth: Arc<dyn Authenticator> = Arc::new(LocalAuth::new(users, keys, config.bcrypt_cost));
	let cars: Arc<dyn CarStore> = store;
	let storage: Arc<dyn ObjectStore> = Arc::new(LocalDiskStore::new(&config.uploads));
	(auth, cars, storage)
}
