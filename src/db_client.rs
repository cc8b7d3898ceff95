use std::{ops::Deref, sync::Arc};

use log::{error, info, warn};
use tokio_postgres::{Client, Config as PgConfig, NoTls};

use crate::config::DatabaseConfig;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
	id UUID PRIMARY KEY,
	customer_name TEXT NOT NULL,
	email TEXT NOT NULL UNIQUE,
	password_hash TEXT NOT NULL,
	phone_number TEXT,
	vehicle_reg_number TEXT,
	created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS cars (
	id UUID PRIMARY KEY,
	user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
	car_model TEXT NOT NULL,
	car_number TEXT NOT NULL UNIQUE,
	car_location TEXT,
	photos TEXT[] NOT NULL DEFAULT '{}',
	created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
	updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS cars_user_id_idx ON cars (user_id);
CREATE INDEX IF NOT EXISTS cars_created_at_idx ON cars (created_at DESC);
"#;

/// Shared handle to the single pipelined postgres connection.
#[derive(Clone)]
pub struct DbClient(pub Arc<Client>);

impl Deref for DbClient {
	type Target = Client;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl DbClient {
	pub async fn connect(config: &DatabaseConfig) -> Result<Self, tokio_postgres::Error> {
		let client = open(config, &config.dbname).await?;
		info!("Connected to postgres at {}:{}/{}", config.host, config.port, config.dbname);
		Ok(DbClient(Arc::new(client)))
	}

	pub async fn apply_schema(&self) -> Result<(), tokio_postgres::Error> {
		self.batch_execute(SCHEMA).await?;
		info!("Database schema ensured");
		Ok(())
	}
}

/// Creates the configured database when it is missing. Failure is not fatal:
/// the connecting role may simply lack CREATEDB on a pre-provisioned server.
pub async fn ensure_database(config: &DatabaseConfig) {
	let result = async {
		let admin = open(config, "postgres").await?;
		let exists = admin.query_opt("SELECT 1 FROM pg_database WHERE datname = $1", &[&config.dbname]).await?.is_some();
		if !exists {
			admin.batch_execute(&format!("CREATE DATABASE {}", quote_ident(&config.dbname))).await?;
			info!("Database `{}` created", config.dbname);
		}
		Ok::<_, tokio_postgres::Error>(())
	}
	.await;

	if let Err(e) = result {
		warn!("Could not ensure database `{}` exists: {}", config.dbname, e);
	}
}

async fn open(config: &DatabaseConfig, dbname: &str) -> Result<Client, tokio_postgres::Error> {
	let mut pg = PgConfig::new();
	pg.host(&config.host).port(config.port).user(&config.user).dbname(dbname);
	if !config.password.is_empty() {
		pg.password(&config.password);
	}

	let (client, monitor) = pg.connect(NoTls).await?;

	tokio::spawn(async move {
		if let Err(e) = monitor.await {
			error!("Connection error: {}", e);
		}
	});

	Ok(client)
}

fn quote_ident(ident: &str) -> String {
	format!("\"{}\"", ident.replace('"', "\"\""))
}
