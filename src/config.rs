use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use log::{info, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("invalid value for {key}: {reason}")]
	Invalid { key: &'static str, reason: String },

	#[error("{key} must be set when STORE_BACKEND={backend}")]
	Missing { key: &'static str, backend: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
	Development,
	Production,
}

impl Environment {
	pub fn as_str(&self) -> &'static str {
		match self {
			Environment::Development => "development",
			Environment::Production => "production",
		}
	}
}

impl FromStr for Environment {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"production" | "prod" => Ok(Environment::Production),
			"development" | "dev" | "test" | "" => Ok(Environment::Development),
			other => Err(format!("unknown environment `{other}`")),
		}
	}
}

/// Which set of external services backs users, cars and photos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
	Postgres,
	Supabase,
	Memory,
}

impl Backend {
	pub fn as_str(&self) -> &'static str {
		match self {
			Backend::Postgres => "postgres",
			Backend::Supabase => "supabase",
			Backend::Memory => "memory",
		}
	}
}

impl FromStr for Backend {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"postgres" | "postgresql" | "sql" => Ok(Backend::Postgres),
			"supabase" => Ok(Backend::Supabase),
			"memory" => Ok(Backend::Memory),
			other => Err(format!("unknown backend `{other}`")),
		}
	}
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
	pub host: String,
	pub port: u16,
	pub user: String,
	pub password: String,
	pub dbname: String,
}

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
	pub url: String,
	pub anon_key: String,
	pub service_key: Option<String>,
	pub bucket: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
	pub host: String,
	pub port: u16,
	pub user: Option<String>,
	pub password: Option<String>,
	pub from: String,
	pub to: String,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
	pub dir: PathBuf,
	pub public_base_url: String,
	pub max_file_bytes: usize,
	pub max_files: usize,
}

#[derive(Debug, Clone)]
pub struct Config {
	pub port: u16,
	pub environment: Environment,
	pub backend: Backend,
	pub database: DatabaseConfig,
	pub jwt_secret: String,
	pub jwt_ttl_hours: i64,
	pub bcrypt_cost: u32,
	pub supabase: Option<SupabaseConfig>,
	pub smtp: SmtpConfig,
	pub cors_origins: Vec<String>,
	pub body_limit: usize,
	pub uploads: UploadConfig,
}

impl Config {
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| env::var(key).ok())
	}

	/// Builds the configuration from any key lookup, so tests never touch the process environment.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

		let port: u16 = load(&var, "PORT", "5000")?;
		let environment = match var("NODE_ENV").or_else(|| var("APP_ENV")) {
			Some(value) => parse_value("NODE_ENV", &value)?,
			None => Environment::Development,
		};
		let backend: Backend = load(&var, "STORE_BACKEND", "postgres")?;

		let database = DatabaseConfig {
			host: var("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
			port: load(&var, "DB_PORT", "5432")?,
			user: var("DB_USER").unwrap_or_else(|| "postgres".to_string()),
			password: var("DB_PASS").unwrap_or_default(),
			dbname: var("DB_NAME").unwrap_or_else(|| "xlentcar".to_string()),
		};

		let jwt_secret = var("JWT_SECRET").unwrap_or_else(|| {
			warn!("JWT_SECRET not set, falling back to an insecure default");
			"change_this".to_string()
		});
		let jwt_ttl_hours: i64 = load(&var, "JWT_TTL_HOURS", "24")?;
		if jwt_ttl_hours <= 0 {
			return Err(ConfigError::Invalid { key: "JWT_TTL_HOURS", reason: "must be positive".to_string() });
		}
		let bcrypt_cost: u32 = load(&var, "BCRYPT_COST", "10")?;
		if !(4..=31).contains(&bcrypt_cost) {
			return Err(ConfigError::Invalid { key: "BCRYPT_COST", reason: "must be between 4 and 31".to_string() });
		}

		let supabase = match (var("SUPABASE_URL"), var("SUPABASE_ANON_KEY"), var("SUPABASE_SERVICE_ROLE_KEY")) {
			(Some(url), anon, service) if anon.is_some() || service.is_some() => Some(SupabaseConfig {
				url: url.trim_end_matches('/').to_string(),
				anon_key: anon.or_else(|| service.clone()).unwrap_or_default(),
				service_key: service,
				bucket: var("SUPABASE_BUCKET").unwrap_or_else(|| "car-photos".to_string()),
			}),
			_ => None,
		};
		if backend == Backend::Supabase && supabase.is_none() {
			return Err(ConfigError::Missing { key: "SUPABASE_URL and SUPABASE_ANON_KEY", backend: backend.as_str() });
		}

		let smtp = SmtpConfig {
			host: var("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".to_string()),
			port: load(&var, "SMTP_PORT", "587")?,
			user: var("SMTP_USER"),
			password: var("SMTP_PASS"),
			from: var("MAIL_FROM").unwrap_or_else(|| "\"XLentCar Website\" <no-reply@xlentcar.com>".to_string()),
			to: var("MAIL_TO").unwrap_or_else(|| "info@xlentcar.com".to_string()),
		};

		let cors_origins = var("CORS_ORIGINS")
			.map(|list| list.split(',').map(str::trim).filter(|o| !o.is_empty()).map(str::to_string).collect())
			.unwrap_or_default();

		let body_limit = match var("BODY_LIMIT").or_else(|| var("EXPRESS_JSON_LIMIT")) {
			Some(value) => parse_size(&value).map_err(|reason| ConfigError::Invalid { key: "BODY_LIMIT", reason })?,
			None => 25 * 1024 * 1024,
		};

		let uploads = UploadConfig {
			dir: PathBuf::from(var("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string())),
			public_base_url: var("PUBLIC_BASE_URL")
				.unwrap_or_else(|| format!("http://localhost:{port}"))
				.trim_end_matches('/')
				.to_string(),
			max_file_bytes: match var("MAX_UPLOAD_BYTES") {
				Some(value) => parse_size(&value).map_err(|reason| ConfigError::Invalid { key: "MAX_UPLOAD_BYTES", reason })?,
				None => 5 * 1024 * 1024,
			},
			max_files: load(&var, "MAX_UPLOAD_FILES", "10")?,
		};

		info!("Configuration loaded: backend={} environment={}", backend.as_str(), environment.as_str());

		Ok(Config {
			port,
			environment,
			backend,
			database,
			jwt_secret,
			jwt_ttl_hours,
			bcrypt_cost,
			supabase,
			smtp,
			cors_origins,
			body_limit,
			uploads,
		})
	}

	pub fn is_production(&self) -> bool {
		self.environment == Environment::Production
	}
}

fn load<T, F>(var: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
	T: FromStr,
	T::Err: Display,
	F: Fn(&str) -> Option<String>,
{
	match var(key) {
		Some(value) => parse_value(key, &value),
		None => parse_value(key, default),
	}
}

fn parse_value<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
	T: FromStr,
	T::Err: Display,
{
	value.parse().map_err(|e: T::Err| ConfigError::Invalid { key, reason: e.to_string() })
}

/// Parses sizes like `25mb`, `512kb` or `1048576` into bytes (1024 based).
pub fn parse_size(value: &str) -> Result<usize, String> {
	let value = value.trim().to_ascii_lowercase();
	let split = value.find(|c: char| !c.is_ascii_digit() && c != '.').unwrap_or(value.len());
	let (number, unit) = value.split_at(split);
	let number: f64 = number.parse().map_err(|_| format!("`{value}` is not a size"))?;
	let multiplier = match unit.trim() {
		"" | "b" => 1.0,
		"kb" | "k" => 1024.0,
		"mb" | "m" => 1024.0 * 1024.0,
		"gb" | "g" => 1024.0 * 1024.0 * 1024.0,
		other => return Err(format!("unknown size unit `{other}`")),
	};
	Ok((number * multiplier) as usize)
}
