#![allow(dead_code)]

pub mod supabase_mock;

use std::{
	collections::HashMap,
	net::SocketAddr,
	path::Path,
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc, Mutex,
	},
};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;
use xlentcar_server::{
	config::Config,
	error::AppError,
	server,
	state::AppState,
	subscribe::{MailMessage, Mailer},
};

/// Keeps every message instead of talking to an SMTP server.
#[derive(Default)]
pub struct RecordingMailer {
	pub sent: Mutex<Vec<MailMessage>>,
	pub fail: AtomicBool,
}

#[async_trait]
impl Mailer for RecordingMailer {
	async fn send(&self, message: MailMessage) -> Result<(), AppError> {
		if self.fail.load(Ordering::SeqCst) {
			return Err(AppError::Upstream("Failed to send email".to_string()));
		}
		self.sent.lock().unwrap().push(message);
		Ok(())
	}
}

pub struct TestApp {
	pub addr: SocketAddr,
	pub client: Client,
	pub mailer: Arc<RecordingMailer>,
	pub uploads: TempDir,
}

impl TestApp {
	pub fn url(&self, path: &str) -> String {
		format!("http://{}{}", self.addr, path)
	}

	/// Files currently written under the upload dir, at any depth.
	pub fn stored_files(&self) -> usize {
		count_files(self.uploads.path())
	}

	pub async fn register(&self, email: &str, password: &str) -> reqwest::Response {
		self.client
			.post(self.url("/api/auth/register"))
			.json(&json!({ "customer_name": "Test Driver", "email": email, "password": password }))
			.send()
			.await
			.unwrap()
	}

	pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
		self.client
			.post(self.url("/api/auth/login"))
			.json(&json!({ "email": email, "password": password }))
			.send()
			.await
			.unwrap()
	}

	/// Registers a fresh account and returns its bearer token.
	pub async fn token_for(&self, email: &str) -> String {
		assert_eq!(self.register(email, "hunter22").await.status(), 201);
		let body: Value = self.login(email, "hunter22").await.json().await.unwrap();
		body["token"].as_str().unwrap().to_string()
	}

	pub async fn add_car(&self, token: &str, model: &str, number: &str) -> reqwest::Response {
		self.client
			.post(self.url("/api/cars"))
			.bearer_auth(token)
			.json(&json!({ "car_model": model, "car_number": number, "car_location": "Nairobi" }))
			.send()
			.await
			.unwrap()
	}
}

pub async fn spawn_app() -> TestApp {
	spawn_app_with(&[]).await
}

pub async fn spawn_app_with(overrides: &[(&str, &str)]) -> TestApp {
	spawn_app_customized(overrides, |state| state).await
}

/// The full router on the supabase backend, talking to an in-process mock of the Supabase APIs.
pub async fn spawn_supabase_app() -> (TestApp, supabase_mock::SupabaseMock) {
	let mock = supabase_mock::SupabaseMock::spawn().await;
	let url = mock.url();
	let app = spawn_app_with(&[("STORE_BACKEND", "supabase"), ("SUPABASE_URL", url.as_str()), ("SUPABASE_ANON_KEY", "anon-key")]).await;
	(app, mock)
}

/// Runs the full router on the memory backend, bound to an ephemeral port.
/// `customize` can swap state handles for test doubles before serving.
pub async fn spawn_app_customized<F>(overrides: &[(&str, &str)], customize: F) -> TestApp
where
	F: FnOnce(AppState) -> AppState,
{
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	let uploads = tempfile::tempdir().unwrap();

	let mut vars: HashMap<String, String> = HashMap::from([
		("STORE_BACKEND".to_string(), "memory".to_string()),
		("JWT_SECRET".to_string(), "integration-test-secret".to_string()),
		("BCRYPT_COST".to_string(), "4".to_string()),
		("UPLOAD_DIR".to_string(), uploads.path().display().to_string()),
		("PUBLIC_BASE_URL".to_string(), format!("http://{addr}")),
		("MAX_UPLOAD_BYTES".to_string(), "4kb".to_string()),
		("MAX_UPLOAD_FILES".to_string(), "3".to_string()),
	]);
	for (key, value) in overrides {
		vars.insert(key.to_string(), value.to_string());
	}

	let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();
	let mailer = Arc::new(RecordingMailer::default());
	let state = AppState::connect(config).await.unwrap().with_mailer(mailer.clone());
	let app = server::router(customize(state));

	tokio::spawn(async move {
		axum::serve(listener, app).await.unwrap();
	});

	TestApp { addr, client: Client::new(), mailer, uploads }
}

fn count_files(dir: &Path) -> usize {
	std::fs::read_dir(dir)
		.map(|entries| {
			entries
				.flatten()
				.map(|entry| {
					let path = entry.path();
					if path.is_dir() {
						count_files(&path)
					} else {
						1
					}
				})
				.sum()
		})
		.unwrap_or(0)
}

pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01\x08\x06\0\0\0\x1f\x15\xc4\x89";
