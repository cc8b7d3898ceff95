//! Just enough of GoTrue, PostgREST and Storage to drive the supabase backend.

use std::{
	collections::HashMap,
	net::SocketAddr,
	sync::{Arc, Mutex, MutexGuard},
};

use axum::{
	body::Bytes,
	extract::{Path, Query, State},
	http::{header::AUTHORIZATION, HeaderMap, StatusCode},
	response::{IntoResponse, Response},
	routing::{get, post},
	Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use uuid::Uuid;

pub const BUCKET: &str = "car-photos";

#[derive(Debug, Clone)]
pub struct AuthUser {
	pub id: Uuid,
	pub email: String,
	pub password: String,
	pub confirmed: bool,
	pub metadata: Value,
}

impl AuthUser {
	fn to_json(&self) -> Value {
		json!({ "id": self.id, "email": self.email, "aud": "authenticated", "user_metadata": self.metadata })
	}

	fn token(&self) -> String {
		format!("mock-{}", self.id)
	}
}

#[derive(Default)]
pub struct MockData {
	pub users: Vec<AuthUser>,
	pub profiles: Vec<Value>,
	pub cars: Vec<Value>,
	/// `<bucket>/<key>` to bytes.
	pub objects: HashMap<String, Bytes>,
	pub reject_car_inserts: bool,
}

#[derive(Clone)]
pub struct SupabaseMock {
	pub addr: SocketAddr,
	data: Arc<Mutex<MockData>>,
}

type Shared = Arc<Mutex<MockData>>;

impl SupabaseMock {
	pub async fn spawn() -> Self {
		let data: Shared = Arc::default();
		let app = Router::new()
			.route("/auth/v1/signup", post(signup))
			.route("/auth/v1/token", post(token))
			.route("/auth/v1/user", get(current_user))
			.route("/auth/v1/logout", post(|| async { StatusCode::NO_CONTENT }))
			.route("/rest/v1/:table", get(rest_select).post(rest_insert).delete(rest_delete))
			.route("/storage/v1/object/*path", get(object_get).post(object_put).delete(object_delete))
			.with_state(data.clone());

		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});
		Self { addr, data }
	}

	pub fn url(&self) -> String {
		format!("http://{}", self.addr)
	}

	pub fn public_prefix(&self) -> String {
		format!("{}/storage/v1/object/public/{}/", self.url(), BUCKET)
	}

	pub fn data(&self) -> MutexGuard<'_, MockData> {
		self.data.lock().unwrap()
	}

	/// An auth account with metadata but no `profiles` row.
	pub fn add_auth_user(&self, email: &str, password: &str, metadata: Value) -> Uuid {
		let id = Uuid::new_v4();
		self.data().users.push(AuthUser { id, email: email.to_string(), password: password.to_string(), confirmed: true, metadata });
		id
	}
}

fn error(status: StatusCode, body: Value) -> Response {
	(status, Json(body)).into_response()
}

async fn signup(State(data): State<Shared>, Json(body): Json<Value>) -> Response {
	let email = body["email"].as_str().unwrap_or_default().to_lowercase();
	let password = body["password"].as_str().unwrap_or_default().to_string();
	if password.len() < 6 {
		return error(StatusCode::UNPROCESSABLE_ENTITY, json!({ "code": 422, "msg": "Password should be at least 6 characters" }));
	}

	let mut data = data.lock().unwrap();
	if data.users.iter().any(|u| u.email == email) {
		return error(StatusCode::BAD_REQUEST, json!({ "code": 400, "msg": "User already registered" }));
	}

	let user = AuthUser {
		id: Uuid::new_v4(),
		confirmed: !email.starts_with("unconfirmed"),
		email,
		password,
		metadata: body["data"].clone(),
	};
	data.users.push(user.clone());

	if user.confirmed {
		Json(json!({ "access_token": user.token(), "token_type": "bearer", "user": user.to_json() })).into_response()
	} else {
		Json(user.to_json()).into_response()
	}
}

async fn token(State(data): State<Shared>, Json(body): Json<Value>) -> Response {
	let email = body["email"].as_str().unwrap_or_default();
	let password = body["password"].as_str().unwrap_or_default();
	let data = data.lock().unwrap();

	let Some(user) = data.users.iter().find(|u| u.email == email && u.password == password) else {
		return error(StatusCode::BAD_REQUEST, json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" }));
	};
	if !user.confirmed {
		return error(StatusCode::BAD_REQUEST, json!({ "error": "invalid_grant", "error_description": "Email not confirmed" }));
	}

	Json(json!({
		"access_token": user.token(),
		"token_type": "bearer",
		"expires_in": 3600,
		"refresh_token": format!("refresh-{}", user.id),
		"user": user.to_json(),
	}))
	.into_response()
}

async fn current_user(State(data): State<Shared>, headers: HeaderMap) -> Response {
	let token = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()).and_then(|v| v.strip_prefix("Bearer ")).unwrap_or_default();
	let data = data.lock().unwrap();
	match data.users.iter().find(|u| u.token() == token) {
		Some(user) => Json(user.to_json()).into_response(),
		None => error(StatusCode::UNAUTHORIZED, json!({ "msg": "invalid JWT" })),
	}
}

fn table<'a>(data: &'a mut MockData, name: &str) -> &'a mut Vec<Value> {
	match name {
		"profiles" => &mut data.profiles,
		"cars" => &mut data.cars,
		other => panic!("unexpected table {other}"),
	}
}

/// Only `eq.` filters are understood; `select`, `order` and `limit` pass through.
fn matches(row: &Value, filters: &[(String, String)]) -> bool {
	filters.iter().all(|(column, filter)| match filter.strip_prefix("eq.") {
		Some(expected) => row[column.as_str()].as_str() == Some(expected),
		None => true,
	})
}

async fn rest_select(State(data): State<Shared>, Path(name): Path<String>, Query(filters): Query<Vec<(String, String)>>) -> Response {
	let mut data = data.lock().unwrap();
	let mut rows: Vec<Value> = table(&mut data, &name).iter().filter(|row| matches(row, &filters)).cloned().collect();
	if filters.iter().any(|(k, v)| k == "order" && v.ends_with(".desc")) {
		rows.reverse();
	}
	if let Some(limit) = filters.iter().find(|(k, _)| k == "limit").and_then(|(_, v)| v.parse().ok()) {
		rows.truncate(limit);
	}
	Json(rows).into_response()
}

async fn rest_insert(State(data): State<Shared>, Path(name): Path<String>, Json(row): Json<Value>) -> Response {
	let mut data = data.lock().unwrap();
	let unique: &[&str] = match name.as_str() {
		"profiles" => &["id", "email"],
		_ => &["id", "car_number"],
	};
	let clash = (name == "cars" && data.reject_car_inserts)
		|| table(&mut data, &name).iter().any(|existing| unique.iter().any(|col| existing[*col] == row[*col]));
	if clash {
		return error(StatusCode::CONFLICT, json!({ "code": "23505", "message": "duplicate key value violates unique constraint" }));
	}
	table(&mut data, &name).push(row);
	StatusCode::CREATED.into_response()
}

async fn rest_delete(State(data): State<Shared>, Path(name): Path<String>, Query(filters): Query<Vec<(String, String)>>) -> Response {
	let mut data = data.lock().unwrap();
	let rows = table(&mut data, &name);
	let (removed, kept): (Vec<Value>, Vec<Value>) = rows.drain(..).partition(|row| matches(row, &filters));
	*rows = kept;
	Json(removed).into_response()
}

async fn object_put(State(data): State<Shared>, Path(path): Path<String>, headers: HeaderMap, body: Bytes) -> Response {
	if headers.get("apikey").is_none() {
		return error(StatusCode::UNAUTHORIZED, json!({ "message": "apikey required" }));
	}
	let mut data = data.lock().unwrap();
	if data.objects.contains_key(&path) {
		return error(StatusCode::CONFLICT, json!({ "message": "The resource already exists" }));
	}
	data.objects.insert(path.clone(), body);
	Json(json!({ "Key": path })).into_response()
}

async fn object_get(State(data): State<Shared>, Path(path): Path<String>) -> Response {
	let data = data.lock().unwrap();
	match path.strip_prefix("public/").and_then(|key| data.objects.get(key)) {
		Some(bytes) => bytes.clone().into_response(),
		None => error(StatusCode::NOT_FOUND, json!({ "message": "Object not found" })),
	}
}

async fn object_delete(State(data): State<Shared>, Path(bucket): Path<String>, Json(body): Json<Value>) -> Response {
	let mut data = data.lock().unwrap();
	let mut removed = Vec::new();
	for key in body["prefixes"].as_array().into_iter().flatten().filter_map(Value::as_str) {
		let path = format!("{bucket}/{key}");
		if data.objects.remove(&path).is_some() {
			removed.push(json!({ "name": key }));
		}
	}
	Json(removed).into_response()
}
