mod common;

use std::sync::atomic::Ordering;

use serde_json::{json, Value};

use common::{spawn_app, spawn_app_with};

#[tokio::test]
async fn ping_reports_health() {
	let app = spawn_app().await;
	let res = app.client.get(app.url("/api/ping")).send().await.unwrap();
	assert_eq!(res.status(), 200);

	let body: Value = res.json().await.unwrap();
	assert_eq!(body["ok"], true);
	assert_eq!(body["message"], "Server is running");
	assert_eq!(body["environment"], "development");
	assert_eq!(body["service"], "xlentcar-backend");
	assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
	assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn root_lists_the_api() {
	let app = spawn_app().await;
	let body: Value = app.client.get(app.url("/")).send().await.unwrap().json().await.unwrap();
	assert_eq!(body["message"], "XlentCar Backend API");
	assert_eq!(body["endpoints"]["cars"], "/api/cars");
	assert_eq!(body["endpoints"]["health"], "/api/ping");
}

#[tokio::test]
async fn unknown_routes_get_a_json_404() {
	let app = spawn_app().await;
	let res = app.client.get(app.url("/api/nothing/here")).send().await.unwrap();
	assert_eq!(res.status(), 404);

	let body: Value = res.json().await.unwrap();
	assert_eq!(body["error"], "Not Found");
	assert_eq!(body["message"], "Cannot GET /api/nothing/here");
	assert!(body["availableEndpoints"].as_array().is_some_and(|e| !e.is_empty()));
}

#[tokio::test]
async fn subscribe_forwards_the_address() {
	let app = spawn_app().await;
	let res = app.client.post(app.url("/api/subscribe")).json(&json!({ "email": " Fan@Example.com " })).send().await.unwrap();
	assert_eq!(res.status(), 200);
	let body: Value = res.json().await.unwrap();
	assert_eq!(body["success"], true);

	let sent = app.mailer.sent.lock().unwrap();
	assert_eq!(sent.len(), 1);
	assert_eq!(sent[0].subject, "New newsletter subscriber");
	assert_eq!(sent[0].body, "New subscriber email: fan@example.com");
}

#[tokio::test]
async fn subscribe_validates_the_email() {
	let app = spawn_app().await;

	let res = app.client.post(app.url("/api/subscribe")).json(&json!({})).send().await.unwrap();
	assert_eq!(res.status(), 400);
	let body: Value = res.json().await.unwrap();
	assert_eq!(body["message"], "Email is required");

	let res = app.client.post(app.url("/api/subscribe")).json(&json!({ "email": "nope" })).send().await.unwrap();
	assert_eq!(res.status(), 400);
	let body: Value = res.json().await.unwrap();
	assert_eq!(body["message"], "Invalid email");

	assert!(app.mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn subscribe_surfaces_mail_failures() {
	let app = spawn_app().await;
	app.mailer.fail.store(true, Ordering::SeqCst);

	let res = app.client.post(app.url("/api/subscribe")).json(&json!({ "email": "fan@example.com" })).send().await.unwrap();
	assert_eq!(res.status(), 502);
	let body: Value = res.json().await.unwrap();
	assert_eq!(body["message"], "Failed to send email");
}

#[tokio::test]
async fn allowed_origins_get_cors_headers() {
	let app = spawn_app().await;

	let res = app.client.get(app.url("/api/ping")).header("origin", "http://localhost:3000").send().await.unwrap();
	assert_eq!(res.status(), 200);
	assert_eq!(res.headers()["access-control-allow-origin"], "http://localhost:3000");
	assert_eq!(res.headers()["access-control-allow-credentials"], "true");

	let res = app
		.client
		.request(reqwest::Method::OPTIONS, app.url("/api/cars"))
		.header("origin", "http://192.168.0.12:3000")
		.header("access-control-request-method", "POST")
		.header("access-control-request-headers", "authorization,content-type")
		.send()
		.await
		.unwrap();
	assert!(res.status().is_success());
	assert_eq!(res.headers()["access-control-allow-origin"], "http://192.168.0.12:3000");
}

#[tokio::test]
async fn blocked_origins_are_forbidden() {
	let app = spawn_app().await;

	let res = app.client.get(app.url("/api/ping")).header("origin", "https://evil.example").send().await.unwrap();
	assert_eq!(res.status(), 403);
	let body: Value = res.json().await.unwrap();
	assert_eq!(body["error"], "CORS Error");
	assert_eq!(body["message"], "Origin not allowed");

	let res = app.client.get(app.url("/api/ping")).send().await.unwrap();
	assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn production_drops_private_network_origins() {
	let app = spawn_app_with(&[("NODE_ENV", "production")]).await;

	let res = app.client.get(app.url("/api/ping")).header("origin", "http://192.168.0.12:3000").send().await.unwrap();
	assert_eq!(res.status(), 403);
	let body: Value = res.json().await.unwrap();
	assert_eq!(body["allowedOrigins"], json!(["https://www.xlentcar.com", "https://xlentcar.com"]));

	let res = app.client.get(app.url("/api/ping")).header("origin", "https://xlentcar.com").send().await.unwrap();
	assert_eq!(res.status(), 200);
}
