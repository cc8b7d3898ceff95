use std::{net::Ipv4Addr, sync::Arc};

use axum::{
	extract::{Request, State},
	http::{
		header::{AUTHORIZATION, CONTENT_TYPE, ORIGIN},
		HeaderName, HeaderValue, Method, StatusCode,
	},
	middleware::Next,
	response::{IntoResponse, Response},
	Json,
};
use log::warn;
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::Config;

pub const PRODUCTION_ORIGINS: [&str; 2] = ["https://www.xlentcar.com", "https://xlentcar.com"];

const STATIC_ORIGINS: [&str; 5] = [
	"https://www.xlentcar.com",
	"https://xlentcar.com",
	"https://xlentcar.vercel.app",
	"http://localhost:3000",
	"http://127.0.0.1:3000",
];

/// Static allow-list, plus private-network dev servers outside production.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
	origins: Vec<String>,
	production: bool,
}

impl OriginPolicy {
	pub fn from_config(config: &Config) -> Self {
		let mut origins: Vec<String> = STATIC_ORIGINS.iter().map(|o| o.to_string()).collect();
		for extra in &config.cors_origins {
			if !origins.contains(extra) {
				origins.push(extra.clone());
			}
		}
		Self { origins, production: config.is_production() }
	}

	pub fn allows(&self, origin: &str) -> bool {
		self.origins.iter().any(|o| o == origin) || (!self.production && is_private_dev_origin(origin))
	}

	/// What a rejected caller is told it may use.
	pub fn advertised(&self) -> Vec<String> {
		if self.production {
			PRODUCTION_ORIGINS.iter().map(|o| o.to_string()).collect()
		} else {
			self.origins.clone()
		}
	}

	pub fn cors_layer(self: Arc<Self>) -> CorsLayer {
		CorsLayer::new()
			.allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
				origin.to_str().map(|o| self.allows(o)).unwrap_or(false)
			}))
			.allow_credentials(true)
			.allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS, Method::PATCH])
			.allow_headers([CONTENT_TYPE, AUTHORIZATION, HeaderName::from_static("x-requested-with")])
	}
}

/// `http://<private IPv4>:3000`, i.e. the frontend dev server on a LAN address.
fn is_private_dev_origin(origin: &str) -> bool {
	origin
		.strip_prefix("http://")
		.and_then(|rest| rest.strip_suffix(":3000"))
		.and_then(|host| host.parse::<Ipv4Addr>().ok())
		.is_some_and(|ip| ip.is_private())
}

/// Requests without an Origin header (curl, mobile apps) always pass.
pub async fn reject_disallowed_origin(State(policy): State<Arc<OriginPolicy>>, req: Request, next: Next) -> Response {
	let origin = req.headers().get(ORIGIN).map(|o| o.to_str().unwrap_or_default().to_string());

	match origin {
		Some(origin) if !policy.allows(&origin) => {
			warn!("Blocked origin: {}", origin);
			let body = Json(json!({
				"error": "CORS Error",
				"message": "Origin not allowed",
				"allowedOrigins": policy.advertised(),
			}));
			(StatusCode::FORBIDDEN, body).into_response()
		}
		_ => next.run(req).await,
	}
}
