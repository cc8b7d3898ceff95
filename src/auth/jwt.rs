use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::Error as JwtError, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
	pub id: Uuid,
	pub email: String,
	pub iat: i64,
	pub exp: i64,
}

/// HS256 signing material plus the lifetime of issued tokens.
#[derive(Clone)]
pub struct JwtKeys {
	encoding: EncodingKey,
	decoding: DecodingKey,
	ttl: Duration,
}

impl JwtKeys {
	pub fn new(secret: &str, ttl_hours: i64) -> Self {
		Self {
			encoding: EncodingKey::from_secret(secret.as_bytes()),
			decoding: DecodingKey::from_secret(secret.as_bytes()),
			ttl: Duration::hours(ttl_hours),
		}
	}

	/// Returns the token and its expiry as a unix timestamp.
	pub fn issue(&self, id: Uuid, email: &str) -> Result<(String, i64), JwtError> {
		let now = Utc::now();
		let claims = Claims { id, email: email.to_string(), iat: now.timestamp(), exp: (now + self.ttl).timestamp() };
		let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
		Ok((token, claims.exp))
	}

	pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
		let validation = Validation::new(Algorithm::HS256);
		Ok(decode::<Claims>(token, &self.decoding, &validation)?.claims)
	}

	#[cfg(test)]
	pub(crate) fn sign(&self, claims: &Claims) -> String {
		encode(&Header::new(Algorithm::HS256), claims, &self.encoding).unwrap()
	}
}
