use anyhow::Context;
use async_trait::async_trait;
use axum::{extract::State, Json};
use lettre::{
	message::{header::ContentType, Mailbox},
	transport::smtp::authentication::Credentials,
	AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use log::{error, info};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
	config::SmtpConfig,
	error::{ApiJson, AppError},
	state::AppState,
	users::{is_valid_email, normalize_email},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
	pub subject: String,
	pub body: String,
}

/// Outbound notification mail to the site owner.
#[async_trait]
pub trait Mailer: Send + Sync {
	async fn send(&self, message: MailMessage) -> Result<(), AppError>;
}

pub struct SmtpMailer {
	transport: AsyncSmtpTransport<Tokio1Executor>,
	from: Mailbox,
	to: Mailbox,
}

impl SmtpMailer {
	/// Port 465 uses implicit TLS, anything else STARTTLS. Nothing connects until the first send.
	pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
		let builder = if config.port == 465 {
			AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
		} else {
			AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
		}
		.with_context(|| format!("invalid SMTP host {}", config.host))?
		.port(config.port);

		let builder = match (&config.user, &config.password) {
			(Some(user), Some(password)) => builder.credentials(Credentials::new(user.clone(), password.clone())),
			_ => builder,
		};

		Ok(Self {
			transport: builder.build(),
			from: config.from.parse().with_context(|| format!("invalid MAIL_FROM {}", config.from))?,
			to: config.to.parse().with_context(|| format!("invalid MAIL_TO {}", config.to))?,
		})
	}
}

#[async_trait]
impl Mailer for SmtpMailer {
	async fn send(&self, message: MailMessage) -> Result<(), AppError> {
		let email = Message::builder()
			.from(self.from.clone())
			.to(self.to.clone())
			.subject(message.subject)
			.header(ContentType::TEXT_PLAIN)
			.body(message.body)
			.context("building email")?;

		self.transport.send(email).await.map_err(|e| {
			error!("SMTP send failed: {}", e);
			AppError::Upstream("Failed to send email".to_string())
		})?;
		Ok(())
	}
}

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
	#[serde(default)]
	pub email: Option<String>,
}

pub fn subscriber_notice(email: &str) -> MailMessage {
	MailMessage { subject: "New newsletter subscriber".to_string(), body: format!("New subscriber email: {email}") }
}

pub async fn subscribe(State(state): State<AppState>, ApiJson(request): ApiJson<SubscribeRequest>) -> Result<Json<Value>, AppError> {
	let email = request
		.email
		.map(|e| normalize_email(&e))
		.filter(|e| !e.is_empty())
		.ok_or_else(|| AppError::Validation("Email is required".to_string()))?;
	if !is_valid_email(&email) {
		return Err(AppError::Validation("Invalid email".to_string()));
	}

	state.mailer.send(subscriber_notice(&email)).await?;
	info!("Newsletter subscription forwarded for {}", email);
	Ok(Json(json!({ "success": true })))
}
