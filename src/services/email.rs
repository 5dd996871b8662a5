use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::time::Duration;

use crate::services::gateway::{EmailGateway, EmailMessage, GatewayError};

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

/// SMTP delivery over STARTTLS.
pub struct SmtpEmailGateway {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpEmailGateway {
    pub fn new(config: &SmtpConfig) -> Result<Self, GatewayError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| GatewayError::Transport(e.to_string()))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .timeout(Some(config.timeout))
            .build();

        Ok(Self { transport })
    }
}

fn mailbox(address: &str) -> Result<Mailbox, GatewayError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| GatewayError::Address(format!("{}: {}", address, e)))
}

#[async_trait]
impl EmailGateway for SmtpEmailGateway {
    async fn send(&self, message: &EmailMessage) -> Result<(), GatewayError> {
        let mut builder = Message::builder()
            .from(mailbox(&message.from)?)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_HTML);

        for to in &message.to {
            builder = builder.to(mailbox(to)?);
        }

        let email = builder
            .body(message.html_body.clone())
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(())
    }
}

/// Writes messages to the log instead of sending them. Local development only.
#[derive(Debug, Default)]
pub struct LogEmailGateway;

#[async_trait]
impl EmailGateway for LogEmailGateway {
    async fn send(&self, message: &EmailMessage) -> Result<(), GatewayError> {
        tracing::info!(
            from = %message.from,
            to = ?message.to,
            subject = %message.subject,
            "Email (log backend):\n{}",
            message.html_body
        );
        Ok(())
    }
}
