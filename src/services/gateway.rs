use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("Invalid address: {0}")]
    Address(String),
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
    /// A batch of sends ran out of its shared time budget.
    #[error("Deadline of {0:?} reached")]
    DeadlineReached(Duration),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Rejected by provider: {0}")]
    Rejected(String),
    #[error("Gateway not configured")]
    NotConfigured,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub subject: String,
    pub html_body: String,
    pub from: String,
    pub to: Vec<String>,
}

#[async_trait]
pub trait EmailGateway: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), GatewayError>;
}

#[async_trait]
pub trait SmsGateway: Send + Sync {
    /// Returns the provider's message id.
    async fn send(&self, body: &str, from: &str, to: &str) -> Result<String, GatewayError>;
    async fn fetch_status(&self, message_id: &str) -> Result<String, GatewayError>;
}

/// Email gateway bound to a sender address and a per-call timeout.
#[derive(Clone)]
pub struct Mailer {
    gateway: Arc<dyn EmailGateway>,
    from: String,
    timeout: Duration,
}

impl Mailer {
    pub fn new(gateway: Arc<dyn EmailGateway>, from: String, timeout: Duration) -> Self {
        Self {
            gateway,
            from,
            timeout,
        }
    }

    pub async fn send(
        &self,
        subject: &str,
        html_body: String,
        to: Vec<String>,
    ) -> Result<(), GatewayError> {
        let message = EmailMessage {
            subject: subject.to_string(),
            html_body,
            from: self.from.clone(),
            to,
        };

        match tokio::time::timeout(self.timeout, self.gateway.send(&message)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(self.timeout)),
        }
    }
}
