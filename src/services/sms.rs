use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::services::gateway::{GatewayError, SmsGateway};

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct TwilioMessage {
    sid: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    message: Option<String>,
    code: Option<i64>,
}

/// Twilio Programmable Messaging over its REST API.
pub struct TwilioSmsGateway {
    client: Client,
    account_sid: String,
    auth_token: String,
    base_url: String,
    timeout: Duration,
}

impl TwilioSmsGateway {
    pub fn new(config: &TwilioConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            base_url: "https://api.twilio.com/2010-04-01".to_string(),
            timeout: config.timeout,
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/Accounts/{}/Messages", self.base_url, self.account_sid)
    }

    async fn read_message(&self, response: reqwest::Response) -> Result<TwilioMessage, GatewayError> {
        if !response.status().is_success() {
            let status = response.status();
            let detail = match response.json::<TwilioErrorBody>().await {
                Ok(TwilioErrorBody {
                    message: Some(message),
                    code,
                }) => match code {
                    Some(code) => format!("{} (code {})", message, code),
                    None => message,
                },
                _ => format!("API returned status: {}", status),
            };
            return Err(GatewayError::Rejected(detail));
        }

        response
            .json::<TwilioMessage>()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))
    }
}

fn transport_error(e: reqwest::Error, timeout: Duration) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout(timeout)
    } else {
        GatewayError::Transport(e.to_string())
    }
}

#[async_trait]
impl SmsGateway for TwilioSmsGateway {
    async fn send(&self, body: &str, from: &str, to: &str) -> Result<String, GatewayError> {
        let response = self
            .client
            .post(format!("{}.json", self.messages_url()))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", from), ("Body", body)])
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        let message = self.read_message(response).await?;
        tracing::debug!("Twilio accepted message {} to {} ({})", message.sid, to, message.status);
        Ok(message.sid)
    }

    async fn fetch_status(&self, message_id: &str) -> Result<String, GatewayError> {
        let response = self
            .client
            .get(format!("{}/{}.json", self.messages_url(), message_id))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        Ok(self.read_message(response).await?.status)
    }
}

/// Used when no SMS provider is configured; every attempt fails without I/O.
#[derive(Debug, Default)]
pub struct DisabledSmsGateway;

#[async_trait]
impl SmsGateway for DisabledSmsGateway {
    async fn send(&self, _body: &str, _from: &str, _to: &str) -> Result<String, GatewayError> {
        Err(GatewayError::NotConfigured)
    }

    async fn fetch_status(&self, _message_id: &str) -> Result<String, GatewayError> {
        Err(GatewayError::NotConfigured)
    }
}
