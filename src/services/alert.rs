use futures::future::join_all;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::StoreError;
use crate::modules::auth::interface::UserRepository;
use crate::modules::auth::model::{normalize_email, User};
use crate::modules::emergency::interface::AlertRepository;
use crate::modules::emergency::model::{AlertStatus, EmergencyAlert, NewAlert};
use crate::modules::profile::interface::ProfileRepository;
use crate::modules::profile::model::UserProfile;
use crate::services::clock::Clock;
use crate::services::gateway::{GatewayError, Mailer, SmsGateway};
use crate::services::phone::collect_phones;
use crate::services::templates;

pub const DEFAULT_ALERT_MESSAGE: &str = "Emergency! I need help.";
pub const NO_PHONES_MESSAGE: &str = "No emergency phone numbers configured";

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("User not found")]
    UserNotFound,

    #[error("Alert not found")]
    NotFound,

    #[error("No alert recipients configured")]
    NoRecipientsConfigured,

    #[error("Invalid status '{0}'. Expected one of PENDING, IN_PROGRESS, RESOLVED")]
    InvalidStatus(String),

    #[error("Failed to send alert email: {0}")]
    DispatchFailed(GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct AlertConfig {
    pub authority_emails: Vec<String>,
    pub default_country_code: String,
    pub sms_from: String,
    pub sms_timeout: Duration,
    pub sms_total_timeout: Duration,
}

/// Everything a trigger call needs besides the resolved user.
#[derive(Debug, Clone, Default)]
pub struct AlertRequest {
    pub user_id: Option<i64>,
    pub email: Option<String>,
    pub message: String,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub address: String,
    pub extra_recipients: Vec<String>,
    pub phones: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmsFailure {
    pub phone: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmsOutcome {
    pub sent: bool,
    pub recipients: Vec<String>,
    pub errors: Vec<SmsFailure>,
    /// Set whenever no message went out.
    pub summary: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AlertOutcome {
    pub alert: EmergencyAlert,
    pub email_recipients: Vec<String>,
    pub sms: SmsOutcome,
}

pub struct AlertDispatcher {
    users: Arc<dyn UserRepository>,
    profiles: Arc<dyn ProfileRepository>,
    alerts: Arc<dyn AlertRepository>,
    mailer: Mailer,
    sms: Arc<dyn SmsGateway>,
    clock: Arc<dyn Clock>,
    config: AlertConfig,
}

impl AlertDispatcher {
    pub fn new(
        users: Arc<dyn UserRepository>,
        profiles: Arc<dyn ProfileRepository>,
        alerts: Arc<dyn AlertRepository>,
        mailer: Mailer,
        sms: Arc<dyn SmsGateway>,
        clock: Arc<dyn Clock>,
        config: AlertConfig,
    ) -> Self {
        Self {
            users,
            profiles,
            alerts,
            mailer,
            sms,
            clock,
            config,
        }
    }

    async fn resolve_actor(&self, request: &AlertRequest) -> Result<User, AlertError> {
        if let Some(id) = request.user_id {
            if let Some(user) = self.users.find_by_id(id).await? {
                return Ok(user);
            }
        }
        if let Some(email) = request.email.as_deref() {
            if let Some(user) = self.users.find_by_email(&normalize_email(email)).await? {
                return Ok(user);
            }
        }
        Err(AlertError::UserNotFound)
    }

    fn email_recipients(&self, request: &AlertRequest, profile: &UserProfile) -> Vec<String> {
        let recipients: BTreeSet<String> = self
            .config
            .authority_emails
            .iter()
            .chain(request.extra_recipients.iter())
            .chain(profile.emergency_email.iter())
            .map(|e| normalize_email(e))
            .filter(|e| !e.is_empty())
            .collect();
        recipients.into_iter().collect()
    }

    pub async fn trigger(&self, request: AlertRequest) -> Result<AlertOutcome, AlertError> {
        let user = self.resolve_actor(&request).await?;
        let now = self.clock.now();
        let profile = self
            .profiles
            .find_by_user(user.id)
            .await?
            .unwrap_or_else(|| UserProfile::empty(user.id, now));

        let recipients = self.email_recipients(&request, &profile);
        if recipients.is_empty() {
            tracing::warn!("Alert from user {} has no recipients", user.id);
            return Err(AlertError::NoRecipientsConfigured);
        }

        let message = match request.message.trim() {
            "" => DEFAULT_ALERT_MESSAGE.to_string(),
            text => text.to_string(),
        };

        let snapshot = NewAlert {
            user_id: Some(user.id),
            name: user.display_name(),
            email: user.email.clone(),
            phone: user.contact_no.clone().unwrap_or_default(),
            blood_group: profile
                .blood_group
                .map(|g| g.as_str().to_string())
                .unwrap_or_default(),
            height_cm: profile.height_cm,
            weight_kg: profile.weight_kg,
            latitude: request.latitude,
            longitude: request.longitude,
            address: request.address.trim().to_string(),
            message,
            emergency_contact_phone: profile.relative_mobile_no.clone(),
            emergency_email: profile.emergency_email.clone().unwrap_or_default(),
            created_at: now,
        };

        self.mailer
            .send(
                templates::ALERT_SUBJECT,
                templates::alert_email(&snapshot),
                recipients.clone(),
            )
            .await
            .map_err(|e| {
                tracing::warn!("Alert email for user {} failed: {}", user.id, e);
                AlertError::DispatchFailed(e)
            })?;

        let candidates = std::iter::once(profile.relative_mobile_no.as_str())
            .chain(profile.relatives_mobile_numbers.iter().map(String::as_str))
            .chain(request.phones.iter().map(String::as_str));
        let sms = self
            .send_sms(&templates::alert_sms(&snapshot), candidates)
            .await;

        let alert = self.alerts.create(&snapshot).await?;
        tracing::info!(
            "Alert #{} created for user {}: {} email recipients, {} SMS delivered, {} SMS failed",
            alert.id,
            user.id,
            recipients.len(),
            sms.recipients.len(),
            sms.errors.len()
        );

        Ok(AlertOutcome {
            alert,
            email_recipients: recipients,
            sms,
        })
    }

    async fn send_sms<'a, I>(&self, body: &str, candidates: I) -> SmsOutcome
    where
        I: IntoIterator<Item = &'a str>,
    {
        let phones = collect_phones(candidates, &self.config.default_country_code);

        let mut outcome = SmsOutcome {
            errors: phones
                .invalid
                .into_iter()
                .map(|phone| SmsFailure {
                    phone,
                    error: "Invalid phone number".to_string(),
                })
                .collect(),
            ..SmsOutcome::default()
        };

        if phones.valid.is_empty() {
            outcome.summary = Some(NO_PHONES_MESSAGE.to_string());
            return outcome;
        }

        let deadline = Instant::now() + self.config.sms_total_timeout;
        let attempts = phones.valid.iter().map(|phone| async move {
            let per_number = Instant::now() + self.config.sms_timeout;
            let (cutoff, expired) = if per_number < deadline {
                (per_number, GatewayError::Timeout(self.config.sms_timeout))
            } else {
                (deadline, GatewayError::DeadlineReached(self.config.sms_total_timeout))
            };
            let result = match tokio::time::timeout_at(
                cutoff,
                self.sms.send(body, &self.config.sms_from, phone),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(expired),
            };
            (phone.clone(), result)
        });

        for (phone, result) in join_all(attempts).await {
            match result {
                Ok(message_id) => {
                    tracing::debug!("SMS {} queued for {}", message_id, phone);
                    outcome.recipients.push(phone);
                }
                Err(e) => {
                    tracing::warn!("SMS to {} failed: {}", phone, e);
                    outcome.errors.push(SmsFailure {
                        phone,
                        error: e.to_string(),
                    });
                }
            }
        }

        outcome.sent = !outcome.recipients.is_empty();
        if !outcome.sent {
            outcome.summary = Some(format!(
                "SMS delivery failed for all {} numbers",
                phones.valid.len()
            ));
        }
        outcome
    }

    pub async fn list(&self, status: Option<&str>) -> Result<Vec<EmergencyAlert>, AlertError> {
        let status = status.map(parse_status).transpose()?;
        Ok(self.alerts.list(status).await?)
    }

    pub async fn set_status(&self, id: i64, status: &str) -> Result<EmergencyAlert, AlertError> {
        let status = parse_status(status)?;
        let alert = self
            .alerts
            .set_status(id, status, self.clock.now())
            .await?
            .ok_or(AlertError::NotFound)?;
        tracing::info!("Alert #{} moved to {}", alert.id, alert.status);
        Ok(alert)
    }
}

fn parse_status(raw: &str) -> Result<AlertStatus, AlertError> {
    raw.trim()
        .parse::<AlertStatus>()
        .map_err(AlertError::InvalidStatus)
}
