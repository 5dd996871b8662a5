use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use validator::ValidateEmail;

use crate::error::ApiError;
use crate::services::alert::{AlertOutcome, AlertRequest, SmsFailure};

/// Coordinates arrive as JSON numbers or numeric strings; `""` means absent.
fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(serde_json::Number),
        Text(String),
    }

    let raw = match Option::<Raw>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(Raw::Number(n)) => n.to_string(),
        Some(Raw::Text(s)) if s.trim().is_empty() => return Ok(None),
        Some(Raw::Text(s)) => s.trim().to_string(),
    };

    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map(|d| Some(d.round_dp(6)))
        .map_err(|_| serde::de::Error::custom(format!("'{}' is not a number", raw)))
}

/// A list of strings, or one comma separated string.
fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Raw::List(items)) => items,
        Some(Raw::Text(text)) => text.split(',').map(str::to_string).collect(),
    }
    .into_iter()
    .map(|s| s.trim().to_string())
    .filter(|s| !s.is_empty())
    .collect())
}

#[derive(Debug, Default, Deserialize)]
pub struct TriggerAlertRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "lat", deserialize_with = "lenient_decimal")]
    pub latitude: Option<Decimal>,
    #[serde(default, alias = "lng", alias = "long", deserialize_with = "lenient_decimal")]
    pub longitude: Option<Decimal>,
    #[serde(default)]
    pub address: String,
    #[serde(default, alias = "phone_numbers", deserialize_with = "string_list")]
    pub phones: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub extra_recipients: Vec<String>,
}

impl TriggerAlertRequest {
    /// Checks coordinates and extra recipients. The actor is resolved by the caller.
    pub fn into_alert_request(self) -> Result<AlertRequest, ApiError> {
        if let Some(lat) = self.latitude {
            if lat < Decimal::from(-90) || lat > Decimal::from(90) {
                return Err(ApiError::validation("latitude must be between -90 and 90"));
            }
        }
        if let Some(lng) = self.longitude {
            if lng < Decimal::from(-180) || lng > Decimal::from(180) {
                return Err(ApiError::validation("longitude must be between -180 and 180"));
            }
        }
        if let Some(bad) = self.extra_recipients.iter().find(|e| !e.validate_email()) {
            return Err(ApiError::validation(format!(
                "Invalid email in extra_recipients: {}",
                bad
            )));
        }

        Ok(AlertRequest {
            user_id: self.user_id,
            email: self.email.filter(|e| !e.trim().is_empty()),
            message: self.message,
            latitude: self.latitude,
            longitude: self.longitude,
            address: self.address,
            extra_recipients: self.extra_recipients,
            phones: self.phones,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct TriggerAlertResponse {
    pub success: bool,
    pub message: &'static str,
    pub alert_id: i64,
    pub status: String,
    pub email_sent: bool,
    pub email_recipients: Vec<String>,
    pub sms_sent: bool,
    pub sms_recipients: Vec<String>,
    pub sms_errors: Vec<SmsFailure>,
    pub sms_error: Option<String>,
}

impl From<AlertOutcome> for TriggerAlertResponse {
    fn from(outcome: AlertOutcome) -> Self {
        Self {
            success: true,
            message: "Emergency alert sent",
            alert_id: outcome.alert.id,
            status: outcome.alert.status.to_string(),
            email_sent: true,
            email_recipients: outcome.email_recipients,
            sms_sent: outcome.sms.sent,
            sms_recipients: outcome.sms.recipients,
            sms_errors: outcome.sms.errors,
            sms_error: outcome.sms.summary,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListAlertsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}
