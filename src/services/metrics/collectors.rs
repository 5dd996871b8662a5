use std::sync::Arc;

use super::MetricsRegistry;
use crate::services::alert::{AlertError, SmsOutcome};
use crate::services::otp::OtpError;

fn otp_outcome(result: &Result<(), &OtpError>) -> &'static str {
    match result {
        Ok(()) => "success",
        Err(OtpError::UserNotFound) => "user_not_found",
        Err(OtpError::TooSoon { .. }) => "too_soon",
        Err(OtpError::RateLimited { .. }) => "rate_limited",
        Err(OtpError::InvalidCode) => "invalid_code",
        Err(OtpError::Expired) => "expired",
        Err(OtpError::AlreadyConsumed) => "already_consumed",
        Err(OtpError::NotificationFailed(_)) => "notification_failed",
        Err(OtpError::Store(_)) => "store_error",
    }
}

/// Collector for OTP issuance and verification
pub struct OtpMetricsCollector {
    metrics: Arc<MetricsRegistry>,
}

impl OtpMetricsCollector {
    pub fn new(metrics: Arc<MetricsRegistry>) -> Self {
        Self { metrics }
    }

    pub fn record_issue<T>(&self, result: &Result<T, OtpError>) {
        let outcome = otp_outcome(&result.as_ref().map(|_| ()));
        self.metrics
            .otp_issued_total
            .with_label_values(&[outcome])
            .inc();
    }

    pub fn record_verify<T>(&self, result: &Result<T, OtpError>) {
        let outcome = otp_outcome(&result.as_ref().map(|_| ()));
        self.metrics
            .otp_verified_total
            .with_label_values(&[outcome])
            .inc();
    }
}

/// Collector for alert triggers and their SMS fan-out
pub struct AlertMetricsCollector {
    metrics: Arc<MetricsRegistry>,
}

impl AlertMetricsCollector {
    pub fn new(metrics: Arc<MetricsRegistry>) -> Self {
        Self { metrics }
    }

    pub fn record_trigger_failed(&self, err: &AlertError) {
        let outcome = match err {
            AlertError::UserNotFound => "user_not_found",
            AlertError::NoRecipientsConfigured => "no_recipients",
            AlertError::DispatchFailed(_) => "dispatch_failed",
            _ => "error",
        };
        self.metrics
            .alerts_triggered_total
            .with_label_values(&[outcome])
            .inc();
    }

    pub fn record_trigger(&self, sms: &SmsOutcome) {
        self.metrics
            .alerts_triggered_total
            .with_label_values(&["created"])
            .inc();
        self.metrics
            .sms_attempts_total
            .with_label_values(&["sent"])
            .inc_by(sms.recipients.len() as f64);
        self.metrics
            .sms_attempts_total
            .with_label_values(&["failed"])
            .inc_by(sms.errors.len() as f64);
    }
}
