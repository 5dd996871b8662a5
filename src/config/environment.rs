use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::services::email::SmtpConfig;
use crate::services::otp::OtpPolicy;
use crate::services::sms::TwilioConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    MySql,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailBackend {
    Smtp,
    Log,
}

/// Environment configuration
/// Loads and validates environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub token_secret: String,
    pub token_max_age_secs: i64,
    pub otp_code_length: u32,
    pub otp_resend_cooldown_secs: i64,
    pub otp_block_window_minutes: i64,
    pub otp_max_sends_per_window: i32,
    pub otp_expiry_minutes: i64,
    pub authority_alert_emails: Vec<String>,
    pub default_phone_country_code: String,
    pub email_backend: EmailBackend,
    pub smtp: Option<SmtpConfig>,
    pub email_from: String,
    pub email_timeout_secs: u64,
    pub twilio: Option<TwilioConfig>,
    pub sms_timeout_secs: u64,
    pub sms_total_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub rate_limit_burst: u32,
    /// Take the client address from `X-Real-IP` / `X-Forwarded-For`. Only safe
    /// behind a reverse proxy that overwrites those headers.
    pub trust_proxy_headers: bool,
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T, String> {
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| format!("{} has an invalid value: '{}'", name, raw)),
        _ => Ok(default),
    }
}

fn positive<T: PartialOrd + Default + Copy>(name: &str, value: T) -> Result<T, String> {
    if value > T::default() {
        Ok(value)
    } else {
        Err(format!("{} must be greater than zero", name))
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let storage = match get("STORAGE").as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("mysql") => StorageBackend::MySql,
            Some("memory") => StorageBackend::Memory,
            Some(other) => return Err(format!("STORAGE must be 'mysql' or 'memory', got '{}'", other)),
        };

        let database_url = get("DATABASE_URL");
        if storage == StorageBackend::MySql && database_url.is_none() {
            return Err("DATABASE_URL must be set".to_string());
        }

        let token_secret = get("TOKEN_SECRET").ok_or_else(|| "TOKEN_SECRET must be set".to_string())?;

        let otp_code_length = parse_or(&lookup, "OTP_CODE_LENGTH", 6u32)?;
        if !(4..=10).contains(&otp_code_length) {
            return Err("OTP_CODE_LENGTH must be between 4 and 10".to_string());
        }

        let email_backend = match get("EMAIL_BACKEND").as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("smtp") => EmailBackend::Smtp,
            Some("log") => EmailBackend::Log,
            Some(other) => return Err(format!("EMAIL_BACKEND must be 'smtp' or 'log', got '{}'", other)),
        };

        let email_timeout_secs = positive("EMAIL_TIMEOUT_SECS", parse_or(&lookup, "EMAIL_TIMEOUT_SECS", 20u64)?)?;

        let smtp = match email_backend {
            EmailBackend::Log => None,
            EmailBackend::Smtp => Some(SmtpConfig {
                host: get("SMTP_HOST").ok_or_else(|| "SMTP_HOST must be set".to_string())?,
                port: parse_or(&lookup, "SMTP_PORT", 587u16)?,
                username: get("SMTP_USERNAME").ok_or_else(|| "SMTP_USERNAME must be set".to_string())?,
                password: get("SMTP_PASSWORD").ok_or_else(|| "SMTP_PASSWORD must be set".to_string())?,
                timeout: Duration::from_secs(email_timeout_secs),
            }),
        };

        let email_from = get("EMAIL_FROM")
            .or_else(|| smtp.as_ref().map(|s| s.username.clone()))
            .unwrap_or_else(|| "no-reply@safetrip.local".to_string());

        let sms_timeout_secs = positive("SMS_TIMEOUT_SECS", parse_or(&lookup, "SMS_TIMEOUT_SECS", 10u64)?)?;

        let twilio = match (
            get("TWILIO_ACCOUNT_SID"),
            get("TWILIO_AUTH_TOKEN"),
            get("TWILIO_FROM_NUMBER"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(TwilioConfig {
                account_sid,
                auth_token,
                from_number,
                timeout: Duration::from_secs(sms_timeout_secs),
            }),
            (None, None, None) => None,
            _ => {
                return Err(
                    "TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN and TWILIO_FROM_NUMBER must be set together"
                        .to_string(),
                )
            }
        };

        let authority_alert_emails = get("AUTHORITY_ALERT_EMAILS")
            .map(|raw| {
                raw.split(',')
                    .map(|e| e.trim().to_lowercase())
                    .filter(|e| !e.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let default_phone_country_code = get("DEFAULT_PHONE_COUNTRY_CODE")
            .map(|c| c.trim().trim_start_matches('+').to_string())
            .unwrap_or_else(|| "91".to_string());
        if default_phone_country_code.is_empty()
            || !default_phone_country_code.chars().all(|c| c.is_ascii_digit())
        {
            return Err("DEFAULT_PHONE_COUNTRY_CODE must be digits".to_string());
        }

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8000".to_string()),
            storage,
            database_url,
            token_secret,
            token_max_age_secs: positive(
                "TOKEN_MAX_AGE_SECS",
                parse_or(&lookup, "TOKEN_MAX_AGE_SECS", 2_592_000i64)?,
            )?,
            otp_code_length,
            otp_resend_cooldown_secs: parse_or(&lookup, "OTP_RESEND_COOLDOWN_SECS", 60i64)?.max(0),
            otp_block_window_minutes: parse_or(&lookup, "OTP_BLOCK_WINDOW_MINUTES", 10i64)?.max(0),
            otp_max_sends_per_window: positive(
                "OTP_MAX_SENDS_PER_WINDOW",
                parse_or(&lookup, "OTP_MAX_SENDS_PER_WINDOW", 3i32)?,
            )?,
            otp_expiry_minutes: positive("OTP_EXPIRY_MINUTES", parse_or(&lookup, "OTP_EXPIRY_MINUTES", 5i64)?)?,
            authority_alert_emails,
            default_phone_country_code,
            email_backend,
            smtp,
            email_from,
            email_timeout_secs,
            twilio,
            sms_timeout_secs,
            sms_total_timeout_secs: positive(
                "SMS_TOTAL_TIMEOUT_SECS",
                parse_or(&lookup, "SMS_TOTAL_TIMEOUT_SECS", 30u64)?,
            )?,
            request_timeout_secs: positive(
                "REQUEST_TIMEOUT_SECS",
                parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 60u64)?,
            )?,
            rate_limit_burst: positive("RATE_LIMIT_BURST", parse_or(&lookup, "RATE_LIMIT_BURST", 30u32)?)?,
            trust_proxy_headers: parse_or(&lookup, "TRUST_PROXY_HEADERS", false)?,
        })
    }

    pub fn otp_policy(&self) -> OtpPolicy {
        OtpPolicy {
            code_length: self.otp_code_length,
            resend_cooldown: chrono::Duration::seconds(self.otp_resend_cooldown_secs),
            block_window: chrono::Duration::minutes(self.otp_block_window_minutes),
            max_sends_per_window: self.otp_max_sends_per_window,
            expiry: chrono::Duration::minutes(self.otp_expiry_minutes),
        }
    }

    pub fn token_max_age(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.token_max_age_secs)
    }
}
