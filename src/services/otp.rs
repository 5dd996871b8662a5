use chrono::{DateTime, Duration, Utc};
use rand::{CryptoRng, Rng};
use std::sync::Arc;

use crate::error::StoreError;
use crate::modules::auth::interface::{OtpLedger, UserRepository};
use crate::modules::auth::model::{normalize_email, NewOtpRecord, OtpRecord};
use crate::services::clock::Clock;
use crate::services::gateway::{GatewayError, Mailer};
use crate::services::templates;
use crate::services::token::TokenService;

const MAX_ISSUE_ATTEMPTS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("No user registered with this email")]
    UserNotFound,

    #[error("Please wait {retry_after_secs} seconds before requesting a new code")]
    TooSoon { retry_after_secs: i64 },

    #[error("Too many codes requested. Try again in {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: i64 },

    #[error("Invalid code")]
    InvalidCode,

    #[error("Code has expired, request a new one")]
    Expired,

    #[error("Code has already been used")]
    AlreadyConsumed,

    #[error("Could not send verification email: {0}")]
    NotificationFailed(GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct OtpPolicy {
    pub code_length: u32,
    pub resend_cooldown: Duration,
    pub block_window: Duration,
    pub max_sends_per_window: i32,
    pub expiry: Duration,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            code_length: 6,
            resend_cooldown: Duration::seconds(60),
            block_window: Duration::minutes(10),
            max_sends_per_window: 3,
            expiry: Duration::minutes(5),
        }
    }
}

pub trait CodeGenerator: Send + Sync {
    /// A numeric code of exactly `length` digits.
    fn generate(&self, length: u32) -> String;
}

/// Uniform over `[10^(n-1), 10^n - 1]`, drawn from the thread-local CSPRNG.
#[derive(Debug, Default)]
pub struct SecureCodeGenerator;

fn sample_code<R: Rng + CryptoRng>(rng: &mut R, length: u32) -> String {
    let low = 10u64.pow(length - 1);
    let high = 10u64.pow(length) - 1;
    rng.random_range(low..=high).to_string()
}

impl CodeGenerator for SecureCodeGenerator {
    fn generate(&self, length: u32) -> String {
        sample_code(&mut rand::rng(), length)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IssuedOtp {
    pub email: String,
    pub user_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedOtp {
    pub token: String,
    pub user_id: i64,
    pub username: String,
    pub email: String,
}

fn seconds_until(remaining: Duration) -> i64 {
    let ms = remaining.num_milliseconds().max(0);
    ((ms + 999) / 1000).max(1)
}

pub struct OtpService {
    users: Arc<dyn UserRepository>,
    ledger: Arc<dyn OtpLedger>,
    mailer: Mailer,
    tokens: Arc<TokenService>,
    clock: Arc<dyn Clock>,
    generator: Arc<dyn CodeGenerator>,
    policy: OtpPolicy,
}

impl OtpService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        ledger: Arc<dyn OtpLedger>,
        mailer: Mailer,
        tokens: Arc<TokenService>,
        clock: Arc<dyn Clock>,
        generator: Arc<dyn CodeGenerator>,
        policy: OtpPolicy,
    ) -> Self {
        Self {
            users,
            ledger,
            mailer,
            tokens,
            clock,
            generator,
            policy,
        }
    }

    pub fn policy(&self) -> &OtpPolicy {
        &self.policy
    }

    /// Decides whether a new code may be sent given the latest ledger record, and
    /// returns the attempt counter the new record will carry.
    fn admit(&self, latest: Option<&OtpRecord>, now: DateTime<Utc>) -> Result<i32, OtpError> {
        let Some(latest) = latest else {
            return Ok(1);
        };

        let elapsed = now - latest.created_at;
        if elapsed < self.policy.resend_cooldown {
            return Err(OtpError::TooSoon {
                retry_after_secs: seconds_until(self.policy.resend_cooldown - elapsed),
            });
        }

        let counter = if elapsed <= self.policy.block_window {
            latest.attempt_counter
        } else {
            0
        };

        if counter >= self.policy.max_sends_per_window {
            return Err(OtpError::RateLimited {
                retry_after_secs: seconds_until(self.policy.block_window - elapsed),
            });
        }

        Ok(counter + 1)
    }

    pub async fn issue(&self, email: &str) -> Result<IssuedOtp, OtpError> {
        let email = normalize_email(email);
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(OtpError::UserNotFound)?;

        let mut issued = None;
        for _ in 0..MAX_ISSUE_ATTEMPTS {
            let latest = self.ledger.latest(&email).await?;
            let now = self.clock.now();
            let attempt_counter = self.admit(latest.as_ref(), now)?;

            let record = NewOtpRecord {
                email: email.clone(),
                code: self.generator.generate(self.policy.code_length),
                attempt_counter,
                created_at: now,
            };

            if let Some(created) = self
                .ledger
                .supersede(latest.map(|r| r.id), &record)
                .await?
            {
                issued = Some(created);
                break;
            }
            tracing::debug!("Concurrent OTP issuance for {}, re-evaluating", email);
        }

        let Some(record) = issued else {
            return Err(OtpError::TooSoon {
                retry_after_secs: seconds_until(self.policy.resend_cooldown),
            });
        };

        tracing::info!(
            "Issued OTP #{} for user {} (attempt {} in window)",
            record.id,
            user.id,
            record.attempt_counter
        );

        self.mailer
            .send(
                templates::OTP_SUBJECT,
                templates::otp_email(&record.code, self.policy.expiry.num_minutes()),
                vec![email.clone()],
            )
            .await
            .map_err(|e| {
                tracing::warn!("OTP email to {} failed: {}", email, e);
                OtpError::NotificationFailed(e)
            })?;

        Ok(IssuedOtp {
            email,
            user_id: user.id,
        })
    }

    pub async fn verify(&self, email: &str, code: &str) -> Result<VerifiedOtp, OtpError> {
        let email = normalize_email(email);
        let record = self
            .ledger
            .latest_matching(&email, code)
            .await?
            .ok_or(OtpError::InvalidCode)?;

        let now = self.clock.now();
        if now - record.created_at > self.policy.expiry {
            self.ledger.expire(record.id).await?;
            return Err(OtpError::Expired);
        }

        if record.is_expired || !self.ledger.expire(record.id).await? {
            return Err(OtpError::AlreadyConsumed);
        }

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(OtpError::UserNotFound)?;

        tracing::info!("OTP #{} verified for user {}", record.id, user.id);

        Ok(VerifiedOtp {
            token: self.tokens.mint(user.id, now),
            user_id: user.id,
            username: user.username,
            email: user.email,
        })
    }
}
