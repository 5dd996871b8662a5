use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Emails are compared and stored trimmed and lowercased.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub contact_no: Option<String>,
    pub is_staff: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Full name when set, otherwise the username.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub contact_no: String,
    pub created_at: DateTime<Utc>,
}

/// One OTP issuance event. Rows are never deleted; `is_expired` only ever flips to true.
#[derive(Debug, Clone, FromRow)]
pub struct OtpRecord {
    pub id: i64,
    pub email: String,
    pub code: String,
    pub attempt_counter: i32,
    pub is_expired: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOtpRecord {
    pub email: String,
    pub code: String,
    pub attempt_counter: i32,
    pub created_at: DateTime<Utc>,
}

/// Which registration fields collide with existing accounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistrationConflicts {
    pub username: bool,
    pub contact_no: bool,
    pub email: bool,
}

impl RegistrationConflicts {
    pub fn any(&self) -> bool {
        self.username || self.contact_no || self.email
    }
}
