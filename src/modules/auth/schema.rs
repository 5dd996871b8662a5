use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use super::model::User;
use crate::modules::profile::model::UserProfile;

lazy_static! {
    static ref CONTACT_NO: Regex = Regex::new(r"^[0-9]{10}$").unwrap();
}

// =============================================================================
// REGISTER
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 150, message = "Username is required (max 150 characters)"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(regex(path = *CONTACT_NO, message = "Contact number must be exactly 10 digits"))]
    pub contact_no: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user: UserSummary,
}

// =============================================================================
// LOGIN / OTP
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendOtpRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SendOtpResponse {
    pub success: bool,
    pub message: String,
    pub email: String,
    pub user_id: i64,
}

/// Accepts the code as a JSON string or number. Strings are kept verbatim, so a
/// padded code does not match.
fn code_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Text(String),
        Number(u64),
    }

    Ok(match Code::deserialize(deserializer)? {
        Code::Text(text) => text,
        Code::Number(n) => n.to_string(),
    })
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    #[serde(alias = "code", deserialize_with = "code_string")]
    pub otp: String,
}

/// Returned by login and OTP verification.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: UserSummary,
}

// =============================================================================
// ME (Current User)
// =============================================================================

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub contact_no: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            contact_no: user.contact_no.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserSummary,
    pub profile: UserProfile,
}
