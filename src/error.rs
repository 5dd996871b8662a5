use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::services::{alert::AlertError, otp::OtpError, token::TokenError};

/// Storage failures shared by every repository implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Map MySQL's duplicate key error (1062) to `Duplicate`.
    pub fn from_insert(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some("23000") || db_err.message().contains("Duplicate entry") {
                return Self::Duplicate(db_err.message().to_string());
            }
        }
        Self::Database(err)
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<i64>,
}

/// Error returned by every handler. Each variant is one error kind clients can branch on.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    RateLimited { message: String, retry_after_secs: i64 },

    #[error("Registration conflicts")]
    Conflict(Vec<String>),

    #[error("{0}")]
    Dependency(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited { .. } => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Dependency(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Unauthorized(_) => "auth_error",
            Self::NotFound(_) => "not_found",
            Self::RateLimited { .. } => "rate_limited",
            Self::Conflict(_) => "conflict",
            Self::Dependency(_) => "dependency_error",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            Self::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                ErrorResponse {
                    error: "internal_error",
                    message: "An unexpected error occurred".to_string(),
                    errors: Vec::new(),
                    retry_after_secs: None,
                }
            }
            Self::Conflict(errors) => ErrorResponse {
                error: "conflict",
                message: "Registration conflicts with existing accounts".to_string(),
                errors,
                retry_after_secs: None,
            },
            Self::RateLimited {
                message,
                retry_after_secs,
            } => ErrorResponse {
                error: "rate_limited",
                message,
                errors: Vec::new(),
                retry_after_secs: Some(retry_after_secs),
            },
            other => ErrorResponse {
                error: other.kind(),
                message: other.to_string(),
                errors: Vec::new(),
                retry_after_secs: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let messages: Vec<String> = fields
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();

        Self::Validation(messages.join("; "))
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed => Self::Unauthorized("Invalid token".to_string()),
            TokenError::Expired => Self::Unauthorized("Token expired".to_string()),
        }
    }
}

impl From<OtpError> for ApiError {
    fn from(err: OtpError) -> Self {
        match err {
            OtpError::UserNotFound => Self::NotFound(err.to_string()),
            OtpError::TooSoon { retry_after_secs } | OtpError::RateLimited { retry_after_secs } => {
                Self::RateLimited {
                    message: err.to_string(),
                    retry_after_secs,
                }
            }
            OtpError::InvalidCode | OtpError::Expired | OtpError::AlreadyConsumed => {
                Self::Validation(err.to_string())
            }
            OtpError::NotificationFailed(_) => Self::Dependency(err.to_string()),
            OtpError::Store(e) => e.into(),
        }
    }
}

impl From<AlertError> for ApiError {
    fn from(err: AlertError) -> Self {
        match err {
            AlertError::UserNotFound | AlertError::NotFound => Self::NotFound(err.to_string()),
            AlertError::NoRecipientsConfigured | AlertError::InvalidStatus(_) => {
                Self::Validation(err.to_string())
            }
            AlertError::DispatchFailed(_) => Self::Dependency(err.to_string()),
            AlertError::Store(e) => e.into(),
        }
    }
}
