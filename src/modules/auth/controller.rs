use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use validator::Validate;

use crate::error::{ApiError, StoreError};
use crate::modules::auth::{
    extractor::AuthUser,
    model::{normalize_email, NewUser},
    schema::{
        AuthResponse, LoginRequest, MeResponse, RegisterRequest, RegisterResponse, SendOtpRequest,
        SendOtpResponse, UserSummary, VerifyOtpRequest,
    },
};
use crate::modules::profile::model::UserProfile;
use crate::services::hashing;
use crate::services::metrics::OtpMetricsCollector;
use crate::AppState;

async fn conflict_messages(state: &AppState, req: &RegisterRequest, email: &str) -> Result<Vec<String>, ApiError> {
    let conflicts = state
        .users
        .registration_conflicts(&req.username, email, &req.contact_no)
        .await?;

    let mut errors = Vec::new();
    if conflicts.username {
        errors.push("A user with that username already exists.".to_string());
    }
    if conflicts.contact_no {
        errors.push("A user with that contact number already exists.".to_string());
    }
    if conflicts.email {
        errors.push("A user with that email already exists.".to_string());
    }
    Ok(errors)
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    req.validate()?;
    let email = normalize_email(&req.email);
    let username = req.username.trim().to_string();
    if username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }

    let errors = conflict_messages(&state, &req, &email).await?;
    if !errors.is_empty() {
        return Err(ApiError::Conflict(errors));
    }

    let password_hash = hashing::hash_password(&req.password).map_err(ApiError::internal)?;

    let new_user = NewUser {
        username,
        email: email.clone(),
        password_hash,
        first_name: req.first_name.trim().to_string(),
        last_name: req.last_name.trim().to_string(),
        contact_no: req.contact_no.clone(),
        created_at: state.clock.now(),
    };

    let user = match state.users.create_with_profile(&new_user).await {
        Ok(user) => user,
        // Lost a race with a concurrent registration.
        Err(StoreError::Duplicate(_)) => {
            let errors = conflict_messages(&state, &req, &email).await?;
            return Err(ApiError::Conflict(errors));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!("Registered user {} ({})", user.id, user.username);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully",
            user: UserSummary::from(&user),
        }),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid username or password".to_string());

    let user = state
        .users
        .find_by_username(req.username.trim())
        .await?
        .ok_or_else(invalid)?;

    if !hashing::verify_password(&req.password, &user.password_hash).map_err(ApiError::internal)? {
        tracing::warn!("Failed login for user {}", user.id);
        return Err(invalid());
    }

    Ok(Json(AuthResponse {
        token: state.tokens.mint(user.id, state.clock.now()),
        token_type: "Bearer",
        expires_in: state.tokens.max_age_secs(),
        user: UserSummary::from(&user),
    }))
}

pub async fn send_otp(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendOtpRequest>,
) -> Result<Json<SendOtpResponse>, ApiError> {
    req.validate()?;

    let result = state.otp.issue(&req.email).await;
    OtpMetricsCollector::new(state.metrics.clone()).record_issue(&result);
    let issued = result?;

    Ok(Json(SendOtpResponse {
        success: true,
        message: format!(
            "Verification code sent. It expires in {} minutes.",
            state.otp.policy().expiry.num_minutes()
        ),
        email: issued.email,
        user_id: issued.user_id,
    }))
}

pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if req.email.trim().is_empty() || req.otp.is_empty() {
        return Err(ApiError::validation("Email and OTP are required"));
    }

    let result = state.otp.verify(&req.email, &req.otp).await;
    OtpMetricsCollector::new(state.metrics.clone()).record_verify(&result);
    let verified = result?;

    let user = state
        .users
        .find_by_id(verified.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(AuthResponse {
        token: verified.token,
        token_type: "Bearer",
        expires_in: state.tokens.max_age_secs(),
        user: UserSummary::from(&user),
    }))
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<MeResponse>, ApiError> {
    let profile = state
        .profiles
        .find_by_user(user.id)
        .await?
        .unwrap_or_else(|| UserProfile::empty(user.id, user.created_at));

    Ok(Json(MeResponse {
        user: UserSummary::from(&user),
        profile,
    }))
}
