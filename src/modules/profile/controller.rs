use axum::{extract::State, Json};
use std::sync::Arc;

use crate::error::ApiError;
use crate::modules::auth::{extractor::AuthUser, schema::MeResponse, schema::UserSummary};
use crate::modules::profile::schema::ProfilePayload;
use crate::AppState;

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<MeResponse>, ApiError> {
    let profile = state
        .profiles
        .find_by_user(user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;

    Ok(Json(MeResponse {
        user: UserSummary::from(&user),
        profile,
    }))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    payload: ProfilePayload,
) -> Result<Json<MeResponse>, ApiError> {
    let update = payload.into_update(&state.default_country_code)?;

    let profile = state
        .profiles
        .update(user.id, &update, state.clock.now())
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;

    // Names live on the user row.
    let user = state.users.find_by_id(user.id).await?.unwrap_or(user);
    tracing::info!("Profile updated for user {}", user.id);

    Ok(Json(MeResponse {
        user: UserSummary::from(&user),
        profile,
    }))
}
