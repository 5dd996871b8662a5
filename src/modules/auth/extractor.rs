use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use std::sync::Arc;

use super::model::User;
use crate::error::ApiError;
use crate::AppState;

/// Token from `Authorization: Bearer <token>` or a bare `Authorization: <token>`.
fn extract_token(headers: &HeaderMap) -> Option<Result<&str, ApiError>> {
    let value = headers.get(AUTHORIZATION)?;
    let Ok(value) = value.to_str() else {
        return Some(Err(ApiError::Unauthorized("Invalid authorization header".into())));
    };

    let value = value.trim();
    if value.eq_ignore_ascii_case("bearer") {
        return Some(Err(ApiError::Unauthorized("Missing token".into())));
    }
    let token = match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        Some(_) => return Some(Err(ApiError::Unauthorized("Unsupported authorization scheme".into()))),
        None => value,
    };

    if token.is_empty() {
        return Some(Err(ApiError::Unauthorized("Missing token".into())));
    }
    Some(Ok(token))
}

/// Resolves the caller when an `Authorization` header is present. A present but
/// invalid header is an error, not an anonymous request.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Option<User>, ApiError> {
    let Some(token) = extract_token(headers) else {
        return Ok(None);
    };

    let user_id = state.tokens.verify(token?, state.clock.now())?;
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".into()))?;

    Ok(Some(user))
}

/// Handler argument for endpoints that require a signed-in user.
pub struct AuthUser(pub User);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        authenticate(state, &parts.headers)
            .await?
            .map(AuthUser)
            .ok_or_else(|| ApiError::Unauthorized("Authentication credentials were not provided".into()))
    }
}
