use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::modules::auth::extractor::authenticate;
use crate::modules::emergency::{
    model::EmergencyAlert,
    schema::{ListAlertsQuery, TriggerAlertRequest, TriggerAlertResponse, UpdateStatusRequest},
};
use crate::services::metrics::AlertMetricsCollector;
use crate::AppState;

pub async fn trigger_alert(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<TriggerAlertRequest>,
) -> Result<(StatusCode, Json<TriggerAlertResponse>), ApiError> {
    let mut request = req.into_alert_request()?;

    // A valid token identifies the actor; otherwise the body must.
    if let Some(user) = authenticate(&state, &headers).await? {
        request.user_id = Some(user.id);
        request.email = None;
    } else if request.user_id.is_none() && request.email.is_none() {
        return Err(ApiError::validation("user_id or email is required"));
    }

    let collector = AlertMetricsCollector::new(state.metrics.clone());
    let outcome = match state.dispatcher.trigger(request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            collector.record_trigger_failed(&e);
            return Err(e.into());
        }
    };
    collector.record_trigger(&outcome.sms);

    Ok((StatusCode::CREATED, Json(outcome.into())))
}

pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListAlertsQuery>,
) -> Result<Json<Vec<EmergencyAlert>>, ApiError> {
    let status = query.status.as_deref().map(str::trim).filter(|s| !s.is_empty());
    Ok(Json(state.dispatcher.list(status).await?))
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<EmergencyAlert>, ApiError> {
    Ok(Json(state.dispatcher.set_status(id, &req.status).await?))
}
