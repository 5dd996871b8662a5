use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::controller;
use crate::AppState;

pub fn emergency_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/alert", post(controller::trigger_alert))
        .route("/alerts", get(controller::list_alerts))
        .route(
            "/alerts/{id}/status",
            post(controller::update_status).patch(controller::update_status),
        )
}
