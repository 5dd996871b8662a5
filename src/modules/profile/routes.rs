use axum::{routing::get, Router};
use std::sync::Arc;

use super::controller;
use crate::AppState;

pub fn profile_routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/me",
        get(controller::get_profile)
            .post(controller::update_profile)
            .patch(controller::update_profile),
    )
}
