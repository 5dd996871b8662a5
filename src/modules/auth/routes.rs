use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::controller;
use crate::AppState;

pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(controller::register))
        .route("/login", post(controller::login))
        .route("/send-otp", post(controller::send_otp))
        .route("/request-otp", post(controller::send_otp))
        .route("/verify-otp", post(controller::verify_otp))
        .route("/me", get(controller::me))
}
