use axum::http::{header, HeaderValue, StatusCode};
use chrono::Duration;
use serde_json::Value;

use crate::common::TestContext;

#[tokio::test]
async fn me_with_valid_token_returns_user_and_profile() {
    let ctx = TestContext::new();
    let (id, token) = ctx.signed_in_user().await;

    let response = ctx.server.get("/auth/me").authorization_bearer(&token).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["user"]["id"], id);
    assert_eq!(body["user"]["email"], "asha@example.com");
    assert_eq!(body["profile"]["user_id"], id);
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn me_accepts_a_bare_token() {
    let ctx = TestContext::new();
    let (_, token) = ctx.signed_in_user().await;

    ctx.server
        .get("/auth/me")
        .add_header(header::AUTHORIZATION, HeaderValue::from_str(&token).unwrap())
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn me_without_auth_header_returns_unauthorized() {
    let ctx = TestContext::new();

    let response = ctx.server.get("/auth/me").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"], "auth_error");
}

#[tokio::test]
async fn me_with_invalid_token_returns_unauthorized() {
    let ctx = TestContext::new();

    ctx.server
        .get("/auth/me")
        .authorization_bearer("invalid-token")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_with_expired_token_returns_unauthorized() {
    let ctx = TestContext::new();
    let (_, token) = ctx.signed_in_user().await;

    ctx.clock.advance(Duration::days(30) + Duration::seconds(1));

    let response = ctx.server.get("/auth/me").authorization_bearer(&token).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["message"], "Token expired");
}

#[tokio::test]
async fn me_with_scheme_but_no_token_reports_missing_token() {
    let ctx = TestContext::new();

    let response = ctx
        .server
        .get("/auth/me")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("Bearer "))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["message"], "Missing token");
}
