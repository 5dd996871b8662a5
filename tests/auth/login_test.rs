use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::common::{test_password, TestContext};

#[tokio::test]
async fn login_with_valid_credentials_returns_token() {
    let ctx = TestContext::new();
    let id = ctx.register("asha", "asha@example.com", "9876543210").await;

    let response = ctx
        .server
        .post("/auth/login")
        .json(&json!({ "username": "asha", "password": test_password() }))
        .await;

    response.assert_status_ok();

    let body: Value = response.json();
    assert!(body["token"].as_str().unwrap().starts_with("v1."));
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 2_592_000);
    assert_eq!(body["user"]["id"], id);
}

#[tokio::test]
async fn login_with_wrong_password_returns_unauthorized() {
    let ctx = TestContext::new();
    ctx.register("asha", "asha@example.com", "9876543210").await;

    let response = ctx
        .server
        .post("/auth/login")
        .json(&json!({ "username": "asha", "password": "WrongPassword1!" }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"], "auth_error");
}

#[tokio::test]
async fn login_does_not_reveal_unknown_usernames() {
    let ctx = TestContext::new();
    ctx.register("asha", "asha@example.com", "9876543210").await;

    let unknown = ctx
        .server
        .post("/auth/login")
        .json(&json!({ "username": "nobody", "password": test_password() }))
        .await;
    let wrong = ctx
        .server
        .post("/auth/login")
        .json(&json!({ "username": "asha", "password": "WrongPassword1!" }))
        .await;

    unknown.assert_status(StatusCode::UNAUTHORIZED);
    let unknown: Value = unknown.json();
    let wrong: Value = wrong.json();
    assert_eq!(unknown["message"], wrong["message"]);
}
