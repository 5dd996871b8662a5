use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::common::{test_password, TestContext};

#[tokio::test]
async fn register_with_valid_data_returns_created() {
    let ctx = TestContext::new();

    let response = ctx
        .server
        .post("/register")
        .json(&json!({
            "username": "asha",
            "email": "Asha@Example.com",
            "password": test_password(),
            "contact_no": "9876543210"
        }))
        .await;

    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    assert!(body["user"]["id"].as_i64().is_some());
    assert_eq!(body["user"]["username"], "asha");
    assert_eq!(body["user"]["email"], "asha@example.com");
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn register_also_served_under_auth_prefix() {
    let ctx = TestContext::new();

    ctx.server
        .post("/auth/register")
        .json(&json!({
            "username": "ravi",
            "email": "ravi@example.com",
            "password": test_password(),
            "contact_no": "9123456780"
        }))
        .await
        .assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn register_collects_every_conflict() {
    let ctx = TestContext::new();
    ctx.register("asha", "asha@example.com", "9876543210").await;

    let response = ctx
        .server
        .post("/register")
        .json(&json!({
            "username": "asha",
            "email": "ASHA@example.com",
            "password": test_password(),
            "contact_no": "9876543210"
        }))
        .await;

    response.assert_status(StatusCode::CONFLICT);

    let body: Value = response.json();
    assert_eq!(body["error"], "conflict");
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 3);
    assert!(errors.iter().any(|e| e.as_str().unwrap().contains("username")));
    assert!(errors.iter().any(|e| e.as_str().unwrap().contains("contact number")));
    assert!(errors.iter().any(|e| e.as_str().unwrap().contains("email")));
}

#[tokio::test]
async fn register_reports_only_the_fields_that_clash() {
    let ctx = TestContext::new();
    ctx.register("asha", "asha@example.com", "9876543210").await;

    let response = ctx
        .server
        .post("/register")
        .json(&json!({
            "username": "someone-else",
            "email": "other@example.com",
            "password": test_password(),
            "contact_no": "9876543210"
        }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn register_with_bad_contact_no_returns_bad_request() {
    let ctx = TestContext::new();

    for contact_no in ["12345", "98765abcde", "+919876543210"] {
        let response = ctx
            .server
            .post("/register")
            .json(&json!({
                "username": "asha",
                "email": "asha@example.com",
                "password": test_password(),
                "contact_no": contact_no
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "validation_error");
    }
}

#[tokio::test]
async fn register_with_invalid_email_or_short_password_returns_bad_request() {
    let ctx = TestContext::new();

    ctx.server
        .post("/register")
        .json(&json!({
            "username": "asha",
            "email": "not-an-email",
            "password": test_password(),
            "contact_no": "9876543210"
        }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    ctx.server
        .post("/register")
        .json(&json!({
            "username": "asha",
            "email": "asha@example.com",
            "password": "short",
            "contact_no": "9876543210"
        }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_creates_an_empty_profile() {
    let ctx = TestContext::new();
    let (_, token) = ctx.signed_in_user().await;

    let response = ctx.server.get("/profile/me").authorization_bearer(&token).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["profile"]["relative_mobile_no"], "");
    assert_eq!(body["profile"]["relatives_mobile_numbers"], json!([]));
    assert!(body["profile"]["blood_group"].is_null());
    assert!(body["profile"]["height_cm"].is_null());
}
