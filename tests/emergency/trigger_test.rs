use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::common::{TestContext, AUTHORITY_EMAIL};

async fn alerts(ctx: &TestContext) -> Vec<Value> {
    let body: Value = ctx.server.get("/emergency/alerts").await.json();
    body.as_array().cloned().unwrap_or_default()
}

async fn set_contacts(ctx: &TestContext, token: &str, body: Value) {
    ctx.server
        .post("/profile/me")
        .authorization_bearer(token)
        .json(&body)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn trigger_with_token_notifies_everyone() {
    let ctx = TestContext::new();
    let (user_id, token) = ctx.signed_in_user().await;
    set_contacts(
        &ctx,
        &token,
        json!({
            "relative_mobile_no": "9876500000",
            "relatives_mobile_numbers": ["+1 234-567-8900"],
            "emergency_email": "kin@example.com",
            "blood_group": "O+"
        }),
    )
    .await;

    let response = ctx
        .server
        .post("/emergency/alert")
        .authorization_bearer(&token)
        .json(&json!({
            "message": "Car broke down",
            "lat": "19.076",
            "lng": 72.8777,
            "address": "Marine Drive",
            "phone_numbers": "9123456780"
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "PENDING");
    assert_eq!(body["email_sent"], true);
    assert_eq!(
        body["email_recipients"],
        json!([AUTHORITY_EMAIL, "kin@example.com"])
    );
    assert_eq!(body["sms_sent"], true);
    assert_eq!(
        body["sms_recipients"],
        json!(["+919876500000", "+12345678900", "+919123456780"])
    );
    assert_eq!(body["sms_errors"], json!([]));
    assert!(body["sms_error"].is_null());

    let stored = alerts(&ctx).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["id"], body["alert_id"]);
    assert_eq!(stored[0]["user_id"], user_id);
    assert_eq!(stored[0]["name"], "Test Traveller");
    assert_eq!(stored[0]["blood_group"], "O+");
    assert_eq!(stored[0]["message"], "Car broke down");
    assert_eq!(stored[0]["emergency_contact_phone"], "+919876500000");

    let mail = ctx.emails.sent().last().cloned().unwrap();
    assert!(mail.html_body.contains("https://www.google.com/maps?q=19.076,72.8777"));
    assert!(mail.html_body.contains("Marine Drive"));

    let texts = ctx.sms.sent();
    assert_eq!(texts.len(), 3);
    assert!(texts
        .iter()
        .all(|(_, body)| body.starts_with("SOS from Test Traveller: Car broke down")));
}

#[tokio::test]
async fn empty_message_gets_the_default() {
    let ctx = TestContext::new();
    let (_, token) = ctx.signed_in_user().await;

    ctx.server
        .post("/emergency/alert")
        .authorization_bearer(&token)
        .json(&json!({ "message": "   " }))
        .await
        .assert_status(StatusCode::CREATED);

    assert_eq!(alerts(&ctx).await[0]["message"], "Emergency! I need help.");
}

#[tokio::test]
async fn actor_can_be_named_by_id_or_email() {
    let ctx = TestContext::new();
    let user_id = ctx.register("asha", "asha@example.com", "9876543210").await;

    ctx.server
        .post("/emergency/alert")
        .json(&json!({ "user_id": user_id }))
        .await
        .assert_status(StatusCode::CREATED);

    ctx.server
        .post("/emergency/alert")
        .json(&json!({ "email": " ASHA@example.com " }))
        .await
        .assert_status(StatusCode::CREATED);

    let stored = alerts(&ctx).await;
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|a| a["user_id"] == user_id));
}

#[tokio::test]
async fn trigger_needs_an_actor() {
    let ctx = TestContext::new();

    let response = ctx
        .server
        .post("/emergency/alert")
        .json(&json!({ "message": "help" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = ctx
        .server
        .post("/emergency/alert")
        .json(&json!({ "email": "ghost@example.com" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    ctx.server
        .post("/emergency/alert")
        .json(&json!({ "user_id": 404 }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    assert!(alerts(&ctx).await.is_empty());
    assert!(ctx.emails.sent().is_empty());
}

#[tokio::test]
async fn invalid_token_is_rejected() {
    let ctx = TestContext::new();
    ctx.register("asha", "asha@example.com", "9876543210").await;

    ctx.server
        .post("/emergency/alert")
        .authorization_bearer("not-a-token")
        .json(&json!({ "email": "asha@example.com" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn out_of_range_coordinates_are_rejected() {
    let ctx = TestContext::new();
    let (_, token) = ctx.signed_in_user().await;

    for body in [
        json!({ "latitude": 91 }),
        json!({ "longitude": "-180.5" }),
        json!({ "latitude": "north" }),
    ] {
        let status = ctx
            .server
            .post("/emergency/alert")
            .authorization_bearer(&token)
            .json(&body)
            .await
            .status_code();
        assert!(status.is_client_error(), "{} for {}", status, body);
    }
    assert!(alerts(&ctx).await.is_empty());
}

#[tokio::test]
async fn no_recipients_means_no_alert() {
    let ctx = TestContext::with_env(&[("AUTHORITY_ALERT_EMAILS", "")]);
    let (_, token) = ctx.signed_in_user().await;

    let response = ctx
        .server
        .post("/emergency/alert")
        .authorization_bearer(&token)
        .json(&json!({ "message": "help" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["message"], "No alert recipients configured");
    assert!(alerts(&ctx).await.is_empty());
    assert!(ctx.sms.sent().is_empty());
}

#[tokio::test]
async fn extra_recipients_are_enough_without_authorities() {
    let ctx = TestContext::with_env(&[("AUTHORITY_ALERT_EMAILS", "")]);
    let (_, token) = ctx.signed_in_user().await;

    let response = ctx
        .server
        .post("/emergency/alert")
        .authorization_bearer(&token)
        .json(&json!({ "extra_recipients": "Friend@Example.com, friend@example.com" }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["email_recipients"], json!(["friend@example.com"]));
}

#[tokio::test]
async fn email_failure_creates_no_alert() {
    let ctx = TestContext::new();
    let (_, token) = ctx.signed_in_user().await;
    set_contacts(&ctx, &token, json!({ "relative_mobile_no": "9876500000" })).await;
    ctx.emails.set_failing(true);

    let response = ctx
        .server
        .post("/emergency/alert")
        .authorization_bearer(&token)
        .json(&json!({ "message": "help" }))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["error"], "dependency_error");
    assert!(alerts(&ctx).await.is_empty());
    assert!(ctx.sms.sent().is_empty());
}

#[tokio::test]
async fn sms_failures_do_not_fail_the_alert() {
    let ctx = TestContext::new();
    let (_, token) = ctx.signed_in_user().await;
    set_contacts(
        &ctx,
        &token,
        json!({ "relatives_mobile_numbers": ["9876500000", "9123456780"] }),
    )
    .await;
    ctx.sms.fail_all();

    let response = ctx
        .server
        .post("/emergency/alert")
        .authorization_bearer(&token)
        .json(&json!({ "message": "help" }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["email_sent"], true);
    assert_eq!(body["sms_sent"], false);
    assert_eq!(body["sms_recipients"], json!([]));
    assert_eq!(body["sms_errors"].as_array().unwrap().len(), 2);
    assert_eq!(body["sms_error"], "SMS delivery failed for all 2 numbers");

    let stored = alerts(&ctx).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["status"], "PENDING");
}

#[tokio::test]
async fn partial_sms_failure_reports_each_number() {
    let ctx = TestContext::new();
    let (_, token) = ctx.signed_in_user().await;
    ctx.sms.fail_number("+919123456780");

    let response = ctx
        .server
        .post("/emergency/alert")
        .authorization_bearer(&token)
        .json(&json!({ "phones": ["9876500000", "9123456780", "12"] }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["sms_sent"], true);
    assert_eq!(body["sms_recipients"], json!(["+919876500000"]));
    assert!(body["sms_error"].is_null());

    let errors = body["sms_errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0]["phone"], "12");
    assert_eq!(errors[0]["error"], "Invalid phone number");
    assert_eq!(errors[1]["phone"], "+919123456780");
}

#[tokio::test]
async fn no_phones_is_reported_not_fatal() {
    let ctx = TestContext::new();
    let (_, token) = ctx.signed_in_user().await;

    let response = ctx
        .server
        .post("/emergency/alert")
        .authorization_bearer(&token)
        .json(&json!({}))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["sms_sent"], false);
    assert_eq!(body["sms_error"], "No emergency phone numbers configured");
    assert!(ctx.sms.sent().is_empty());
}

#[tokio::test]
async fn alert_keeps_its_snapshot() {
    let ctx = TestContext::new();
    let (_, token) = ctx.signed_in_user().await;
    set_contacts(&ctx, &token, json!({ "blood_group": "A-", "height_cm": 160 })).await;

    ctx.server
        .post("/emergency/alert")
        .authorization_bearer(&token)
        .json(&json!({ "message": "help" }))
        .await
        .assert_status(StatusCode::CREATED);

    set_contacts(
        &ctx,
        &token,
        json!({ "blood_group": "B+", "height_cm": 175, "first_name": "Changed" }),
    )
    .await;

    let stored = alerts(&ctx).await;
    assert_eq!(stored[0]["blood_group"], "A-");
    assert_eq!(stored[0]["height_cm"], "160");
    assert_eq!(stored[0]["name"], "Test Traveller");
}
