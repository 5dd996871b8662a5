use axum::http::StatusCode;
use chrono::Duration;
use serde_json::{json, Value};

use safetrip_api::modules::auth::interface::OtpLedger;

use crate::common::TestContext;

const EMAIL: &str = "asha@example.com";

async fn live_records(ctx: &TestContext) -> usize {
    ctx.store
        .history(EMAIL)
        .await
        .unwrap()
        .iter()
        .filter(|r| !r.is_expired)
        .count()
}

async fn send(ctx: &TestContext) -> axum_test::TestResponse {
    ctx.server
        .post("/auth/send-otp")
        .json(&json!({ "email": EMAIL }))
        .await
}

async fn verify(ctx: &TestContext, code: &str) -> axum_test::TestResponse {
    ctx.server
        .post("/auth/verify-otp")
        .json(&json!({ "email": EMAIL, "otp": code }))
        .await
}

#[tokio::test]
async fn send_otp_emails_a_numeric_code() {
    let ctx = TestContext::new();
    let id = ctx.register("asha", EMAIL, "9876543210").await;

    let response = send(&ctx).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["user_id"], id);

    let code = ctx.emails.last_code_for(EMAIL).unwrap();
    assert_eq!(code.len(), 6);
    assert!(!code.starts_with('0'));
    assert!(ctx.emails.sent()[0].html_body.contains("5 minutes"));
    assert_eq!(live_records(&ctx).await, 1);
}

#[tokio::test]
async fn send_otp_for_unknown_email_returns_not_found() {
    let ctx = TestContext::new();

    let response = send(&ctx).await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert!(ctx.emails.sent().is_empty());
}

#[tokio::test]
async fn request_otp_alias_issues_codes() {
    let ctx = TestContext::new();
    ctx.register("asha", EMAIL, "9876543210").await;

    ctx.server
        .post("/auth/request-otp")
        .json(&json!({ "email": "  ASHA@example.com " }))
        .await
        .assert_status_ok();

    assert!(ctx.emails.last_code_for(EMAIL).is_some());
}

#[tokio::test]
async fn resend_within_cooldown_is_rejected_without_mutation() {
    let ctx = TestContext::new();
    ctx.register("asha", EMAIL, "9876543210").await;
    send(&ctx).await.assert_status_ok();

    ctx.clock.advance(Duration::seconds(30));
    let response = send(&ctx).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "rate_limited");
    assert_eq!(body["retry_after_secs"], 30);
    assert_eq!(ctx.store.history(EMAIL).await.unwrap().len(), 1);
    assert_eq!(live_records(&ctx).await, 1);
}

#[tokio::test]
async fn too_many_sends_in_window_are_blocked_until_it_passes() {
    let ctx = TestContext::new();
    ctx.register("asha", EMAIL, "9876543210").await;

    for _ in 0..3 {
        send(&ctx).await.assert_status_ok();
        assert_eq!(live_records(&ctx).await, 1);
        ctx.clock.advance(Duration::seconds(61));
    }

    let response = send(&ctx).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "rate_limited");
    assert!(body["message"].as_str().unwrap().contains("Too many"));
    assert_eq!(ctx.store.history(EMAIL).await.unwrap().len(), 3);

    ctx.clock.advance(Duration::minutes(10));
    send(&ctx).await.assert_status_ok();

    let history = ctx.store.history(EMAIL).await.unwrap();
    assert_eq!(history[0].attempt_counter, 1);
    assert_eq!(live_records(&ctx).await, 1);
}

#[tokio::test]
async fn verify_succeeds_exactly_once() {
    let ctx = TestContext::new();
    let id = ctx.register("asha", EMAIL, "9876543210").await;
    let code = ctx.request_code(EMAIL).await;

    let first = verify(&ctx, &code).await;
    first.assert_status_ok();
    let body: Value = first.json();
    assert_eq!(body["user"]["id"], id);
    assert_eq!(body["user"]["username"], "asha");

    // The token resolves back to the same user.
    let token = body["token"].as_str().unwrap();
    let me: Value = ctx.server.get("/auth/me").authorization_bearer(token).await.json();
    assert_eq!(me["user"]["id"], id);

    let second = verify(&ctx, &code).await;
    second.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = second.json();
    assert!(body["message"].as_str().unwrap().contains("already been used"));
    assert_eq!(live_records(&ctx).await, 0);
}

#[tokio::test]
async fn verify_accepts_numeric_code_and_mixed_case_email() {
    let ctx = TestContext::new();
    ctx.register("asha", EMAIL, "9876543210").await;
    let code = ctx.request_code(EMAIL).await;

    ctx.server
        .post("/auth/verify-otp")
        .json(&json!({ "email": "Asha@Example.COM", "otp": code.parse::<u64>().unwrap() }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn verify_with_wrong_code_is_invalid() {
    let ctx = TestContext::new();
    ctx.register("asha", EMAIL, "9876543210").await;
    let code = ctx.request_code(EMAIL).await;
    let wrong = if code == "999999" { "100000" } else { "999999" };

    let response = verify(&ctx, wrong).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["message"], "Invalid code");
    assert_eq!(live_records(&ctx).await, 1);
}

#[tokio::test]
async fn verify_compares_the_code_exactly() {
    let ctx = TestContext::new();
    ctx.register("asha", EMAIL, "9876543210").await;
    let code = ctx.request_code(EMAIL).await;

    let response = verify(&ctx, &format!(" {} ", code)).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["message"], "Invalid code");
    assert_eq!(live_records(&ctx).await, 1);

    verify(&ctx, &code).await.assert_status_ok();
}

#[tokio::test]
async fn verify_after_expiry_fails_and_consumes_the_code() {
    let ctx = TestContext::new();
    ctx.register("asha", EMAIL, "9876543210").await;
    let code = ctx.request_code(EMAIL).await;

    ctx.clock.advance(Duration::minutes(5) + Duration::seconds(1));
    let response = verify(&ctx, &code).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["message"].as_str().unwrap().contains("expired"));
    assert!(ctx.store.history(EMAIL).await.unwrap()[0].is_expired);
}

#[tokio::test]
async fn superseded_code_can_no_longer_be_used() {
    let ctx = TestContext::new();
    ctx.register("asha", EMAIL, "9876543210").await;
    let old = ctx.request_code(EMAIL).await;

    ctx.clock.advance(Duration::seconds(61));
    let new = ctx.request_code(EMAIL).await;
    if old == new {
        return;
    }

    verify(&ctx, &old).await.assert_status(StatusCode::BAD_REQUEST);
    verify(&ctx, &new).await.assert_status_ok();
}

#[tokio::test]
async fn email_failure_is_reported_but_the_code_stays_issued() {
    let ctx = TestContext::new();
    ctx.register("asha", EMAIL, "9876543210").await;
    ctx.emails.set_failing(true);

    let response = send(&ctx).await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["error"], "dependency_error");
    assert_eq!(live_records(&ctx).await, 1);
}

#[tokio::test]
async fn concurrent_verifies_with_one_code_succeed_once() {
    let ctx = TestContext::new();
    ctx.register("asha", EMAIL, "9876543210").await;
    let code = ctx.request_code(EMAIL).await;

    let (a, b) = tokio::join!(
        async { verify(&ctx, &code).await.status_code() },
        async { verify(&ctx, &code).await.status_code() },
    );

    let successes = [a, b].iter().filter(|s| **s == StatusCode::OK).count();
    assert_eq!(successes, 1);
}

#[tokio::test]
async fn concurrent_sends_leave_one_live_code() {
    let ctx = TestContext::new();
    ctx.register("asha", EMAIL, "9876543210").await;

    let (a, b) = tokio::join!(
        async { send(&ctx).await.status_code() },
        async { send(&ctx).await.status_code() },
    );

    let successes = [a, b].iter().filter(|s| **s == StatusCode::OK).count();
    assert_eq!(successes, 1);
    assert_eq!(ctx.store.history(EMAIL).await.unwrap().len(), 1);
    assert_eq!(live_records(&ctx).await, 1);
}
