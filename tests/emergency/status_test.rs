use axum::http::StatusCode;
use chrono::Duration;
use serde_json::{json, Value};

use crate::common::TestContext;

async fn trigger(ctx: &TestContext, token: &str, message: &str) -> i64 {
    let response = ctx
        .server
        .post("/emergency/alert")
        .authorization_bearer(token)
        .json(&json!({ "message": message }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    body["alert_id"].as_i64().unwrap()
}

#[tokio::test]
async fn status_moves_freely_between_known_values() {
    let ctx = TestContext::new();
    let (_, token) = ctx.signed_in_user().await;
    let id = trigger(&ctx, &token, "help").await;

    for status in ["IN_PROGRESS", "RESOLVED", "PENDING"] {
        let response = ctx
            .server
            .post(&format!("/emergency/alerts/{}/status", id))
            .json(&json!({ "status": status }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["id"], id);
        assert_eq!(body["status"], status);
    }

    ctx.server
        .patch(&format!("/emergency/alerts/{}/status", id))
        .json(&json!({ "status": "RESOLVED" }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn unknown_status_leaves_the_alert_unchanged() {
    let ctx = TestContext::new();
    let (_, token) = ctx.signed_in_user().await;
    let id = trigger(&ctx, &token, "help").await;

    let response = ctx
        .server
        .post(&format!("/emergency/alerts/{}/status", id))
        .json(&json!({ "status": "DONE" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = ctx.server.get("/emergency/alerts").await.json();
    assert_eq!(body[0]["status"], "PENDING");
}

#[tokio::test]
async fn unknown_alert_is_not_found() {
    let ctx = TestContext::new();

    ctx.server
        .post("/emergency/alerts/999/status")
        .json(&json!({ "status": "RESOLVED" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_is_newest_first_and_filterable() {
    let ctx = TestContext::new();
    let (_, token) = ctx.signed_in_user().await;

    let first = trigger(&ctx, &token, "first").await;
    ctx.clock.advance(Duration::minutes(1));
    let second = trigger(&ctx, &token, "second").await;
    ctx.clock.advance(Duration::minutes(1));
    let third = trigger(&ctx, &token, "third").await;

    ctx.server
        .post(&format!("/emergency/alerts/{}/status", second))
        .json(&json!({ "status": "RESOLVED" }))
        .await
        .assert_status_ok();

    let all: Value = ctx.server.get("/emergency/alerts").await.json();
    let ids: Vec<i64> = all
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![third, second, first]);

    let pending: Value = ctx
        .server
        .get("/emergency/alerts")
        .add_query_param("status", "PENDING")
        .await
        .json();
    let ids: Vec<i64> = pending
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![third, first]);

    ctx.server
        .get("/emergency/alerts")
        .add_query_param("status", "CLOSED")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
