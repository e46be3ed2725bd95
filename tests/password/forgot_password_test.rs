use axum::http::StatusCode;
use campus_events::modules::auth::model::Role;
use serde_json::json;

use crate::common::{test_email, TestContext};

#[tokio::test]
async fn forgot_password_sends_a_six_digit_code() {
    let ctx = TestContext::new().await;
    let (_, email) = ctx.create_user(Role::Student).await;

    let response = ctx
        .server
        .post("/password/forgot-password")
        .json(&json!({ "email": &email }))
        .await;

    response.assert_status(StatusCode::OK);
    let code = ctx.mailer.last_code_for(&email).unwrap();
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));
}

#[tokio::test]
async fn unknown_email_gets_the_same_answer() {
    let ctx = TestContext::new().await;
    let (_, email) = ctx.create_user(Role::Student).await;

    let known = ctx
        .server
        .post("/password/forgot-password")
        .json(&json!({ "email": &email }))
        .await;
    let unknown = ctx
        .server
        .post("/password/forgot-password")
        .json(&json!({ "email": test_email() }))
        .await;

    known.assert_status(StatusCode::OK);
    unknown.assert_status(StatusCode::OK);
    assert_eq!(known.as_bytes(), unknown.as_bytes());
    assert_eq!(ctx.mailer.sent_count(), 1);
}

#[tokio::test]
async fn a_new_code_replaces_the_previous_one() {
    let ctx = TestContext::new().await;
    let (_, email) = ctx.create_user(Role::Student).await;

    ctx.server
        .post("/password/forgot-password")
        .json(&json!({ "email": &email }))
        .await;
    let first = ctx.mailer.last_code_for(&email).unwrap();

    ctx.server
        .post("/password/forgot-password")
        .json(&json!({ "email": &email }))
        .await;
    let second = ctx.mailer.last_code_for(&email).unwrap();

    if first != second {
        let response = ctx
            .server
            .post("/password/verify-otp")
            .json(&json!({ "email": &email, "otp": first }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    ctx.server
        .post("/password/verify-otp")
        .json(&json!({ "email": &email, "otp": second }))
        .await
        .assert_status(StatusCode::OK);
}
