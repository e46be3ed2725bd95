use axum::http::StatusCode;
use campus_events::error::AppError;
use campus_events::modules::auth::model::Role;
use campus_events::modules::password::service::PasswordService;
use serde_json::json;

use crate::common::{test_email, TestContext};

async fn request_code(ctx: &TestContext) -> (String, String, String) {
    let (user_id, email) = ctx.create_user(Role::Student).await;
    ctx.server
        .post("/password/forgot-password")
        .json(&json!({ "email": &email }))
        .await
        .assert_status(StatusCode::OK);
    let code = ctx.mailer.last_code_for(&email).unwrap();
    (user_id, email, code)
}

fn wrong_code(code: &str) -> String {
    if code == "000000" { "111111".into() } else { "000000".into() }
}

#[tokio::test]
async fn correct_code_issues_exactly_one_reset_token() {
    let ctx = TestContext::new().await;
    let (user_id, email, code) = request_code(&ctx).await;

    let response = ctx
        .server
        .post("/password/verify-otp")
        .json(&json!({ "email": &email, "otp": code }))
        .await;

    response.assert_status(StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["resetToken"].as_str().unwrap().len(), 64);
    assert_eq!(ctx.store.reset_token_count(&user_id), 1);
}

#[tokio::test]
async fn a_verified_code_cannot_be_reused() {
    let ctx = TestContext::new().await;
    let (_, email, code) = request_code(&ctx).await;

    ctx.server
        .post("/password/verify-otp")
        .json(&json!({ "email": &email, "otp": &code }))
        .await
        .assert_status(StatusCode::OK);

    let response = ctx
        .server
        .post("/password/verify-otp")
        .json(&json!({ "email": &email, "otp": &code }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["errorCode"], "OTP_NOT_FOUND");
}

#[tokio::test]
async fn wrong_code_reports_remaining_attempts() {
    let ctx = TestContext::new().await;
    let (_, email, code) = request_code(&ctx).await;

    let response = ctx
        .server
        .post("/password/verify-otp")
        .json(&json!({ "email": &email, "otp": wrong_code(&code) }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["errorCode"], "INVALID_OTP");
    assert_eq!(body["message"], "Incorrect OTP, 2 attempt(s) remaining");
}

#[tokio::test]
async fn third_wrong_code_locks_the_otp_even_for_the_right_code() {
    let ctx = TestContext::new().await;
    let (user_id, email, code) = request_code(&ctx).await;
    let wrong = wrong_code(&code);

    for expected in [StatusCode::BAD_REQUEST, StatusCode::BAD_REQUEST, StatusCode::TOO_MANY_REQUESTS] {
        ctx.server
            .post("/password/verify-otp")
            .json(&json!({ "email": &email, "otp": &wrong }))
            .await
            .assert_status(expected);
    }

    let response = ctx
        .server
        .post("/password/verify-otp")
        .json(&json!({ "email": &email, "otp": &code }))
        .await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: serde_json::Value = response.json();
    assert_eq!(body["errorCode"], "MAX_ATTEMPTS_EXCEEDED");
    assert_eq!(ctx.store.reset_token_count(&user_id), 0);
}

#[tokio::test]
async fn malformed_code_does_not_use_an_attempt() {
    let ctx = TestContext::new().await;
    let (_, email, code) = request_code(&ctx).await;

    for _ in 0..5 {
        let response = ctx
            .server
            .post("/password/verify-otp")
            .json(&json!({ "email": &email, "otp": "12ab" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["errorCode"], "VALIDATION_ERROR");
    }

    ctx.server
        .post("/password/verify-otp")
        .json(&json!({ "email": &email, "otp": &code }))
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn unknown_email_has_no_otp() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .post("/password/verify-otp")
        .json(&json!({ "email": test_email(), "otp": "123456" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["errorCode"], "OTP_NOT_FOUND");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_wrong_codes_still_exhaust_the_otp() {
    let ctx = TestContext::new().await;
    let (_, email, code) = request_code(&ctx).await;
    let wrong = wrong_code(&code);

    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let store = ctx.store.clone();
            let mailer = ctx.mailer.clone();
            let email = email.clone();
            let wrong = wrong.clone();
            tokio::spawn(async move {
                PasswordService::new(store.as_ref(), mailer.as_ref())
                    .verify_otp(&email, &wrong)
                    .await
            })
        })
        .collect();

    let mut invalid = 0;
    for attempt in attempts {
        match attempt.await.unwrap() {
            Err(AppError::InvalidOtp { .. }) => invalid += 1,
            Err(AppError::MaxAttemptsExceeded) => {}
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
    assert!(invalid <= 2, "{invalid} wrong codes were counted as retryable");

    let response = ctx
        .server
        .post("/password/verify-otp")
        .json(&json!({ "email": &email, "otp": &code }))
        .await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: serde_json::Value = response.json();
    assert_eq!(body["errorCode"], "MAX_ATTEMPTS_EXCEEDED");
}
